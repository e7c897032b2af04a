use crate::errors::{Result, WebDAVError};
use super::auth::{AuthType, Credentials, OAuthToken};
use super::request::Headers;

/// Lock owner href sent with LOCK requests unless overridden
pub const DEFAULT_CONTACT_HREF: &str =
    "https://github.com/perry-mitchell/webdav-client/blob/master/LOCK_CONTACT.md";

/// WebDAV client configuration
#[derive(Debug, Clone)]
pub struct WebDAVConfig {
    pub server_url: String,
    /// `None` picks `Password` when a username or password is set, else `None`
    pub auth_type: Option<AuthType>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<OAuthToken>,
    pub ha1: Option<String>,
    /// Path prefix the server puts in hrefs, when it differs from the URL path
    pub remote_base_path: Option<String>,
    pub contact_href: String,
    pub headers: Headers,
    pub attribute_name_prefix: String,
    pub timeout_seconds: u64,
}

/// Concurrency configuration for WebDAV operations
#[derive(Debug, Clone)]
pub struct ConcurrencyConfig {
    pub max_concurrent_downloads: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
        }
    }
}

impl Default for WebDAVConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            auth_type: None,
            username: None,
            password: None,
            token: None,
            ha1: None,
            remote_base_path: None,
            contact_href: DEFAULT_CONTACT_HREF.to_string(),
            headers: Headers::new(),
            attribute_name_prefix: "@".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl WebDAVConfig {
    /// Creates a new WebDAV configuration
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = Some(auth_type);
        self
    }

    pub fn with_token(mut self, token: OAuthToken) -> Self {
        self.token = Some(token);
        self.auth_type.get_or_insert(AuthType::Token);
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(WebDAVError::InvalidConfig("Server URL cannot be empty".into()));
        }

        // Validate URL format
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(WebDAVError::InvalidConfig(
                "Server URL must start with http:// or https://".into(),
            ));
        }

        if self.effective_auth_type() == AuthType::Token && self.token.is_none() {
            return Err(WebDAVError::InvalidConfig("Token auth requires an access token".into()));
        }

        if self.timeout_seconds == 0 {
            return Err(WebDAVError::InvalidConfig("Timeout must be greater than zero".into()));
        }

        Ok(())
    }

    pub fn effective_auth_type(&self) -> AuthType {
        match self.auth_type {
            Some(auth_type) => auth_type,
            None if self.username.is_some() || self.password.is_some() => AuthType::Password,
            None => AuthType::None,
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            token: self.token.clone(),
            ha1: self.ha1.clone(),
        }
    }

    /// Gets the timeout duration
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_auth_type() {
        let config = WebDAVConfig::new("https://dav.example.com/");
        assert_eq!(config.effective_auth_type(), AuthType::None);

        let config = config.with_basic_auth("u", "p");
        assert_eq!(config.effective_auth_type(), AuthType::Password);

        let config = config.with_auth_type(AuthType::Auto);
        assert_eq!(config.effective_auth_type(), AuthType::Auto);
    }

    #[test]
    fn test_validate() {
        assert!(WebDAVConfig::new("").validate().is_err());
        assert!(WebDAVConfig::new("ftp://dav.example.com").validate().is_err());
        assert!(WebDAVConfig::new("https://dav.example.com")
            .with_auth_type(AuthType::Token)
            .validate()
            .is_err());
        assert!(WebDAVConfig::new("https://dav.example.com")
            .with_token(OAuthToken::bearer("t"))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = WebDAVConfig::default();
        assert_eq!(config.attribute_name_prefix, "@");
        assert_eq!(config.contact_href, DEFAULT_CONTACT_HREF);
        assert_eq!(ConcurrencyConfig::default().max_concurrent_downloads, 4);
    }
}
