use anyhow::{Context, Result};
use std::env;

use crate::services::webdav::{AuthType, ConcurrencyConfig, OAuthToken, WebDAVConfig};

#[derive(Clone, Debug)]
pub struct Config {
    pub dav_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub auth_type: Option<AuthType>,
    pub remote_base_path: Option<String>,
    pub timeout_seconds: u64,
    pub max_concurrent_downloads: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let auth_type = match env::var("DAV_AUTH_TYPE") {
            Ok(value) if !value.trim().is_empty() => Some(
                value
                    .trim()
                    .parse::<AuthType>()
                    .with_context(|| format!("DAV_AUTH_TYPE={}", value))?,
            ),
            _ => None,
        };

        Ok(Config {
            dav_url: env::var("DAV_URL")
                .unwrap_or_else(|_| "http://localhost:8080/".to_string()),
            username: env::var("DAV_USERNAME").ok().filter(|s| !s.is_empty()),
            password: env::var("DAV_PASSWORD").ok().filter(|s| !s.is_empty()),
            token: env::var("DAV_TOKEN").ok().filter(|s| !s.is_empty()),
            auth_type,
            remote_base_path: env::var("DAV_REMOTE_BASE_PATH").ok().filter(|s| !s.is_empty()),
            timeout_seconds: env::var("DAV_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            max_concurrent_downloads: env::var("DAV_MAX_CONCURRENT_DOWNLOADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(4),
        })
    }

    /// Client options for this environment
    pub fn webdav_config(&self) -> WebDAVConfig {
        let mut config = WebDAVConfig::new(self.dav_url.clone());
        config.username = self.username.clone();
        config.password = self.password.clone();
        config.remote_base_path = self.remote_base_path.clone();
        config.timeout_seconds = self.timeout_seconds;
        if let Some(token) = &self.token {
            config = config.with_token(OAuthToken::bearer(token.clone()));
        }
        if let Some(auth_type) = self.auth_type {
            config.auth_type = Some(auth_type);
        }
        config
    }

    pub fn concurrency_config(&self) -> ConcurrencyConfig {
        ConcurrencyConfig {
            max_concurrent_downloads: self.max_concurrent_downloads,
        }
    }
}
