use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::info;

use crate::errors::Result;
use crate::webdav_xml_parser::{AttributeParser, ParsingConfig, TagParser};
use super::auth::{setup_auth, AuthType, Credentials, DigestState};
use super::config::WebDAVConfig;
use super::request::Headers;
use super::url_management::{extract_url_path, make_path_absolute, WebDAVUrlManager};

/// Per-connection state shared by every operation of one client
///
/// Auth mode and headers change when auto negotiation settles. Digest state
/// sits behind an async mutex that the dispatcher holds for a whole
/// challenge-response exchange, so digest requests on one context run one
/// at a time.
#[derive(Debug)]
pub struct WebDAVClientContext {
    remote_url: String,
    remote_path: String,
    contact_href: String,
    url_manager: WebDAVUrlManager,
    credentials: Credentials,
    auth_type: RwLock<AuthType>,
    headers: RwLock<Headers>,
    digest: Mutex<Option<DigestState>>,
    parsing: RwLock<ParsingConfig>,
}

impl WebDAVClientContext {
    pub fn new(config: &WebDAVConfig) -> Result<Self> {
        let auth_type = config.effective_auth_type();
        let credentials = config.credentials();
        let remote_path = extract_url_path(&config.server_url)?;
        let base_path = config
            .remote_base_path
            .as_deref()
            .map(make_path_absolute)
            .unwrap_or_else(|| remote_path.clone());
        let url_manager = WebDAVUrlManager::new(&config.server_url, Some(base_path.as_str()))?;

        let mut headers = config.headers.clone();
        let digest = setup_auth(auth_type, &credentials, &mut headers)?;

        Ok(Self {
            remote_url: config.server_url.clone(),
            remote_path,
            contact_href: config.contact_href.clone(),
            url_manager,
            credentials,
            auth_type: RwLock::new(auth_type),
            headers: RwLock::new(headers),
            digest: Mutex::new(digest),
            parsing: RwLock::new(ParsingConfig {
                attribute_name_prefix: config.attribute_name_prefix.clone(),
                ..Default::default()
            }),
        })
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    /// Path component of the remote URL
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    pub fn contact_href(&self) -> &str {
        &self.contact_href
    }

    pub fn url_manager(&self) -> &WebDAVUrlManager {
        &self.url_manager
    }

    pub async fn auth_type(&self) -> AuthType {
        *self.auth_type.read().await
    }

    /// Auto negotiation settled on basic
    pub(crate) async fn commit_password(&self) {
        let mut auth_type = self.auth_type.write().await;
        if *auth_type == AuthType::Auto {
            info!("Auth negotiation resolved to password");
            *auth_type = AuthType::Password;
        }
    }

    /// Auto negotiation settled on digest. Drops the basic header and sets
    /// up digest state unless another request already did.
    pub(crate) async fn commit_digest(&self, digest: &mut Option<DigestState>) -> Result<()> {
        let mut auth_type = self.auth_type.write().await;
        if *auth_type == AuthType::Digest && digest.is_some() {
            return Ok(());
        }
        info!("Auth negotiation resolved to digest");
        *auth_type = AuthType::Digest;
        let mut headers = self.headers.write().await;
        *digest = setup_auth(AuthType::Digest, &self.credentials, &mut headers)?;
        Ok(())
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Exclusive access to the digest state for one exchange
    pub(crate) async fn lock_digest(&self) -> MutexGuard<'_, Option<DigestState>> {
        self.digest.lock().await
    }

    /// Copy of the current digest state, for inspection
    pub async fn digest_state(&self) -> Option<DigestState> {
        self.digest.lock().await.clone()
    }

    pub async fn get_headers(&self) -> Headers {
        self.headers.read().await.clone()
    }

    /// Replaces the whole context header set
    pub async fn set_headers(&self, headers: Headers) {
        *self.headers.write().await = headers;
    }

    pub async fn parsing_config(&self) -> ParsingConfig {
        self.parsing.read().await.clone()
    }

    pub async fn register_tag_parser(&self, parser: TagParser) {
        self.parsing.write().await.tag_parsers.push(parser);
    }

    pub async fn register_attribute_parser(&self, parser: AttributeParser) {
        self.parsing.write().await.attribute_parsers.push(parser);
    }
}
