use base64ct::{Base64, Encoding};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::errors::{Result, WebDAVError};
use super::request::Headers;

const NONCE_CHARS: &[u8] = b"abcdef0123456789";
const NONCE_SIZE: usize = 32;

static CHALLENGE_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([a-z0-9_-]+)=(?:"([^"]+)"|([a-z0-9_-]+))"#).expect("valid challenge pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Basic first, switches to digest when the server asks for it
    Auto,
    Digest,
    None,
    /// HTTP Basic
    Password,
    Token,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Auto => "auto",
            AuthType::Digest => "digest",
            AuthType::None => "none",
            AuthType::Password => "password",
            AuthType::Token => "token",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = WebDAVError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(AuthType::Auto),
            "digest" => Ok(AuthType::Digest),
            "none" => Ok(AuthType::None),
            "password" => Ok(AuthType::Password),
            "token" => Ok(AuthType::Token),
            _ => Err(WebDAVError::invalid_auth_type(format!("Invalid auth type: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    pub fn bearer<S: Into<String>>(access_token: S) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: None,
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<OAuthToken>,
    /// Precomputed `H(username:realm:password)` for digest
    pub ha1: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("ha1", &self.ha1.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    fn has_username_and_password(&self) -> bool {
        matches!((&self.username, &self.password), (Some(u), Some(p)) if !u.is_empty() && !p.is_empty())
    }
}

/// Challenge-response state for one connection
///
/// `nc` only moves forward. A fresh challenge replaces realm, nonce, qop and
/// opaque but keeps the counter.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DigestState {
    pub username: String,
    pub password: String,
    pub ha1: Option<String>,
    pub realm: String,
    pub nonce: String,
    pub cnonce: String,
    pub nc: u32,
    pub qop: Option<String>,
    pub algorithm: String,
    pub opaque: Option<String>,
    /// Set once a challenge has been parsed; cleared when a retry is refused
    pub has_digest_auth: bool,
}

impl fmt::Debug for DigestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestState")
            .field("username", &self.username)
            .field("realm", &self.realm)
            .field("nc", &self.nc)
            .field("qop", &self.qop)
            .field("algorithm", &self.algorithm)
            .field("has_digest_auth", &self.has_digest_auth)
            .finish()
    }
}

impl DigestState {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            username: credentials.username.clone().unwrap_or_default(),
            password: credentials.password.clone().unwrap_or_default(),
            ha1: credentials.ha1.clone(),
            algorithm: "md5".to_string(),
            ..Default::default()
        }
    }

    fn qop_auth(&self) -> bool {
        self.qop
            .as_deref()
            .map(|qop| qop.split(',').any(|token| token.trim() == "auth"))
            .unwrap_or(false)
    }
}

pub fn generate_basic_auth_header(username: &str, password: &str) -> String {
    let encoded = Base64::encode_string(format!("{}:{}", username, password).as_bytes());
    format!("Basic {}", encoded)
}

pub fn generate_token_auth_header(token: &OAuthToken) -> String {
    format!("{} {}", token.token_type, token.access_token)
}

/// `user:pass` out of a `Basic ...` header value
pub fn decode_basic_credentials(header: &str) -> Option<String> {
    let encoded = header
        .get(..6)
        .filter(|scheme| scheme.eq_ignore_ascii_case("basic "))
        .map(|_| header[6..].trim())
        .unwrap_or(header.trim());
    let decoded = Base64::decode_vec(encoded).ok()?;
    String::from_utf8(decoded).ok()
}

/// Fills the context headers for header-based schemes; returns a fresh
/// digest state for digest mode. Nothing is sent to the server.
pub fn setup_auth(
    auth_type: AuthType,
    credentials: &Credentials,
    headers: &mut Headers,
) -> Result<Option<DigestState>> {
    match auth_type {
        AuthType::Auto => {
            if credentials.has_username_and_password() {
                headers.set(
                    "Authorization",
                    generate_basic_auth_header(
                        credentials.username.as_deref().unwrap_or_default(),
                        credentials.password.as_deref().unwrap_or_default(),
                    ),
                );
            }
            Ok(None)
        }
        AuthType::Digest => {
            headers.remove("Authorization");
            Ok(Some(DigestState::new(credentials)))
        }
        AuthType::None => Ok(None),
        AuthType::Password => {
            headers.set(
                "Authorization",
                generate_basic_auth_header(
                    credentials.username.as_deref().unwrap_or_default(),
                    credentials.password.as_deref().unwrap_or_default(),
                ),
            );
            Ok(None)
        }
        AuthType::Token => {
            let token = credentials.token.as_ref().ok_or_else(|| {
                WebDAVError::invalid_auth_type("Invalid auth type: token auth requires a token")
            })?;
            headers.set("Authorization", generate_token_auth_header(token));
            Ok(None)
        }
    }
}

pub fn make_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..NONCE_SIZE)
        .map(|_| NONCE_CHARS[rng.gen_range(0..NONCE_CHARS.len())] as char)
        .collect()
}

fn md5_hex(data: &str) -> String {
    format!("{:x}", md5::compute(data.as_bytes()))
}

fn sha256_hex(data: &str) -> String {
    format!("{:x}", Sha256::digest(data.as_bytes()))
}

fn digest_hash(algorithm: &str, data: &str) -> String {
    if algorithm.to_ascii_lowercase().starts_with("sha-256") {
        sha256_hex(data)
    } else {
        md5_hex(data)
    }
}

/// HA1, re-hashed with nonce and cnonce for the `-sess` variants
pub fn ha1_compute(
    algorithm: &str,
    username: &str,
    realm: &str,
    password: &str,
    nonce: &str,
    cnonce: &str,
    ha1: Option<&str>,
) -> String {
    let base = match ha1 {
        Some(precomputed) => precomputed.to_string(),
        None => digest_hash(algorithm, &format!("{}:{}:{}", username, realm, password)),
    };
    if algorithm.to_ascii_lowercase().ends_with("-sess") {
        digest_hash(algorithm, &format!("{}:{}:{}", base, nonce, cnonce))
    } else {
        base
    }
}

/// Request-URI as the server sees it: path plus query
fn digest_uri(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) => {
            let stripped = url.splitn(2, "//").last().unwrap_or(url);
            stripped.find('/').map(|idx| stripped[idx..].to_string()).unwrap_or_else(|| "/".to_string())
        }
    }
}

pub fn generate_digest_auth_header(method: &str, url: &str, digest: &DigestState) -> String {
    let uri = digest_uri(url);
    let method = method.to_ascii_uppercase();
    let qop_auth = digest.qop_auth();
    let nc = format!("{:08x}", digest.nc);

    let ha1 = ha1_compute(
        &digest.algorithm,
        &digest.username,
        &digest.realm,
        &digest.password,
        &digest.nonce,
        &digest.cnonce,
        digest.ha1.as_deref(),
    );
    let ha2 = digest_hash(&digest.algorithm, &format!("{}:{}", method, uri));
    let response = if qop_auth {
        digest_hash(
            &digest.algorithm,
            &format!("{}:{}:{}:{}:auth:{}", ha1, digest.nonce, nc, digest.cnonce, ha2),
        )
    } else {
        digest_hash(&digest.algorithm, &format!("{}:{}:{}", ha1, digest.nonce, ha2))
    };

    // (name, value, quoted)
    let fields: [(&str, String, bool); 10] = [
        ("username", digest.username.clone(), true),
        ("realm", digest.realm.clone(), true),
        ("nonce", digest.nonce.clone(), true),
        ("uri", uri, true),
        ("qop", if qop_auth { "auth".to_string() } else { String::new() }, false),
        ("response", response, true),
        ("nc", if qop_auth { nc } else { String::new() }, false),
        ("cnonce", if qop_auth { digest.cnonce.clone() } else { String::new() }, true),
        ("algorithm", digest.algorithm.clone(), false),
        ("opaque", digest.opaque.clone().unwrap_or_default(), true),
    ];

    let parts: Vec<String> = fields
        .iter()
        .filter(|(_, value, _)| !value.is_empty())
        .map(|(name, value, quoted)| {
            if *quoted {
                format!("{}=\"{}\"", name, value)
            } else {
                format!("{}={}", name, value)
            }
        })
        .collect();

    format!("Digest {}", parts.join(", "))
}

pub fn response_indicates_digest_auth(www_authenticate: Option<&str>) -> bool {
    www_authenticate
        .and_then(|header| header.split_whitespace().next())
        .map(|scheme| scheme.eq_ignore_ascii_case("digest"))
        .unwrap_or(false)
}

/// Applies a `WWW-Authenticate: Digest ...` challenge to `digest`
///
/// Returns false, leaving the state untouched, when the header is not a
/// digest challenge. Otherwise bumps `nc` and draws a new client nonce.
pub fn parse_digest_auth(www_authenticate: Option<&str>, digest: &mut DigestState) -> bool {
    if !response_indicates_digest_auth(www_authenticate) {
        return false;
    }
    let header = www_authenticate.unwrap_or_default();
    for caps in CHALLENGE_PARAM.captures_iter(header) {
        let key = caps[1].to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        match key.as_str() {
            "realm" => digest.realm = value,
            "nonce" => digest.nonce = value,
            "qop" => digest.qop = Some(value),
            "algorithm" => digest.algorithm = value,
            "opaque" => digest.opaque = Some(value),
            _ => {}
        }
    }
    digest.nc += 1;
    digest.cnonce = make_nonce();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mufasa(password: &str) -> DigestState {
        DigestState {
            username: "Mufasa".to_string(),
            password: password.to_string(),
            realm: "testrealm@host.com".to_string(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_string()),
            algorithm: "MD5".to_string(),
            has_digest_auth: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_digest_header_with_qop() {
        let mut digest = mufasa("Circle Of Life");
        digest.qop = Some("auth,auth-int".to_string());
        digest.nc = 1;
        digest.cnonce = "0a4f113b".to_string();

        let header = generate_digest_auth_header("get", "http://www.nowhere.org/dir/index.html", &digest);
        assert_eq!(
            header,
            "Digest username=\"Mufasa\", realm=\"testrealm@host.com\", \
             nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", uri=\"/dir/index.html\", qop=auth, \
             response=\"6629fae49393a05397450978507c4ef1\", nc=00000001, cnonce=\"0a4f113b\", \
             algorithm=MD5, opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""
        );
    }

    #[test]
    fn test_digest_header_without_qop() {
        let mut digest = mufasa("CircleOfLife");
        digest.nc = 1;
        digest.cnonce = "0a4f113b".to_string();

        let header = generate_digest_auth_header("GET", "http://www.nowhere.org/dir/index.html", &digest);
        assert!(header.contains("response=\"1949323746fe6a43ef61f9606e7febea\""));
        assert!(!header.contains("qop="));
        assert!(!header.contains("nc="));
        assert!(!header.contains("cnonce="));
    }

    #[test]
    fn test_precomputed_ha1_matches_password() {
        let mut digest = mufasa("Circle Of Life");
        digest.qop = Some("auth".to_string());
        digest.nc = 1;
        digest.cnonce = "0a4f113b".to_string();
        let expected = generate_digest_auth_header("GET", "http://h/dir/index.html", &digest);

        digest.ha1 = Some(md5_hex("Mufasa:testrealm@host.com:Circle Of Life"));
        digest.password = String::new();
        assert_eq!(generate_digest_auth_header("GET", "http://h/dir/index.html", &digest), expected);
    }

    #[test]
    fn test_session_and_sha256_variants() {
        let plain = ha1_compute("MD5", "u", "r", "p", "n", "c", None);
        let sess = ha1_compute("MD5-sess", "u", "r", "p", "n", "c", None);
        assert_eq!(sess, md5_hex(&format!("{}:n:c", md5_hex("u:r:p"))));
        assert_ne!(plain, sess);

        let sha = ha1_compute("SHA-256", "u", "r", "p", "n", "c", None);
        assert_eq!(sha.len(), 64);
        assert_eq!(sha, sha256_hex("u:r:p"));
    }

    #[test]
    fn test_uri_keeps_query() {
        assert_eq!(digest_uri("https://h.example.com/a%20b/c?x=1"), "/a%20b/c?x=1");
        assert_eq!(digest_uri("https://h.example.com"), "/");
    }

    #[test]
    fn test_parse_challenge() {
        let mut digest = DigestState::new(&Credentials {
            username: Some("user".into()),
            password: Some("pass".into()),
            ..Default::default()
        });
        let header = r#"Digest realm="dav", qop="auth", nonce="abc123", opaque="xyz", algorithm=MD5, stale=FALSE"#;

        assert!(parse_digest_auth(Some(header), &mut digest));
        assert_eq!(digest.realm, "dav");
        assert_eq!(digest.nonce, "abc123");
        assert_eq!(digest.qop.as_deref(), Some("auth"));
        assert_eq!(digest.algorithm, "MD5");
        assert_eq!(digest.opaque.as_deref(), Some("xyz"));
        assert_eq!(digest.nc, 1);
        assert_eq!(digest.cnonce.len(), 32);
        assert!(digest.cnonce.bytes().all(|b| NONCE_CHARS.contains(&b)));

        let first_cnonce = digest.cnonce.clone();
        assert!(parse_digest_auth(Some(r#"Digest realm="dav", nonce="def456""#), &mut digest));
        assert_eq!(digest.nc, 2);
        assert_eq!(digest.nonce, "def456");
        assert_ne!(digest.cnonce, first_cnonce);
    }

    #[test]
    fn test_non_digest_challenge_is_ignored() {
        let mut digest = DigestState::default();
        assert!(!parse_digest_auth(Some(r#"Basic realm="dav""#), &mut digest));
        assert!(!parse_digest_auth(None, &mut digest));
        assert_eq!(digest.nc, 0);
        assert!(response_indicates_digest_auth(Some("DIGEST realm=\"x\"")));
    }

    #[test]
    fn test_setup_auth_modes() {
        let credentials = Credentials {
            username: Some("Aladdin".into()),
            password: Some("open sesame".into()),
            token: Some(OAuthToken::bearer("tok")),
            ha1: None,
        };

        let mut headers = Headers::new();
        setup_auth(AuthType::Password, &credentials, &mut headers).unwrap();
        assert_eq!(headers.get("authorization"), Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="));

        let mut headers = Headers::new();
        setup_auth(AuthType::Token, &credentials, &mut headers).unwrap();
        assert_eq!(headers.get("Authorization"), Some("Bearer tok"));

        let mut headers = Headers::new();
        assert!(setup_auth(AuthType::None, &credentials, &mut headers).unwrap().is_none());
        assert!(headers.is_empty());

        let mut headers = Headers::new().with("Authorization", "Basic x");
        let digest = setup_auth(AuthType::Digest, &credentials, &mut headers).unwrap().unwrap();
        assert!(!headers.contains("Authorization"));
        assert_eq!(digest.username, "Aladdin");
        assert!(!digest.has_digest_auth);
        assert_eq!(digest.nc, 0);
    }

    #[test]
    fn test_auto_without_password_sends_nothing() {
        let credentials = Credentials {
            username: Some("only-user".into()),
            ..Default::default()
        };
        let mut headers = Headers::new();
        setup_auth(AuthType::Auto, &credentials, &mut headers).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_auth_type_from_str() {
        assert_eq!("Digest".parse::<AuthType>().unwrap(), AuthType::Digest);
        let err = "kerberos".parse::<AuthType>().unwrap_err();
        assert_eq!(err.error_code(), "invalid-auth-type");
    }

    #[test]
    fn test_decode_basic_credentials() {
        let header = generate_basic_auth_header("user", "p@ss:word");
        assert_eq!(decode_basic_credentials(&header).as_deref(), Some("user:p@ss:word"));
        assert_eq!(decode_basic_credentials("Basic !!!"), None);
    }
}
