use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use url::Url;

use crate::errors::Result;

static HREF_ORIGIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^/]+").expect("valid origin pattern"));

/// Canonical remote path: single separators, a leading `/`, and no trailing
/// `/` unless the path is the root itself.
pub fn normalise_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}

pub fn make_path_absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Percent-escapes every segment on its own; separators are never escaped.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decodes percent escapes, leaving the input untouched when it does not
/// decode to valid UTF-8.
pub fn decode_path(path: &str) -> String {
    urlencoding::decode(path)
        .unwrap_or(Cow::Borrowed(path))
        .into_owned()
}

/// Resolves each segment against the URL accumulated so far, left to right.
/// Segments that are a bare `/` are skipped.
pub fn join_url(base: &str, segments: &[&str]) -> Result<String> {
    let parts: Vec<&str> = segments.iter().copied().filter(|s| *s != "/").collect();
    if parts.is_empty() {
        return Ok(base.to_string());
    }
    let mut url = Url::parse(base)?;
    for part in parts {
        url = url.join(part)?;
    }
    Ok(url.to_string())
}

/// Path component of a full URL, normalised
pub fn extract_url_path(full_url: &str) -> Result<String> {
    let url = Url::parse(full_url)?;
    Ok(normalise_path(url.path()))
}

/// Strips scheme and host from an href, servers may send either form
pub fn normalise_href(href: &str) -> String {
    HREF_ORIGIN.replace(href, "").into_owned()
}

pub fn ensure_collection_path(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

/// Path of `full_path` relative to `base_path`, both decoded first. A root
/// base yields the decoded absolute path instead.
pub fn relative_to(base_path: &str, full_path: &str) -> String {
    let base = normalise_path(&decode_path(base_path));
    let full = normalise_path(&decode_path(full_path));
    if base == "/" {
        return full;
    }

    let base_segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    let full_segments: Vec<&str> = full.split('/').filter(|s| !s.is_empty()).collect();
    let common = base_segments
        .iter()
        .zip(full_segments.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative: Vec<&str> = Vec::new();
    relative.extend(std::iter::repeat("..").take(base_segments.len() - common));
    relative.extend(&full_segments[common..]);
    normalise_path(&relative.join("/"))
}

/// Every ancestor collection of `path` including itself, shallowest first
pub fn all_ancestors(path: &str) -> Vec<String> {
    let normalised = normalise_path(path);
    let mut output = Vec::new();
    let mut current = normalised;
    while current != "/" {
        let parent = dirname(&current);
        output.push(current);
        current = parent;
    }
    output.sort_by_key(|p| p.len());
    output
}

/// Centralized URL and path management for one remote endpoint
///
/// Builds request URLs from caller paths and maps hrefs from multistatus
/// responses back to paths relative to the server base path.
#[derive(Debug, Clone)]
pub struct WebDAVUrlManager {
    remote_url: String,
    server_base_path: String,
}

impl WebDAVUrlManager {
    pub fn new(remote_url: &str, remote_base_path: Option<&str>) -> Result<Self> {
        let server_base_path = match remote_base_path {
            Some(base) => make_path_absolute(base),
            None => extract_url_path(remote_url)?,
        };
        Ok(Self {
            remote_url: remote_url.to_string(),
            server_base_path,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.remote_url
    }

    pub fn server_base_path(&self) -> &str {
        &self.server_base_path
    }

    /// Paths are resolved below the remote URL, whatever path it carries.
    ///
    /// Input:  "/content/logo 2.png" with remote "https://store.example.com/dav"
    /// Output: "https://store.example.com/dav/content/logo%202.png"
    pub fn url_for_path(&self, path: &str) -> Result<String> {
        let encoded = encode_path(path);
        join_url(&self.collection_base(), &[encoded.trim_start_matches('/')])
    }

    pub fn collection_url_for_path(&self, path: &str) -> Result<String> {
        let encoded = ensure_collection_path(&encode_path(path));
        join_url(&self.collection_base(), &[encoded.trim_start_matches('/')])
    }

    fn collection_base(&self) -> String {
        ensure_collection_path(&self.remote_url)
    }

    /// Input:  "/dav/content/logo%202.png" with base "/dav"
    /// Output: "/content/logo 2.png"
    pub fn href_to_relative_path(&self, href: &str) -> String {
        relative_to(&self.server_base_path, &normalise_href(href))
    }
}
