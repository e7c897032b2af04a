use serde_json::{Map, Value};

/// Normalised multistatus document
///
/// Servers may repeat `propstat` and `prop`; after parsing every response
/// carries at most one of each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DAVResult {
    pub responses: Vec<DAVResponse>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DAVResponse {
    pub href: String,
    /// Status line of a status-only response (no propstat)
    pub status: Option<String>,
    pub propstat: Option<DAVPropstat>,
}

impl DAVResponse {
    /// The status line that applies to this entry, whichever form it used
    pub fn effective_status(&self) -> Option<&str> {
        self.status
            .as_deref()
            .or_else(|| self.propstat.as_ref().map(|p| p.status.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DAVPropstat {
    pub prop: DAVProps,
    pub status: String,
}

/// The properties this client understands, plus the raw bag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DAVProps {
    pub displayname: Option<String>,
    pub getlastmodified: Option<String>,
    pub getcontentlength: Option<String>,
    pub getcontenttype: Option<String>,
    pub getetag: Option<String>,
    pub is_collection: bool,
    pub has_resourcetype: bool,
    pub quota_used_bytes: Option<String>,
    pub quota_available_bytes: Option<String>,
    pub raw: Map<String, Value>,
}

/// Splits `HTTP/1.1 207 Multi-Status` into its code and reason text
pub fn parse_status_line(line: &str) -> Option<(u16, String)> {
    let mut parts = line.trim().splitn(3, ' ');
    let _version = parts.next()?;
    let code = parts.next()?.parse().ok()?;
    let text = parts.next().unwrap_or("").to_string();
    Some((code, text))
}
