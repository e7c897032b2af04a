use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// Metadata of one remote resource as reported by PROPFIND/SEARCH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStat {
    pub filename: String,
    pub basename: String,
    /// Server string, kept verbatim (e.g. "Mon, 01 Jan 2024 12:00:00 GMT")
    pub lastmod: Option<String>,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Entity tag with the quotes removed
    pub etag: Option<String>,
    /// Only set for files. Parameters after `;` are dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    /// Raw property bag, only filled when detailed output was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Map<String, Value>>,
}

impl FileStat {
    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Parses `lastmod` for callers that want a timestamp
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        self.lastmod.as_deref().and_then(parse_http_date)
    }
}

/// Remaining space on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiskQuotaAvailable {
    Bytes(u64),
    Sentinel(QuotaSentinel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaSentinel {
    Unlimited,
    Unknown,
}

impl DiskQuotaAvailable {
    pub const UNLIMITED: Self = DiskQuotaAvailable::Sentinel(QuotaSentinel::Unlimited);
    pub const UNKNOWN: Self = DiskQuotaAvailable::Sentinel(QuotaSentinel::Unknown);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskQuota {
    pub used: u64,
    pub available: DiskQuotaAvailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Server hit a storage/result limit on the search root (507)
    pub truncated: bool,
    pub results: Vec<FileStat>,
}

/// Capability tokens from the `DAV` header plus the `Server` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DAVCompliance {
    pub compliance: Vec<String>,
    pub server: String,
}

impl DAVCompliance {
    pub fn from_headers(dav_header: &str, server_header: &str) -> Self {
        Self {
            compliance: dav_header.split(',').map(|item| item.trim().to_string()).collect(),
            server: server_header.to_string(),
        }
    }

    pub fn supports(&self, token: &str) -> bool {
        self.compliance.iter().any(|c| c == token)
    }

    /// SabreDAV wins when a server advertises both mechanisms
    pub fn partial_update_strategy(&self) -> PartialUpdateStrategy {
        if self.supports(SABREDAV_PARTIAL_UPDATE) {
            PartialUpdateStrategy::SabreDav
        } else if self.server.contains("Apache") && self.supports(APACHE_PROPSET_FS) {
            PartialUpdateStrategy::ApacheRange
        } else {
            PartialUpdateStrategy::Unsupported
        }
    }
}

pub const SABREDAV_PARTIAL_UPDATE: &str = "sabredav-partialupdate";
pub const APACHE_PROPSET_FS: &str = "<http://apache.org/dav/propset/fs/1>";

/// How a byte range of an existing file can be overwritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartialUpdateStrategy {
    /// `PATCH` with `X-Update-Range`
    SabreDav,
    /// `PUT` with `Content-Range`
    ApacheRange,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockResponse {
    pub token: String,
    pub server_timeout: Option<String>,
}

pub fn parse_http_date(date_str: &str) -> Option<DateTime<Utc>> {
    if date_str.is_empty() {
        return None;
    }

    // RFC 2822 is what getlastmodified uses
    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            DateTime::parse_from_rfc3339(date_str)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%a, %d %b %Y %H:%M:%S GMT")
                .ok()
                .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
        })
}
