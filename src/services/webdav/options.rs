use std::fmt;
use std::str::FromStr;

use crate::errors::{ErrorCode, Result, WebDAVError};
use super::request::{ContentLength, RequestOptions};

pub const DEFAULT_LOCK_TIMEOUT: &str = "Infinite, Second-4100000000";

/// Byte range for ranged reads; `end` is inclusive, open-ended when `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    /// `Range` header value, e.g. `bytes=0-99` or `bytes=100-`
    pub fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end),
            None => format!("bytes={}-", self.start),
        }
    }
}

impl FromStr for ByteRange {
    type Err = WebDAVError;

    /// Accepts `start-end` or `start-`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            WebDAVError::local(ErrorCode::InvalidUpdateRange, format!("Invalid byte range: {}", s))
        };
        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let start = start.trim().parse().map_err(|_| invalid())?;
        let end = match end.trim() {
            "" => None,
            end => Some(end.parse().map_err(|_| invalid())?),
        };
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Binary,
    Text,
}

impl FromStr for OutputFormat {
    type Err = WebDAVError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binary" => Ok(OutputFormat::Binary),
            "text" => Ok(OutputFormat::Text),
            _ => Err(WebDAVError::local(
                ErrorCode::InvalidOutputFormat,
                format!("Invalid output format: {}", s),
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Binary => f.write_str("binary"),
            OutputFormat::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatOptions {
    pub details: bool,
    pub request: RequestOptions,
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryContentsOptions {
    /// Depth `infinity` instead of `1`
    pub deep: bool,
    pub details: bool,
    pub include_self: bool,
    pub request: RequestOptions,
}

#[derive(Debug, Clone, Default)]
pub struct FileContentsOptions {
    pub format: OutputFormat,
    pub range: Option<ByteRange>,
    pub request: RequestOptions,
}

#[derive(Debug, Clone)]
pub struct PutFileContentsOptions {
    pub overwrite: bool,
    pub content_length: ContentLength,
    pub request: RequestOptions,
}

impl Default for PutFileContentsOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            content_length: ContentLength::Auto,
            request: RequestOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CopyFileOptions {
    pub overwrite: bool,
    /// Depth `0`: copy the collection without its members
    pub shallow: bool,
    pub request: RequestOptions,
}

impl Default for CopyFileOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            shallow: false,
            request: RequestOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MoveFileOptions {
    pub overwrite: bool,
    pub request: RequestOptions,
}

impl Default for MoveFileOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            request: RequestOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateDirectoryOptions {
    pub recursive: bool,
    pub request: RequestOptions,
}

#[derive(Debug, Clone, Default)]
pub struct LockOptions {
    /// `Timeout` header, defaults to [`DEFAULT_LOCK_TIMEOUT`]
    pub timeout: Option<String>,
    /// Existing token to refresh instead of taking a new lock
    pub refresh_token: Option<String>,
    pub request: RequestOptions,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub details: bool,
    /// Request body, usually a `DAV:searchrequest` document
    pub query: Option<String>,
    pub request: RequestOptions,
}

#[derive(Debug, Clone, Default)]
pub struct QuotaOptions {
    /// Defaults to `/`
    pub path: Option<String>,
    pub request: RequestOptions,
}

#[derive(Debug, Clone, Default)]
pub struct ReadStreamOptions {
    pub range: Option<ByteRange>,
    pub request: RequestOptions,
}

#[derive(Debug, Clone)]
pub struct WriteStreamOptions {
    pub overwrite: bool,
    pub request: RequestOptions,
}

impl Default for WriteStreamOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            request: RequestOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadDirectoryOptions {
    pub deep: bool,
    pub request: RequestOptions,
}
