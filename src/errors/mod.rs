use std::fmt;

use serde::Serialize;

pub mod webdav;

pub use webdav::{Result, WebDAVError};

/// Symbolic causes for failures detected locally, before or without a
/// server round trip. The string forms are what callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    InvalidAuthType,
    InvalidUpdateRange,
    NotSupported,
    InvalidOutputFormat,
    DataTypeNoLength,
    DataType,
    LinkUnsupportedAuthType,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidAuthType => "invalid-auth-type",
            ErrorCode::InvalidUpdateRange => "invalid-range",
            ErrorCode::NotSupported => "unsupported-partial-update",
            ErrorCode::InvalidOutputFormat => "invalid-output-format",
            ErrorCode::DataTypeNoLength => "data-length-uncomputable",
            ErrorCode::DataType => "data-type",
            ErrorCode::LinkUnsupportedAuthType => "unsupported-link-auth-type",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
