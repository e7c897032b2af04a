use reqwest::StatusCode;
use thiserror::Error;

use super::ErrorCode;

pub type Result<T, E = WebDAVError> = std::result::Result<T, E>;

/// Every failure the client surfaces to callers
#[derive(Error, Debug)]
pub enum WebDAVError {
    /// Non-2xx answer from the server (after any auth retry budget is spent)
    #[error("{message}")]
    Status {
        status: u16,
        status_text: String,
        message: String,
    },

    #[error("{message}")]
    Local { code: ErrorCode, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("Path includes a file: {0}")]
    NotADirectory(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request cancelled")]
    Cancelled,
}

impl WebDAVError {
    pub fn from_status(status: StatusCode) -> Self {
        Self::from_status_with_prefix(status, "")
    }

    pub fn from_status_with_prefix(status: StatusCode, prefix: &str) -> Self {
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        Self::Status {
            status: status.as_u16(),
            message: format!(
                "{}Invalid response: {} {}",
                prefix,
                status.as_u16(),
                status_text
            ),
            status_text,
        }
    }

    /// Status error built from a `HTTP/1.1 404 Not Found` style line found in
    /// a multistatus body.
    pub fn from_status_line(status: u16, status_text: &str) -> Self {
        Self::Status {
            status,
            status_text: status_text.to_string(),
            message: format!("Invalid response: {} {}", status, status_text),
        }
    }

    pub fn local<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self::Local {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_auth_type<S: Into<String>>(message: S) -> Self {
        Self::local(ErrorCode::InvalidAuthType, message)
    }

    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn xml<E: std::fmt::Display>(err: E) -> Self {
        Self::Xml(err.to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            WebDAVError::Status { status, .. } => Some(*status),
            WebDAVError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            WebDAVError::Local { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WebDAVError::Cancelled)
    }

    /// Stable identifier for callers that route errors by kind
    pub fn error_code(&self) -> &'static str {
        match self {
            WebDAVError::Status { .. } => "HTTP_STATUS",
            WebDAVError::Local { code, .. } => code.as_str(),
            WebDAVError::InvalidResponse(_) => "INVALID_RESPONSE",
            WebDAVError::Xml(_) => "XML_PARSE",
            WebDAVError::NotADirectory(_) => "NOT_A_DIRECTORY",
            WebDAVError::InvalidConfig(_) => "INVALID_CONFIG",
            WebDAVError::InvalidMethod(_) => "INVALID_METHOD",
            WebDAVError::Url(_) => "INVALID_URL",
            WebDAVError::Transport(_) => "TRANSPORT",
            WebDAVError::Io(_) => "IO",
            WebDAVError::Cancelled => "CANCELLED",
        }
    }
}
