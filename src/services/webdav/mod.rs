// WebDAV client modules organized by functionality

pub mod auth;
pub mod config;
pub mod connection;
pub mod context;
pub mod options;
pub mod request;
pub mod service;
pub mod streams;
pub mod url_management;

// Re-export main types for convenience
pub use auth::{AuthType, Credentials, DigestState, OAuthToken};
pub use config::{ConcurrencyConfig, WebDAVConfig, DEFAULT_CONTACT_HREF};
pub use connection::{DavResponse, HttpTransport, ReqwestTransport, WebDAVConnection};
pub use context::WebDAVClientContext;
pub use options::{
    ByteRange, CopyFileOptions, CreateDirectoryOptions, DirectoryContentsOptions,
    DownloadDirectoryOptions, FileContentsOptions, LockOptions, MoveFileOptions, OutputFormat,
    PutFileContentsOptions, QuotaOptions, ReadStreamOptions, SearchOptions, StatOptions,
    WriteStreamOptions,
};
pub use request::{ContentLength, Headers, RequestBody, RequestDescriptor, RequestOptions};
pub use service::{DownloadedFile, FileContents, WebDAVService};
pub use streams::{ReadStream, WriteStream};
pub use url_management::WebDAVUrlManager;

// Test modules
#[cfg(test)]
mod tests;
