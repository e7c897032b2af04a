pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod webdav_xml_parser;

pub use errors::{ErrorCode, Result, WebDAVError};
pub use services::webdav::{WebDAVConfig, WebDAVService};
