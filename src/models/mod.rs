// Records produced by the client, and the parsed multistatus tree

pub mod dav;
pub mod file;

pub use dav::{DAVPropstat, DAVProps, DAVResponse, DAVResult};
pub use file::{
    DAVCompliance, DiskQuota, DiskQuotaAvailable, FileKind, FileStat, LockResponse,
    PartialUpdateStrategy, QuotaSentinel, SearchResult,
};
