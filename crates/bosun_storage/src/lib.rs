//! Storage backend adapter for backup and binlog artifacts.
//!
//! The purge/retention logic is written once against [`ArtifactStore`]; the
//! two implementations supply the backend-specific listing and deletion
//! semantics:
//!
//! - [`LocalDisk`]: files under a root directory, modification time from the
//!   filesystem, deletions one file at a time (a missing file is success).
//! - [`RemoteStore`]: an `object_store`-backed bucket, modification time as
//!   reported by the store, deletions batched into one multi-key call.
//!
//! Keys are slash-separated paths relative to the backend root.

mod local;
mod remote;

pub use local::LocalDisk;
pub use remote::RemoteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage operation result type.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors returned by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Invalid storage configuration: {0}")]
    Config(String),
}

/// One stored artifact as reported by a backend listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    /// Key relative to the backend root.
    pub key: String,
    /// Backend-reported last modification time.
    pub last_modified: DateTime<Utc>,
}

/// Uniform list/delete contract over the physical storage backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// List artifacts under a prefix. A prefix that does not exist yields an
    /// empty listing, not an error.
    async fn list(&self, prefix: &str) -> Result<Vec<StorageEntry>>;

    /// Delete artifacts by key. An already-absent key is success.
    async fn delete(&self, keys: &[String]) -> Result<()>;
}
