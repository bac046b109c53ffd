//! Database driver seam.
//!
//! The scheduler needs exactly three things from a database driver: an
//! administrative connection to an instance (with "cannot connect" kept
//! distinct from every other failure, because unreachable instances are
//! routine), a way to pull down the binlog files that are not yet local, and
//! a clean release. Everything dialect-specific lives behind these traits.

mod mysql;

pub use mysql::MysqlDriverFactory;

use async_trait::async_trait;
use bosun_db::Instance;
use std::path::Path;
use thiserror::Error;

/// Driver operation result type.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors returned by the driver layer.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The instance could not be reached. Expected for transient or
    /// decommissioned instances; callers skip silently.
    #[error("cannot connect to instance: {0}")]
    ConnectionFailure(String),

    /// The instance's engine has no driver for this operation.
    #[error("engine {0} does not support this operation")]
    Unsupported(String),

    /// IO error while staging downloaded files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other driver failure.
    #[error("driver error: {0}")]
    Internal(String),
}

impl DriverError {
    /// Whether this error is the expected "instance unreachable" case.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, DriverError::ConnectionFailure(_))
    }
}

/// Produces administrative connections to instances.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn admin_driver(&self, instance: &Instance) -> Result<Box<dyn AdminDriver>>;
}

/// An open administrative connection to one instance.
#[async_trait]
pub trait AdminDriver: Send + Sync {
    /// Download every binlog file not yet present in `dest_dir`. The file
    /// currently being written by the server is never fetched; it will be
    /// picked up once the server rotates past it.
    async fn download_binlog_files(&mut self, dest_dir: &Path) -> Result<()>;

    /// Release the connection.
    async fn close(self: Box<Self>);
}
