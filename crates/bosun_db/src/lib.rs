//! Unified metadata store for Bosun.
//!
//! This crate provides a single source of truth for all metadata operations:
//! fleet topology (instances, databases, projects, environments), backup
//! policies and produced backups, and the downstream job chain the scheduler
//! hands off to the task executor.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bosun_db::{BosunDb, Result};
//!
//! let db = BosunDb::open("~/.bosun/bosun.sqlite3").await?;
//!
//! let due = db.find_backup_settings_match(3, 1).await?;
//! let instances = db.find_backup_enabled_instances().await?;
//! ```

mod error;
mod schema;
mod types;

// Method implementations organized by domain
mod backup;
mod fleet;
mod pipeline;

pub use error::{DbError, Result};
pub use types::*;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// Unified metadata store for all Bosun operations.
///
/// This is the ONLY way to access the metadata database. Do not use raw
/// sqlx elsewhere.
#[derive(Clone)]
pub struct BosunDb {
    pool: SqlitePool,
}

impl BosunDb {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Metadata store opened");

        Ok(db)
    }

    /// Open an in-memory database (tests, ephemeral runs).
    ///
    /// A single connection keeps the shared in-memory database alive for the
    /// lifetime of the pool.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        Ok(db)
    }

    /// Get the underlying connection pool (escape hatch for complex queries).
    ///
    /// Prefer using the typed methods instead.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Current time as seconds since Unix epoch.
    pub fn now_secs() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_database() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("bosun.db");

        let db = BosunDb::open(&db_path).await.unwrap();
        assert!(db_path.exists());

        db.close().await;
    }

    #[tokio::test]
    async fn test_open_memory() {
        let db = BosunDb::open_memory().await.unwrap();
        assert!(db.list_instances().await.unwrap().is_empty());
    }
}
