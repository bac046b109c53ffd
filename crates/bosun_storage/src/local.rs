//! Local filesystem backend.

use crate::{ArtifactStore, Result, StorageEntry, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Artifacts stored as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path for a key.
    pub fn absolute(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for LocalDisk {
    async fn list(&self, prefix: &str) -> Result<Vec<StorageEntry>> {
        let dir = self.root.join(prefix);
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "Failed to stat file");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "No modification time");
                    continue;
                }
            };
            entries.push(StorageEntry {
                key: format!("{}/{}", prefix.trim_end_matches('/'), entry.file_name().to_string_lossy()),
                last_modified: DateTime::<Utc>::from(modified),
            });
        }

        Ok(entries)
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        // One file at a time; an already-deleted file is success, any other
        // failure is remembered but does not stop the remaining deletions.
        let mut first_error: Option<StorageError> = None;
        for key in keys {
            let path = self.root.join(key);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Deleted local artifact"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Failed to delete local artifact");
                    if first_error.is_none() {
                        first_error = Some(err.into());
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_file(root: &Path, key: &str) {
        let path = root.join(key);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"data").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let tmp = TempDir::new().unwrap();
        let disk = LocalDisk::new(tmp.path());
        assert!(disk.list("backup/binlog/42").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let tmp = TempDir::new().unwrap();
        let disk = LocalDisk::new(tmp.path());

        write_file(tmp.path(), "backup/binlog/1/binlog.000001").await;
        write_file(tmp.path(), "backup/binlog/1/binlog.000002").await;

        let mut entries = disk.list("backup/binlog/1").await.unwrap();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "backup/binlog/1/binlog.000001");

        disk.delete(&[
            "backup/binlog/1/binlog.000001".to_string(),
            // Deleting a missing key is success
            "backup/binlog/1/binlog.999999".to_string(),
        ])
        .await
        .unwrap();

        let entries = disk.list("backup/binlog/1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "backup/binlog/1/binlog.000002");
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let tmp = TempDir::new().unwrap();
        let disk = LocalDisk::new(tmp.path());

        write_file(tmp.path(), "backup/db/1/a.sql").await;
        tokio::fs::create_dir_all(tmp.path().join("backup/db/1/nested"))
            .await
            .unwrap();

        let entries = disk.list("backup/db/1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "backup/db/1/a.sql");
    }
}
