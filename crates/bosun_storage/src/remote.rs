//! Remote object-store backend.

use crate::{ArtifactStore, Result, StorageEntry, StorageError};
use async_trait::async_trait;
use futures_util::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Artifacts stored in a remote object store bucket.
#[derive(Clone)]
pub struct RemoteStore {
    store: Arc<dyn ObjectStore>,
}

impl RemoteStore {
    /// Wrap an already-built object store client.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Build an S3-backed store for a bucket; credentials and region come
    /// from the environment.
    pub fn s3(bucket: &str) -> Result<Self> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|err| StorageError::Config(err.to_string()))?;
        Ok(Self {
            store: Arc::new(store),
        })
    }
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl ArtifactStore for RemoteStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StorageEntry>> {
        let prefix_path = ObjectPath::from(prefix);
        let mut stream = self.store.list(Some(&prefix_path));

        let mut entries = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta?;
            entries.push(StorageEntry {
                key: meta.location.to_string(),
                last_modified: meta.last_modified,
            });
        }

        Ok(entries)
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        // One batched multi-key call; stores without native bulk delete fall
        // back to per-key requests inside the client.
        let locations = futures_util::stream::iter(
            keys.iter()
                .map(|key| Ok(ObjectPath::from(key.as_str())))
                .collect::<Vec<object_store::Result<ObjectPath>>>(),
        )
        .boxed();

        let mut results = self.store.delete_stream(locations);
        let mut first_error: Option<StorageError> = None;
        while let Some(result) = results.next().await {
            match result {
                Ok(path) => debug!(key = %path, "Deleted remote artifact"),
                // Already gone counts as deleted
                Err(object_store::Error::NotFound { .. }) => {}
                Err(err) => {
                    warn!(error = %err, "Failed to delete remote artifact");
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
    use object_store::memory::InMemory;
    use object_store::PutPayload;

    #[tokio::test]
    async fn test_list_and_batch_delete() {
        let inner = Arc::new(InMemory::new());
        for key in ["backup/binlog/1/binlog.000001", "backup/binlog/1/binlog.000002"] {
            inner
                .put(&ObjectPath::from(key), PutPayload::from_static(b"x"))
                .await
                .unwrap();
        }
        let store = RemoteStore::new(inner);

        let entries = store.list("backup/binlog/1").await.unwrap();
        assert_eq!(entries.len(), 2);

        store
            .delete(&[
                "backup/binlog/1/binlog.000001".to_string(),
                "backup/binlog/1/binlog.000002".to_string(),
                // Absent keys are tolerated
                "backup/binlog/1/binlog.999999".to_string(),
            ])
            .await
            .unwrap();

        assert!(store.list("backup/binlog/1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_empty_is_noop() {
        let store = RemoteStore::new(Arc::new(InMemory::new()));
        store.delete(&[]).await.unwrap();
    }
}
