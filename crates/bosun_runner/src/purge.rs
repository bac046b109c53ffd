//! Purge engine.
//!
//! Two independent passes per tick: expired backups (archive the row, delete
//! the artifact from its recorded backend) and expired binlog files (delete
//! by age from the active backend, using the minimum finite retention across
//! the instance's settings). Each item runs inside its own error boundary;
//! one database's failure or panic never starves its siblings.

use crate::retention;
use crate::runner::{panic_message, BackupRunner};
use crate::{paths, METRICS};
use anyhow::{Context, Result};
use bosun_db::{Backup, BackupFilter, BackupSetting, Instance, RowStatus};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, warn};

impl BackupRunner {
    /// Purge all expired backups and binlog files.
    pub async fn purge_expired_backup_data(&self, now: DateTime<Utc>) {
        self.purge_expired_backups(now).await;
        self.purge_expired_binlogs(now).await;
    }

    async fn purge_expired_backups(&self, now: DateTime<Utc>) {
        let settings = match self.db.list_backup_settings(None).await {
            Ok(settings) => settings,
            Err(err) => {
                METRICS.inc_store_errors();
                error!(error = %err, "Failed to find all the backup settings");
                return;
            }
        };

        for setting in settings {
            if !setting.has_finite_retention() {
                continue;
            }
            // Error boundary per database
            let purge = AssertUnwindSafe(self.purge_backups_for_setting(&setting, now))
                .catch_unwind()
                .await;
            if let Err(panic) = purge {
                error!(
                    database_id = setting.database_id,
                    panic = panic_message(&panic),
                    "Backup purge panicked for database"
                );
            }
        }
    }

    async fn purge_backups_for_setting(&self, setting: &BackupSetting, now: DateTime<Utc>) {
        let backups = match self
            .db
            .list_backups(&BackupFilter {
                database_id: Some(setting.database_id),
                row_status: Some(RowStatus::Normal),
                name: None,
            })
            .await
        {
            Ok(backups) => backups,
            Err(err) => {
                METRICS.inc_store_errors();
                error!(database_id = setting.database_id, error = %err, "Failed to get backups for database");
                return;
            }
        };

        for backup in backups {
            if !retention::is_expired(backup.updated_at, setting.retention_period_secs, now) {
                continue;
            }
            debug!(
                database_id = backup.database_id,
                backup = %backup.name,
                storage_backend = %backup.storage_backend,
                "Purging expired backup"
            );
            if let Err(err) = self.purge_backup(&backup).await {
                error!(backup = %backup.name, error = %err, "Failed to purge backup");
            }
        }
    }

    /// Archive one backup and delete its artifact. Archival failure aborts
    /// this backup's purge; a delete failure leaves the row archived and the
    /// file lingering for the operator.
    async fn purge_backup(&self, backup: &Backup) -> Result<()> {
        self.db
            .archive_backup(backup.id)
            .await
            .with_context(|| {
                format!(
                    "failed to archive expired backup {} for database {}",
                    backup.name, backup.database_id
                )
            })?;
        METRICS.inc_backups_archived();
        debug!(backup = %backup.name, id = backup.id, "Archived expired backup record");

        let Some(store) = self.store_for(backup.storage_backend) else {
            warn!(
                backup = %backup.name,
                storage_backend = %backup.storage_backend,
                "No store configured for backend; artifact left in place"
            );
            return Ok(());
        };
        if let Err(err) = store.delete(std::slice::from_ref(&backup.path)).await {
            METRICS.inc_storage_errors();
            error!(
                backup = %backup.name,
                path = %backup.path,
                error = %err,
                "Failed to delete expired backup artifact"
            );
        } else {
            debug!(path = %backup.path, "Deleted expired backup artifact");
        }

        Ok(())
    }

    async fn purge_expired_binlogs(&self, now: DateTime<Utc>) {
        let instances = match self.db.list_instances().await {
            Ok(instances) => instances,
            Err(err) => {
                METRICS.inc_store_errors();
                error!(error = %err, "Failed to find non-archived instances");
                return;
            }
        };

        for instance in instances {
            if !instance.engine.supports_binlog() {
                continue;
            }
            // Error boundary per instance
            let purge = AssertUnwindSafe(self.purge_binlogs_for_instance(&instance, now))
                .catch_unwind()
                .await;
            if let Err(panic) = purge {
                error!(
                    instance = %instance.resource_id,
                    panic = panic_message(&panic),
                    "Binlog purge panicked for instance"
                );
            }
        }
    }

    async fn purge_binlogs_for_instance(&self, instance: &Instance, now: DateTime<Utc>) {
        let settings = match self.db.list_backup_settings(Some(instance.id)).await {
            Ok(settings) => settings,
            Err(err) => {
                METRICS.inc_store_errors();
                error!(instance = %instance.resource_id, error = %err, "Failed to find backup settings for instance");
                return;
            }
        };
        // No finite-retention setting: never purge this instance
        let Some(retention_secs) = retention::min_finite_retention(&settings) else {
            return;
        };

        if let Err(err) = self.purge_binlog_files(instance, retention_secs, now).await {
            error!(
                instance = %instance.resource_id,
                retention_secs,
                error = %err,
                "Failed to purge binlog files for instance"
            );
        }
    }

    async fn purge_binlog_files(
        &self,
        instance: &Instance,
        retention_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(store) = self.store_for(self.config.backend) else {
            anyhow::bail!("no store configured for backend {}", self.config.backend);
        };

        let prefix = paths::binlog_relative_dir(instance.id);
        let entries = store
            .list(&prefix)
            .await
            .with_context(|| format!("failed to list binlog dir {prefix}"))?;

        let expired: Vec<String> = entries
            .into_iter()
            .filter(|entry| {
                retention::is_expired(entry.last_modified.timestamp(), retention_secs, now)
            })
            .map(|entry| entry.key)
            .collect();
        if expired.is_empty() {
            return Ok(());
        }

        debug!(
            instance = %instance.resource_id,
            count = expired.len(),
            "Deleting expired binlog files"
        );
        store
            .delete(&expired)
            .await
            .with_context(|| format!("failed to delete {} expired binlog files", expired.len()))?;
        METRICS.add_binlog_files_purged(expired.len() as u64);

        Ok(())
    }
}
