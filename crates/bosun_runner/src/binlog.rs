//! Binlog download coordinator.
//!
//! Every instance with at least one backup-enabled database and a
//! binlog-capable engine gets at most one download worker at a time.
//! Workers are fire-and-forget relative to the tick; an unreachable
//! instance is routine and skipped silently.

use crate::paths;
use crate::runner::BackupRunner;
use crate::METRICS;
use bosun_db::Instance;
use std::sync::Arc;
use tracing::{debug, error};

impl BackupRunner {
    /// Launch a download worker for every eligible instance not already
    /// downloading.
    pub async fn launch_binlog_downloads(self: &Arc<Self>) {
        let instances = match self.db.find_backup_enabled_instances().await {
            Ok(instances) => instances,
            Err(err) => {
                METRICS.inc_store_errors();
                error!(error = %err, "Failed to retrieve instances with backup enabled");
                return;
            }
        };

        for instance in instances {
            if !instance.engine.supports_binlog() {
                continue;
            }
            // At most one worker per instance; the claim is atomic
            let Some(guard) = self.inflight_downloads.claim(instance.id) else {
                continue;
            };

            let runner = Arc::clone(self);
            self.download_workers.spawn(async move {
                let _guard = guard;
                runner.download_binlog_files_for_instance(&instance).await;
            });
        }
    }

    async fn download_binlog_files_for_instance(&self, instance: &Instance) {
        let mut driver = match self.drivers.admin_driver(instance).await {
            Ok(driver) => driver,
            Err(err) if err.is_connection_failure() => {
                // Expected for transient/unreachable instances
                debug!(instance = %instance.resource_id, error = %err, "Cannot connect to instance");
                return;
            }
            Err(err) => {
                error!(
                    instance = %instance.resource_id,
                    error = %err,
                    "Failed to get driver for instance when downloading binlog"
                );
                return;
            }
        };

        METRICS.inc_binlog_downloads_started();
        let dest = paths::binlog_abs_dir(&self.config.data_dir, instance.id);
        if let Err(err) = driver.download_binlog_files(&dest).await {
            error!(
                instance = %instance.resource_id,
                error = %err,
                "Failed to download binlog files for instance"
            );
        }
        driver.close().await;
    }
}
