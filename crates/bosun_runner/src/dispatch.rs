//! Backup dispatcher.
//!
//! For every backup setting whose schedule window matches the current hour,
//! decide whether a new backup is due, guard against duplicate concurrent
//! creation, and materialize the downstream job chain (pipeline -> stage ->
//! task -> task run) that will actually run it. Decisions are synchronous
//! within the tick; the job-chain creation runs in a worker.

use crate::paths;
use crate::runner::BackupRunner;
use crate::schedule::{backup_name, ScheduleWindow};
use crate::METRICS;
use anyhow::{Context, Result};
use bosun_db::{
    Backup, BackupFilter, BackupStatus, BackupTaskPayload, BackupType, Database, NewBackup,
    StorageBackend, TASK_DATABASE_BACKUP,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl BackupRunner {
    /// Trigger every automatic backup due in the current scheduling window.
    pub async fn trigger_due_backups(self: &Arc<Self>, now: DateTime<Utc>) {
        let window = ScheduleWindow::truncate(now);
        let settings = match self
            .db
            .find_backup_settings_match(window.hour, window.day_of_week)
            .await
        {
            Ok(settings) => settings,
            Err(err) => {
                METRICS.inc_store_errors();
                error!(error = %err, "Failed to retrieve backup settings match");
                return;
            }
        };

        for setting in settings {
            // Duplicate-trigger guard: one outstanding job per database
            if self.inflight_backups.contains(setting.database_id) {
                METRICS.inc_backups_skipped_inflight();
                debug!(database_id = setting.database_id, "Backup already in flight; skipping");
                continue;
            }

            // Resolve the ownership chain. Every failure or soft-deleted
            // owner skips this candidate only.
            let database = match self.db.get_database(setting.database_id).await {
                Ok(database) => database,
                Err(err) => {
                    warn!(database_id = setting.database_id, error = %err, "Failed to get database");
                    continue;
                }
            };
            let project = match self.db.get_project(database.project_id).await {
                Ok(project) => project,
                Err(err) => {
                    warn!(database_id = database.id, error = %err, "Failed to get project");
                    continue;
                }
            };
            if project.deleted {
                continue;
            }
            let instance = match self.db.get_instance(database.instance_id).await {
                Ok(instance) => instance,
                Err(err) => {
                    warn!(database_id = database.id, error = %err, "Failed to get instance");
                    continue;
                }
            };
            if instance.deleted {
                continue;
            }
            if !instance.engine.auto_backup_supported() {
                continue;
            }
            let environment = match self.db.get_environment(database.environment_id).await {
                Ok(environment) => environment,
                Err(err) => {
                    warn!(database_id = database.id, error = %err, "Failed to get environment");
                    continue;
                }
            };
            if environment.deleted {
                continue;
            }

            // Idempotent trigger: re-running the same hour's tick must not
            // create a second backup.
            let name = backup_name(&project.title, &environment.title, &window);
            let existing = match self
                .db
                .list_backups(&BackupFilter {
                    database_id: Some(database.id),
                    row_status: None,
                    name: Some(name.clone()),
                })
                .await
            {
                Ok(existing) => existing,
                Err(err) => {
                    METRICS.inc_store_errors();
                    error!(database_id = database.id, error = %err, "Failed to find backup");
                    continue;
                }
            };
            if !existing.is_empty() {
                continue;
            }

            let Some(guard) = self.inflight_backups.claim(database.id) else {
                continue;
            };

            let runner = Arc::clone(self);
            let hook_url = setting.hook_url.clone();
            self.backup_workers.spawn(async move {
                // Claim clears when the guard drops, success or failure
                let _guard = guard;
                debug!(
                    database = %database.name,
                    backup = %name,
                    "Scheduling automatic backup"
                );
                match runner.schedule_backup_task(&database, &name).await {
                    Ok(Some(_backup)) => {
                        METRICS.inc_backups_scheduled();
                        if let Some(url) = hook_url {
                            runner.notifier.post_hook(&url, database.id).await;
                        }
                    }
                    Ok(None) => {
                        // Lost a creation race; the winner owns this hour
                        METRICS.inc_backup_conflicts();
                    }
                    Err(err) => {
                        error!(
                            database_id = database.id,
                            error = %err,
                            "Failed to create automatic backup for database"
                        );
                    }
                }
            });
        }
    }

    /// Create the backup row and its downstream job chain. Returns `None`
    /// when the storage layer reports the name already taken (benign race).
    /// A failure after row creation leaves the row in place for operator
    /// inspection; there is no rollback.
    pub async fn schedule_backup_task(&self, database: &Database, name: &str) -> Result<Option<Backup>> {
        let path = paths::backup_relative_file_path(database.id, name);
        if self.config.backend == StorageBackend::Local {
            let dir = self.config.data_dir.join(paths::backup_relative_dir(database.id));
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("failed to create backup directory {}", dir.display()))?;
        }

        let backup = match self
            .db
            .create_backup(&NewBackup {
                database_id: database.id,
                name: name.to_string(),
                status: BackupStatus::PendingCreate,
                backup_type: BackupType::Automatic,
                storage_backend: self.config.backend,
                path,
                comment: String::new(),
            })
            .await
        {
            Ok(backup) => backup,
            Err(err) if err.is_conflict() => {
                info!(backup = name, database = %database.name, "Backup already exists for the database");
                return Ok(None);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to create backup {name}"));
            }
        };

        let payload = serde_json::to_string(&BackupTaskPayload { backup_id: backup.id })
            .with_context(|| format!("failed to create task payload for backup {name}"))?;

        let pipeline = self
            .db
            .create_pipeline(database.project_id, &format!("backup-{name}"))
            .await
            .with_context(|| format!("failed to create pipeline for backup {name}"))?;

        let stage = self
            .db
            .create_stage(pipeline.id, database.environment_id, &format!("backup-{name}"))
            .await
            .with_context(|| format!("failed to create stage for backup {name}"))?;

        let task = self
            .db
            .create_task(
                pipeline.id,
                stage.id,
                database.instance_id,
                database.id,
                &format!("backup-{name}"),
                TASK_DATABASE_BACKUP,
                &payload,
            )
            .await
            .with_context(|| format!("failed to create task for backup {name}"))?;

        self.db
            .create_pending_task_run(task.id, &format!("{} {}", task.name, Utc::now().timestamp()))
            .await
            .with_context(|| format!("failed to create pending task run for backup {name}"))?;

        Ok(Some(backup))
    }
}
