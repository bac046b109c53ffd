//! The scheduler loop.
//!
//! One ticking driver task fires at a fixed interval. Each tick triggers due
//! backups fleet-wide, launches missing binlog downloads, and purges expired
//! backup data, in that order, synchronously within the tick. The work each
//! phase launches is asynchronous; the tick never waits for it. A panic
//! anywhere in a tick is caught, logged, and the loop keeps going. On
//! cancellation the loop stops ticking and drains every in-flight worker
//! before returning.

use crate::inflight::InflightSet;
use crate::metrics::METRICS;
use crate::webhook::Notifier;
use anyhow::{bail, Result};
use bosun_db::{BosunDb, StorageBackend};
use bosun_driver::DriverFactory;
use bosun_storage::ArtifactStore;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How often the scheduler ticks.
    pub tick_interval: Duration,
    /// Root directory for local artifacts.
    pub data_dir: PathBuf,
    /// Backend new backups are written to and binlog purge scans.
    pub backend: StorageBackend,
}

/// The backup runner scheduling automatic backups, binlog downloads and
/// retention purges.
pub struct BackupRunner {
    pub(crate) db: BosunDb,
    pub(crate) drivers: Arc<dyn DriverFactory>,
    pub(crate) local: Arc<dyn ArtifactStore>,
    pub(crate) remote: Option<Arc<dyn ArtifactStore>>,
    pub(crate) notifier: Notifier,
    pub(crate) config: RunnerConfig,
    pub(crate) inflight_backups: InflightSet,
    pub(crate) inflight_downloads: InflightSet,
    pub(crate) backup_workers: TaskTracker,
    pub(crate) download_workers: TaskTracker,
}

impl BackupRunner {
    /// Create a runner. The remote store is required when the configured
    /// backend is the object store.
    pub fn new(
        db: BosunDb,
        drivers: Arc<dyn DriverFactory>,
        local: Arc<dyn ArtifactStore>,
        remote: Option<Arc<dyn ArtifactStore>>,
        config: RunnerConfig,
    ) -> Result<Arc<Self>> {
        if config.backend == StorageBackend::ObjectStore && remote.is_none() {
            bail!("object store backend selected but no remote store configured");
        }

        Ok(Arc::new(Self {
            db,
            drivers,
            local,
            remote,
            notifier: Notifier::new(),
            config,
            inflight_backups: InflightSet::new(),
            inflight_downloads: InflightSet::new(),
            backup_workers: TaskTracker::new(),
            download_workers: TaskTracker::new(),
        }))
    }

    /// Run until the token is cancelled, then drain in-flight workers.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.tick_interval,
            self.config.tick_interval,
        );
        // A missed window is skipped, never replayed
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = self.config.tick_interval.as_secs(), "Backup runner started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    METRICS.inc_ticks();
                    let tick = AssertUnwindSafe(self.run_tick(Utc::now())).catch_unwind().await;
                    if let Err(panic) = tick {
                        METRICS.inc_tick_panics();
                        error!(panic = panic_message(&panic), "Backup runner tick panicked; continuing");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Backup runner stopping; draining in-flight work");
                    self.backup_workers.close();
                    self.download_workers.close();
                    self.backup_workers.wait().await;
                    self.download_workers.wait().await;
                    info!("Backup runner stopped");
                    return;
                }
            }
        }
    }

    /// One scheduler tick: trigger due backups, launch missing binlog
    /// downloads, purge expired data.
    pub async fn run_tick(self: &Arc<Self>, now: DateTime<Utc>) {
        self.trigger_due_backups(now).await;
        self.launch_binlog_downloads().await;
        self.purge_expired_backup_data(now).await;
    }

    /// The store holding a given backend's artifacts, if configured.
    pub(crate) fn store_for(&self, backend: StorageBackend) -> Option<&Arc<dyn ArtifactStore>> {
        match backend {
            StorageBackend::Local => Some(&self.local),
            StorageBackend::ObjectStore => self.remote.as_ref(),
        }
    }

    /// In-flight backup set (one entry per database with a running job).
    pub fn inflight_backups(&self) -> &InflightSet {
        &self.inflight_backups
    }

    /// In-flight download set (one entry per instance with a running download).
    pub fn inflight_downloads(&self) -> &InflightSet {
        &self.inflight_downloads
    }

    /// Wait for all currently tracked workers to finish. Test support; the
    /// `run` loop drains through the same trackers on shutdown.
    pub async fn drain(&self) {
        self.backup_workers.close();
        self.download_workers.close();
        self.backup_workers.wait().await;
        self.download_workers.wait().await;
        self.backup_workers.reopen();
        self.download_workers.reopen();
    }
}

/// Human-readable payload of a caught panic.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
