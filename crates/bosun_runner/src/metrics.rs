//! Metrics Module for Observability
//!
//! In-memory counters for monitoring runner health. Lock-free atomics;
//! single writer per site, any number of readers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics instance - lock-free atomics for counters
pub static METRICS: Metrics = Metrics::new();

/// Runner metrics - all fields are atomic for thread-safe access
pub struct Metrics {
    // Scheduler counters
    pub ticks: AtomicU64,
    pub tick_panics: AtomicU64,

    // Backup counters
    pub backups_scheduled: AtomicU64,
    pub backups_skipped_inflight: AtomicU64,
    pub backup_conflicts: AtomicU64,

    // Binlog counters
    pub binlog_downloads_started: AtomicU64,
    pub binlog_files_purged: AtomicU64,

    // Purge counters
    pub backups_archived: AtomicU64,

    // Error counters
    pub store_errors: AtomicU64,
    pub storage_errors: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            tick_panics: AtomicU64::new(0),
            backups_scheduled: AtomicU64::new(0),
            backups_skipped_inflight: AtomicU64::new(0),
            backup_conflicts: AtomicU64::new(0),
            binlog_downloads_started: AtomicU64::new(0),
            binlog_files_purged: AtomicU64::new(0),
            backups_archived: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
            storage_errors: AtomicU64::new(0),
        }
    }

    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tick_panics(&self) {
        self.tick_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_backups_scheduled(&self) {
        self.backups_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_backups_skipped_inflight(&self) {
        self.backups_skipped_inflight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_backup_conflicts(&self) {
        self.backup_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_binlog_downloads_started(&self) {
        self.binlog_downloads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_binlog_files_purged(&self, count: u64) {
        self.binlog_files_purged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_backups_archived(&self) {
        self.backups_archived.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_store_errors(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_storage_errors(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
    }
}
