//! Bosun backup runner.
//!
//! The scheduling, concurrency-control and retention engine: a ticking
//! driver that triggers due automatic backups across the fleet, keeps at
//! most one binlog download in flight per instance, and reclaims storage by
//! purging backups and binlog files past their retention window.
//!
//! The runner only orchestrates. Metadata lives in [`bosun_db`], artifact
//! bytes live behind [`bosun_storage::ArtifactStore`], and dialect-specific
//! binlog extraction lives behind [`bosun_driver::DriverFactory`]. The
//! downstream job chain the runner creates is executed elsewhere.

pub mod binlog;
pub mod dispatch;
pub mod inflight;
pub mod metrics;
pub mod paths;
pub mod purge;
pub mod retention;
pub mod runner;
pub mod schedule;
pub mod webhook;

pub use inflight::{InflightGuard, InflightSet};
pub use metrics::METRICS;
pub use runner::{BackupRunner, RunnerConfig};
pub use schedule::ScheduleWindow;
