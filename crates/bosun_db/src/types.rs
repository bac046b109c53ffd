//! Unified types for all Bosun metadata entities.
//!
//! These types are the single source of truth. The runner, the CLI and the
//! tests all consume the same structs.

use serde::{Deserialize, Serialize};

/// Sentinel retention value meaning "retain indefinitely".
pub const RETENTION_UNSET: i64 = -1;

/// Sentinel day-of-week value meaning "every day".
pub const DAY_OF_WEEK_ANY: i64 = -1;

// ============================================================================
// Engines
// ============================================================================

/// Database engine of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Mysql,
    Mariadb,
    Postgres,
    Tidb,
    Clickhouse,
    Snowflake,
    Mongodb,
    Spanner,
    Redis,
    Oracle,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Postgres => "postgres",
            Self::Tidb => "tidb",
            Self::Clickhouse => "clickhouse",
            Self::Snowflake => "snowflake",
            Self::Mongodb => "mongodb",
            Self::Spanner => "spanner",
            Self::Redis => "redis",
            Self::Oracle => "oracle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" => Some(Self::Mysql),
            "mariadb" => Some(Self::Mariadb),
            "postgres" => Some(Self::Postgres),
            "tidb" => Some(Self::Tidb),
            "clickhouse" => Some(Self::Clickhouse),
            "snowflake" => Some(Self::Snowflake),
            "mongodb" => Some(Self::Mongodb),
            "spanner" => Some(Self::Spanner),
            "redis" => Some(Self::Redis),
            "oracle" => Some(Self::Oracle),
            _ => None,
        }
    }

    /// Engines capable of binlog-based point-in-time recovery.
    pub fn supports_binlog(&self) -> bool {
        matches!(self, Self::Mysql | Self::Mariadb)
    }

    /// Engines that receive automatic backups at all. The exclusion list is
    /// fixed: these engines have no dump path the task executor can drive.
    pub fn auto_backup_supported(&self) -> bool {
        !matches!(
            self,
            Self::Clickhouse
                | Self::Snowflake
                | Self::Mongodb
                | Self::Spanner
                | Self::Redis
                | Self::Oracle
        )
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Row status / backup lifecycle
// ============================================================================

/// Soft-deletion status of a metadata row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Normal,
    Archived,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution status of a backup artifact.
///
/// Created as `PendingCreate`; the downstream task executor advances it to
/// `Done` or `Failed`. This crate never moves it backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    PendingCreate,
    Done,
    Failed,
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingCreate => "pending_create",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending_create" => Some(Self::PendingCreate),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a backup came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Automatic,
    Manual,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "automatic" => Some(Self::Automatic),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Physical medium holding a backup or binlog artifact's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Local,
    ObjectStore,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::ObjectStore => "object_store",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "object_store" => Some(Self::ObjectStore),
            _ => None,
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Fleet entities
// ============================================================================

/// A managed database instance (one server).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: i64,
    /// Stable resource key, e.g. "prod-mysql-1".
    pub resource_id: String,
    pub title: String,
    pub engine: Engine,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub deleted: bool,
}

/// Parameters for registering an instance.
#[derive(Debug, Clone)]
pub struct NewInstance {
    pub resource_id: String,
    pub title: String,
    pub engine: Engine,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
}

/// A single database on an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub id: i64,
    pub instance_id: i64,
    pub project_id: i64,
    pub environment_id: i64,
    pub name: String,
}

/// Ownership grouping for databases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub resource_id: String,
    pub title: String,
    pub deleted: bool,
}

/// Deployment environment (e.g. dev, staging, prod).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: i64,
    pub resource_id: String,
    pub title: String,
    pub deleted: bool,
}

// ============================================================================
// Backup entities
// ============================================================================

/// Per-database automatic backup policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSetting {
    pub database_id: i64,
    pub enabled: bool,
    /// UTC hour-of-day (0..=23) at which the automatic backup runs.
    pub hour: i64,
    /// UTC day-of-week (0 = Sunday) or `DAY_OF_WEEK_ANY` for every day.
    pub day_of_week: i64,
    /// Seconds to retain produced backups; `RETENTION_UNSET` keeps forever.
    pub retention_period_secs: i64,
    /// Optional webhook to POST after a backup job is scheduled.
    pub hook_url: Option<String>,
}

impl BackupSetting {
    /// Whether the retention period is a real, finite window.
    pub fn has_finite_retention(&self) -> bool {
        self.retention_period_secs != RETENTION_UNSET
    }
}

/// One produced backup artifact (append-only metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub id: i64,
    pub database_id: i64,
    /// Unique per database; derived from project/environment/hour.
    pub name: String,
    pub status: BackupStatus,
    pub backup_type: BackupType,
    pub storage_backend: StorageBackend,
    /// Path relative to the backend-specific root.
    pub path: String,
    pub comment: String,
    pub row_status: RowStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Filter for listing backups.
#[derive(Debug, Clone, Default)]
pub struct BackupFilter {
    pub database_id: Option<i64>,
    pub row_status: Option<RowStatus>,
    pub name: Option<String>,
}

/// Parameters for creating a backup row.
#[derive(Debug, Clone)]
pub struct NewBackup {
    pub database_id: i64,
    pub name: String,
    pub status: BackupStatus,
    pub backup_type: BackupType,
    pub storage_backend: StorageBackend,
    pub path: String,
    pub comment: String,
}

// ============================================================================
// Downstream job chain
// ============================================================================

/// Task type executed by the downstream pipeline for a backup.
pub const TASK_DATABASE_BACKUP: &str = "bosun.database-backup";

/// Status a freshly created task carries until the executor claims it.
pub const TASK_STATUS_PENDING_APPROVAL: &str = "pending_approval";

/// Status of a freshly created task run.
pub const TASK_RUN_STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: i64,
    pub pipeline_id: i64,
    pub environment_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub pipeline_id: i64,
    pub stage_id: i64,
    pub instance_id: i64,
    pub database_id: i64,
    pub name: String,
    pub task_type: String,
    pub status: String,
    /// JSON payload for the executor; for backups `{"backupId": n}`.
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRun {
    pub id: i64,
    pub task_id: i64,
    pub name: String,
    pub status: String,
}

/// Task payload carried by a database-backup task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupTaskPayload {
    pub backup_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_roundtrip() {
        for engine in [
            Engine::Mysql,
            Engine::Mariadb,
            Engine::Postgres,
            Engine::Tidb,
            Engine::Clickhouse,
            Engine::Snowflake,
            Engine::Mongodb,
            Engine::Spanner,
            Engine::Redis,
            Engine::Oracle,
        ] {
            assert_eq!(Engine::parse(engine.as_str()), Some(engine));
        }
        assert_eq!(Engine::parse("cockroach"), None);
    }

    #[test]
    fn test_engine_policies() {
        assert!(Engine::Mysql.supports_binlog());
        assert!(Engine::Mariadb.supports_binlog());
        assert!(!Engine::Postgres.supports_binlog());

        assert!(Engine::Mysql.auto_backup_supported());
        assert!(Engine::Postgres.auto_backup_supported());
        assert!(Engine::Tidb.auto_backup_supported());
        for excluded in [
            Engine::Clickhouse,
            Engine::Snowflake,
            Engine::Mongodb,
            Engine::Spanner,
            Engine::Redis,
            Engine::Oracle,
        ] {
            assert!(!excluded.auto_backup_supported(), "{excluded} should be excluded");
        }
    }

    #[test]
    fn test_finite_retention() {
        let mut setting = BackupSetting {
            database_id: 1,
            enabled: true,
            hour: 3,
            day_of_week: DAY_OF_WEEK_ANY,
            retention_period_secs: 3600,
            hook_url: None,
        };
        assert!(setting.has_finite_retention());
        setting.retention_period_secs = RETENTION_UNSET;
        assert!(!setting.has_finite_retention());
    }

    #[test]
    fn test_backup_payload_shape() {
        let payload = BackupTaskPayload { backup_id: 42 };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"backupId":42}"#);
    }
}
