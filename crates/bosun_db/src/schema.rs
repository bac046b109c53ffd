//! Database schema creation for all Bosun tables.
//!
//! All CREATE TABLE statements live here - single source of truth.

use crate::error::Result;
use crate::BosunDb;
use tracing::info;

impl BosunDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // Enable WAL mode for better concurrent access
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(&self.pool)
            .await?;

        self.create_fleet_tables().await?;
        self.create_backup_tables().await?;
        self.create_pipeline_tables().await?;

        info!("Database schema verified");
        Ok(())
    }

    /// Create fleet tables (instances, databases, ownership chain)
    async fn create_fleet_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS environments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                engine TEXT NOT NULL,
                host TEXT NOT NULL DEFAULT '',
                port INTEGER NOT NULL DEFAULT 3306,
                username TEXT NOT NULL DEFAULT '',
                password TEXT,
                deleted INTEGER NOT NULL DEFAULT 0
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS databases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instance_id INTEGER NOT NULL REFERENCES instances(id),
                project_id INTEGER NOT NULL REFERENCES projects(id),
                environment_id INTEGER NOT NULL REFERENCES environments(id),
                name TEXT NOT NULL,
                UNIQUE(instance_id, name)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create backup tables (settings and produced artifacts)
    async fn create_backup_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS backup_settings (
                database_id INTEGER PRIMARY KEY REFERENCES databases(id),
                enabled INTEGER NOT NULL DEFAULT 0,
                hour INTEGER NOT NULL DEFAULT 0,
                day_of_week INTEGER NOT NULL DEFAULT -1,
                retention_period_secs INTEGER NOT NULL DEFAULT -1,
                hook_url TEXT
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // Backup names are unique per database: the scheduler derives the
        // name from the schedule hour, so the constraint is what makes a
        // re-run of the same hour idempotent.
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS backups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                database_id INTEGER NOT NULL REFERENCES databases(id),
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                backup_type TEXT NOT NULL,
                storage_backend TEXT NOT NULL,
                path TEXT NOT NULL,
                comment TEXT NOT NULL DEFAULT '',
                row_status TEXT NOT NULL DEFAULT 'normal',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(database_id, name)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_backups_database_row_status
             ON backups(database_id, row_status)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create downstream job chain tables (pipeline -> stage -> task -> task run)
    async fn create_pipeline_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS pipelines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES projects(id),
                name TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS stages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pipeline_id INTEGER NOT NULL REFERENCES pipelines(id),
                environment_id INTEGER NOT NULL REFERENCES environments(id),
                name TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pipeline_id INTEGER NOT NULL REFERENCES pipelines(id),
                stage_id INTEGER NOT NULL REFERENCES stages(id),
                instance_id INTEGER NOT NULL REFERENCES instances(id),
                database_id INTEGER NOT NULL REFERENCES databases(id),
                name TEXT NOT NULL,
                task_type TEXT NOT NULL,
                status TEXT NOT NULL,
                payload TEXT NOT NULL DEFAULT '{}'
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS task_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL REFERENCES tasks(id),
                name TEXT NOT NULL,
                status TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
