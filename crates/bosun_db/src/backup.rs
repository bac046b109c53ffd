//! Backup operations (policies and produced artifacts).

use crate::error::{DbError, Result};
use crate::types::*;
use crate::BosunDb;
use sqlx::Row;

impl BosunDb {
    // ========================================================================
    // Backup settings
    // ========================================================================

    /// Create or replace the backup policy for a database.
    pub async fn upsert_backup_setting(&self, setting: &BackupSetting) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO backup_settings
                (database_id, enabled, hour, day_of_week, retention_period_secs, hook_url)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(database_id) DO UPDATE SET
                enabled = excluded.enabled,
                hour = excluded.hour,
                day_of_week = excluded.day_of_week,
                retention_period_secs = excluded.retention_period_secs,
                hook_url = excluded.hook_url
            "#,
        )
        .bind(setting.database_id)
        .bind(setting.enabled)
        .bind(setting.hour)
        .bind(setting.day_of_week)
        .bind(setting.retention_period_secs)
        .bind(&setting.hook_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// List backup settings, optionally restricted to one instance's databases.
    pub async fn list_backup_settings(
        &self,
        instance_id: Option<i64>,
    ) -> Result<Vec<BackupSetting>> {
        let rows = match instance_id {
            Some(instance_id) => {
                sqlx::query(
                    r#"
                    SELECT bs.* FROM backup_settings bs
                    JOIN databases d ON d.id = bs.database_id
                    WHERE d.instance_id = ?
                    ORDER BY bs.database_id
                    "#,
                )
                .bind(instance_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM backup_settings ORDER BY database_id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(row_to_setting).collect()
    }

    /// Enabled settings whose schedule window matches the given UTC hour and
    /// weekday. A `day_of_week` of -1 matches every day.
    pub async fn find_backup_settings_match(
        &self,
        hour: i64,
        day_of_week: i64,
    ) -> Result<Vec<BackupSetting>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM backup_settings
            WHERE enabled = 1 AND hour = ? AND (day_of_week = ? OR day_of_week = -1)
            ORDER BY database_id
            "#,
        )
        .bind(hour)
        .bind(day_of_week)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_setting).collect()
    }

    // ========================================================================
    // Backups
    // ========================================================================

    /// Create a backup row. A duplicate (database_id, name) pair surfaces as
    /// `DbError::Constraint`.
    pub async fn create_backup(&self, new: &NewBackup) -> Result<Backup> {
        let now = Self::now_secs();
        let result = sqlx::query(
            r#"
            INSERT INTO backups
                (database_id, name, status, backup_type, storage_backend, path,
                 comment, row_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'normal', ?, ?)
            "#,
        )
        .bind(new.database_id)
        .bind(&new.name)
        .bind(new.status.as_str())
        .bind(new.backup_type.as_str())
        .bind(new.storage_backend.as_str())
        .bind(&new.path)
        .bind(&new.comment)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_backup(result.last_insert_rowid()).await
    }

    /// Get a backup by id.
    pub async fn get_backup(&self, id: i64) -> Result<Backup> {
        let row = sqlx::query("SELECT * FROM backups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("backup {id}")))?;
        row_to_backup(&row)
    }

    /// List backups matching a filter.
    pub async fn list_backups(&self, filter: &BackupFilter) -> Result<Vec<Backup>> {
        let mut sql = String::from("SELECT * FROM backups WHERE 1=1");
        if filter.database_id.is_some() {
            sql.push_str(" AND database_id = ?");
        }
        if filter.row_status.is_some() {
            sql.push_str(" AND row_status = ?");
        }
        if filter.name.is_some() {
            sql.push_str(" AND name = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql);
        if let Some(database_id) = filter.database_id {
            query = query.bind(database_id);
        }
        if let Some(row_status) = filter.row_status {
            query = query.bind(row_status.as_str());
        }
        if let Some(ref name) = filter.name {
            query = query.bind(name);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_backup).collect()
    }

    /// Archive a backup row (terminal; never reversed).
    pub async fn archive_backup(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE backups SET row_status = 'archived', updated_at = ? WHERE id = ?",
        )
        .bind(Self::now_secs())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("backup {id}")));
        }
        Ok(())
    }

    /// Advance a backup's execution status (used by the task executor).
    pub async fn update_backup_status(
        &self,
        id: i64,
        status: BackupStatus,
        comment: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE backups SET status = ?, comment = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(comment)
            .bind(Self::now_secs())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Backdate a backup's updated_at timestamp. Test-support only; retention
    /// math reads this column.
    pub async fn set_backup_updated_at(&self, id: i64, updated_at: i64) -> Result<()> {
        sqlx::query("UPDATE backups SET updated_at = ? WHERE id = ?")
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_setting(row: &sqlx::sqlite::SqliteRow) -> Result<BackupSetting> {
    Ok(BackupSetting {
        database_id: row.get("database_id"),
        enabled: row.get::<i64, _>("enabled") != 0,
        hour: row.get("hour"),
        day_of_week: row.get("day_of_week"),
        retention_period_secs: row.get("retention_period_secs"),
        hook_url: row.get("hook_url"),
    })
}

fn row_to_backup(row: &sqlx::sqlite::SqliteRow) -> Result<Backup> {
    let status_str: String = row.get("status");
    let status = BackupStatus::parse(&status_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown backup status: {status_str}")))?;
    let type_str: String = row.get("backup_type");
    let backup_type = BackupType::parse(&type_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown backup type: {type_str}")))?;
    let backend_str: String = row.get("storage_backend");
    let storage_backend = StorageBackend::parse(&backend_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown storage backend: {backend_str}")))?;
    let row_status_str: String = row.get("row_status");
    let row_status = RowStatus::parse(&row_status_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown row status: {row_status_str}")))?;

    Ok(Backup {
        id: row.get("id"),
        database_id: row.get("database_id"),
        name: row.get("name"),
        status,
        backup_type,
        storage_backend,
        path: row.get("path"),
        comment: row.get("comment"),
        row_status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
