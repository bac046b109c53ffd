//! Fleet operations (instances, databases, projects, environments).

use crate::error::{DbError, Result};
use crate::types::*;
use crate::BosunDb;
use sqlx::Row;

impl BosunDb {
    // ========================================================================
    // Projects / Environments
    // ========================================================================

    /// Register a project.
    pub async fn create_project(&self, resource_id: &str, title: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO projects (resource_id, title) VALUES (?, ?)")
            .bind(resource_id)
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a project by id.
    pub async fn get_project(&self, id: i64) -> Result<Project> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("project {id}")))?;

        Ok(Project {
            id: row.get("id"),
            resource_id: row.get("resource_id"),
            title: row.get("title"),
            deleted: row.get::<i64, _>("deleted") != 0,
        })
    }

    /// Soft-delete a project.
    pub async fn delete_project(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE projects SET deleted = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Register an environment.
    pub async fn create_environment(&self, resource_id: &str, title: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO environments (resource_id, title) VALUES (?, ?)")
            .bind(resource_id)
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get an environment by id.
    pub async fn get_environment(&self, id: i64) -> Result<Environment> {
        let row = sqlx::query("SELECT * FROM environments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("environment {id}")))?;

        Ok(Environment {
            id: row.get("id"),
            resource_id: row.get("resource_id"),
            title: row.get("title"),
            deleted: row.get::<i64, _>("deleted") != 0,
        })
    }

    /// Soft-delete an environment.
    pub async fn delete_environment(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE environments SET deleted = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Register an instance.
    pub async fn create_instance(&self, new: &NewInstance) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO instances (resource_id, title, engine, host, port, username, password)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.resource_id)
        .bind(&new.title)
        .bind(new.engine.as_str())
        .bind(&new.host)
        .bind(new.port as i64)
        .bind(&new.username)
        .bind(&new.password)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get an instance by id.
    pub async fn get_instance(&self, id: i64) -> Result<Instance> {
        let row = sqlx::query("SELECT * FROM instances WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("instance {id}")))?;

        row_to_instance(&row)
    }

    /// Get an instance by its stable resource key.
    pub async fn get_instance_by_resource_id(&self, resource_id: &str) -> Result<Instance> {
        let row = sqlx::query("SELECT * FROM instances WHERE resource_id = ?")
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("instance {resource_id}")))?;

        row_to_instance(&row)
    }

    /// Soft-delete an instance.
    pub async fn delete_instance(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE instances SET deleted = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// List all non-deleted instances.
    pub async fn list_instances(&self) -> Result<Vec<Instance>> {
        let rows = sqlx::query("SELECT * FROM instances WHERE deleted = 0 ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_instance).collect()
    }

    /// Instances owning at least one database with automatic backup enabled.
    pub async fn find_backup_enabled_instances(&self) -> Result<Vec<Instance>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT i.* FROM instances i
            JOIN databases d ON d.instance_id = i.id
            JOIN backup_settings bs ON bs.database_id = d.id
            WHERE i.deleted = 0 AND bs.enabled = 1
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_instance).collect()
    }

    // ========================================================================
    // Databases
    // ========================================================================

    /// Register a database.
    pub async fn create_database(
        &self,
        instance_id: i64,
        project_id: i64,
        environment_id: i64,
        name: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO databases (instance_id, project_id, environment_id, name)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(instance_id)
        .bind(project_id)
        .bind(environment_id)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a database by id.
    pub async fn get_database(&self, id: i64) -> Result<Database> {
        let row = sqlx::query("SELECT * FROM databases WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("database {id}")))?;

        Ok(Database {
            id: row.get("id"),
            instance_id: row.get("instance_id"),
            project_id: row.get("project_id"),
            environment_id: row.get("environment_id"),
            name: row.get("name"),
        })
    }
}

fn row_to_instance(row: &sqlx::sqlite::SqliteRow) -> Result<Instance> {
    let engine_str: String = row.get("engine");
    let engine = Engine::parse(&engine_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown engine: {engine_str}")))?;

    Ok(Instance {
        id: row.get("id"),
        resource_id: row.get("resource_id"),
        title: row.get("title"),
        engine,
        host: row.get("host"),
        port: row.get::<i64, _>("port") as u16,
        username: row.get("username"),
        password: row.get("password"),
        deleted: row.get::<i64, _>("deleted") != 0,
    })
}
