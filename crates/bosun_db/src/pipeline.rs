//! Downstream job chain operations (pipeline -> stage -> task -> task run).
//!
//! The scheduler creates these records to represent "run this backup"; the
//! task executor owns and advances them afterwards. This crate's contract
//! ends at the successful creation of a pending task run.

use crate::error::{DbError, Result};
use crate::types::*;
use crate::BosunDb;
use sqlx::Row;

impl BosunDb {
    /// Create a pipeline.
    pub async fn create_pipeline(&self, project_id: i64, name: &str) -> Result<Pipeline> {
        let result = sqlx::query("INSERT INTO pipelines (project_id, name) VALUES (?, ?)")
            .bind(project_id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(Pipeline {
            id: result.last_insert_rowid(),
            project_id,
            name: name.to_string(),
        })
    }

    /// Create a stage inside a pipeline.
    pub async fn create_stage(
        &self,
        pipeline_id: i64,
        environment_id: i64,
        name: &str,
    ) -> Result<Stage> {
        let result =
            sqlx::query("INSERT INTO stages (pipeline_id, environment_id, name) VALUES (?, ?, ?)")
                .bind(pipeline_id)
                .bind(environment_id)
                .bind(name)
                .execute(&self.pool)
                .await?;

        Ok(Stage {
            id: result.last_insert_rowid(),
            pipeline_id,
            environment_id,
            name: name.to_string(),
        })
    }

    /// Create a task inside a stage.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_task(
        &self,
        pipeline_id: i64,
        stage_id: i64,
        instance_id: i64,
        database_id: i64,
        name: &str,
        task_type: &str,
        payload: &str,
    ) -> Result<Task> {
        let result = sqlx::query(
            r#"
            INSERT INTO tasks
                (pipeline_id, stage_id, instance_id, database_id, name, task_type, status, payload)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(pipeline_id)
        .bind(stage_id)
        .bind(instance_id)
        .bind(database_id)
        .bind(name)
        .bind(task_type)
        .bind(TASK_STATUS_PENDING_APPROVAL)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(Task {
            id: result.last_insert_rowid(),
            pipeline_id,
            stage_id,
            instance_id,
            database_id,
            name: name.to_string(),
            task_type: task_type.to_string(),
            status: TASK_STATUS_PENDING_APPROVAL.to_string(),
            payload: payload.to_string(),
        })
    }

    /// Create a pending task run for a task.
    pub async fn create_pending_task_run(&self, task_id: i64, name: &str) -> Result<TaskRun> {
        let result = sqlx::query("INSERT INTO task_runs (task_id, name, status) VALUES (?, ?, ?)")
            .bind(task_id)
            .bind(name)
            .bind(TASK_RUN_STATUS_PENDING)
            .execute(&self.pool)
            .await?;

        Ok(TaskRun {
            id: result.last_insert_rowid(),
            task_id,
            name: name.to_string(),
            status: TASK_RUN_STATUS_PENDING.to_string(),
        })
    }

    /// Get a task by id.
    pub async fn get_task(&self, id: i64) -> Result<Task> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("task {id}")))?;

        Ok(Task {
            id: row.get("id"),
            pipeline_id: row.get("pipeline_id"),
            stage_id: row.get("stage_id"),
            instance_id: row.get("instance_id"),
            database_id: row.get("database_id"),
            name: row.get("name"),
            task_type: row.get("task_type"),
            status: row.get("status"),
            payload: row.get("payload"),
        })
    }

    /// List task runs for a task.
    pub async fn list_task_runs(&self, task_id: i64) -> Result<Vec<TaskRun>> {
        let rows = sqlx::query("SELECT * FROM task_runs WHERE task_id = ? ORDER BY id")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| TaskRun {
                id: row.get("id"),
                task_id: row.get("task_id"),
                name: row.get("name"),
                status: row.get("status"),
            })
            .collect())
    }

    /// Count tasks of a given type (used by tests and status surfaces).
    pub async fn count_tasks(&self, task_type: &str) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) as total FROM tasks WHERE task_type = ?")
            .bind(task_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("total") as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[tokio::test]
    async fn test_job_chain_creation() {
        let db = BosunDb::open_memory().await.unwrap();
        let project = db.create_project("proj", "Proj").await.unwrap();
        let env = db.create_environment("prod", "Prod").await.unwrap();
        let instance = db
            .create_instance(&NewInstance {
                resource_id: "mysql-1".to_string(),
                title: "MySQL 1".to_string(),
                engine: Engine::Mysql,
                host: "127.0.0.1".to_string(),
                port: 3306,
                username: "root".to_string(),
                password: None,
            })
            .await
            .unwrap();
        let database = db.create_database(instance, project, env, "orders").await.unwrap();

        let pipeline = db.create_pipeline(project, "backup-x").await.unwrap();
        let stage = db.create_stage(pipeline.id, env, "backup-x").await.unwrap();
        let payload = serde_json::to_string(&BackupTaskPayload { backup_id: 7 }).unwrap();
        let task = db
            .create_task(
                pipeline.id,
                stage.id,
                instance,
                database,
                "backup-x",
                TASK_DATABASE_BACKUP,
                &payload,
            )
            .await
            .unwrap();
        let run = db.create_pending_task_run(task.id, "backup-x 1700000000").await.unwrap();

        assert_eq!(task.status, TASK_STATUS_PENDING_APPROVAL);
        assert_eq!(run.status, TASK_RUN_STATUS_PENDING);

        let fetched = db.get_task(task.id).await.unwrap();
        let parsed: BackupTaskPayload = serde_json::from_str(&fetched.payload).unwrap();
        assert_eq!(parsed.backup_id, 7);
        assert_eq!(db.list_task_runs(task.id).await.unwrap().len(), 1);
        assert_eq!(db.count_tasks(TASK_DATABASE_BACKUP).await.unwrap(), 1);
    }
}
