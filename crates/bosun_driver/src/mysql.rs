//! MySQL / MariaDB driver.
//!
//! Admin connectivity goes through sqlx; the binlog bytes themselves move via
//! the `mysqlbinlog` client binary in `--read-from-remote-server --raw` mode,
//! which speaks the replication protocol so we don't have to.

use crate::{AdminDriver, DriverError, DriverFactory, Result};
use async_trait::async_trait;
use bosun_db::Instance;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, MySqlConnection, Row};
use std::collections::HashSet;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Driver factory for binlog-capable engines.
#[derive(Debug, Default, Clone)]
pub struct MysqlDriverFactory;

impl MysqlDriverFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DriverFactory for MysqlDriverFactory {
    async fn admin_driver(&self, instance: &Instance) -> Result<Box<dyn AdminDriver>> {
        if !instance.engine.supports_binlog() {
            return Err(DriverError::Unsupported(instance.engine.to_string()));
        }

        let mut options = MySqlConnectOptions::new()
            .host(&instance.host)
            .port(instance.port)
            .username(&instance.username);
        if let Some(ref password) = instance.password {
            options = options.password(password);
        }

        let conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|err| classify_connect_error(&instance.resource_id, err))?;

        Ok(Box::new(MysqlAdminDriver {
            conn,
            host: instance.host.clone(),
            port: instance.port,
            username: instance.username.clone(),
            password: instance.password.clone(),
            resource_id: instance.resource_id.clone(),
        }))
    }
}

/// Dial-level failures are the expected "instance unreachable" case; anything
/// the server itself said (auth, permissions) is not.
fn classify_connect_error(resource_id: &str, err: sqlx::Error) -> DriverError {
    match err {
        sqlx::Error::Io(io) => {
            DriverError::ConnectionFailure(format!("{resource_id}: {io}"))
        }
        sqlx::Error::Tls(tls) => {
            DriverError::ConnectionFailure(format!("{resource_id}: {tls}"))
        }
        sqlx::Error::PoolTimedOut => {
            DriverError::ConnectionFailure(format!("{resource_id}: connection timed out"))
        }
        other => DriverError::Internal(format!("{resource_id}: {other}")),
    }
}

struct MysqlAdminDriver {
    conn: MySqlConnection,
    host: String,
    port: u16,
    username: String,
    password: Option<String>,
    resource_id: String,
}

#[async_trait]
impl AdminDriver for MysqlAdminDriver {
    async fn download_binlog_files(&mut self, dest_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let rows = sqlx::query("SHOW BINARY LOGS")
            .fetch_all(&mut self.conn)
            .await
            .map_err(|err| DriverError::Internal(format!("{}: {err}", self.resource_id)))?;
        let server_files: Vec<String> = rows
            .iter()
            .map(|row| row.get::<String, _>("Log_name"))
            .collect();

        let mut local_files = HashSet::new();
        let mut read_dir = tokio::fs::read_dir(dest_dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            local_files.insert(entry.file_name().to_string_lossy().into_owned());
        }

        let to_fetch = files_to_fetch(&server_files, &local_files);
        if to_fetch.is_empty() {
            debug!(instance = %self.resource_id, "No new binlog files to download");
            return Ok(());
        }

        info!(
            instance = %self.resource_id,
            count = to_fetch.len(),
            "Downloading binlog files"
        );
        for file in to_fetch {
            self.fetch_one(dest_dir, file).await?;
        }

        Ok(())
    }

    async fn close(self: Box<Self>) {
        if let Err(err) = self.conn.close().await {
            warn!(instance = %self.resource_id, error = %err, "Failed to close admin connection");
        }
    }
}

impl MysqlAdminDriver {
    async fn fetch_one(&self, dest_dir: &Path, file: &str) -> Result<()> {
        let mut result_dir = dest_dir.as_os_str().to_os_string();
        result_dir.push("/");

        let mut command = Command::new("mysqlbinlog");
        command
            .arg("--read-from-remote-server")
            .arg("--raw")
            .arg(format!("--host={}", self.host))
            .arg(format!("--port={}", self.port))
            .arg(format!("--user={}", self.username))
            .arg("--result-file")
            .arg(&result_dir)
            .arg(file);
        if let Some(ref password) = self.password {
            // Via the environment so the secret never shows up in `ps`.
            command.env("MYSQL_PWD", password);
        }

        let output = command.output().await?;
        if !output.status.success() {
            // Drop the partial file so the next pass re-fetches it whole.
            let partial = dest_dir.join(file);
            if let Err(err) = tokio::fs::remove_file(&partial).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %partial.display(), error = %err, "Failed to remove partial binlog file");
                }
            }
            return Err(DriverError::Internal(format!(
                "{}: mysqlbinlog failed for {}: {}",
                self.resource_id,
                file,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!(instance = %self.resource_id, file, "Downloaded binlog file");
        Ok(())
    }
}

/// Server binlog files that still need downloading: everything except the
/// last one (the server is still writing it) and files already on disk.
fn files_to_fetch<'a>(server_files: &'a [String], local_files: &HashSet<String>) -> Vec<&'a str> {
    let Some((_active, completed)) = server_files.split_last() else {
        return Vec::new();
    };
    completed
        .iter()
        .filter(|file| !local_files.contains(*file))
        .map(String::as_str)
        .collect()
}
