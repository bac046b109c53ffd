//! Relative artifact layout shared by both storage backends.
//!
//! Backups:       `backup/db/{database_id}/{name}.sql`
//! Binlog files:  `backup/binlog/{instance_id}/{file}`
//!
//! Keys are relative to the backend root (the data directory for local
//! storage, the bucket for the object store).

use std::path::{Path, PathBuf};

/// Directory holding a database's backup artifacts.
pub fn backup_relative_dir(database_id: i64) -> String {
    format!("backup/db/{database_id}")
}

/// Key of one backup artifact.
pub fn backup_relative_file_path(database_id: i64, name: &str) -> String {
    format!("{}/{}.sql", backup_relative_dir(database_id), name)
}

/// Directory holding an instance's downloaded binlog files.
pub fn binlog_relative_dir(instance_id: i64) -> String {
    format!("backup/binlog/{instance_id}")
}

/// Absolute binlog directory for an instance under the local data dir.
pub fn binlog_abs_dir(data_dir: &Path, instance_id: i64) -> PathBuf {
    data_dir.join(binlog_relative_dir(instance_id))
}
