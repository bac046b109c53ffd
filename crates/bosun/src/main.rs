//! Bosun
//!
//! Automatic backup lifecycle manager: schedules due backups across the
//! fleet, coordinates binlog downloads, and purges expired backup data.
//!
//! Usage:
//!     bosun --database /path/to/bosun.sqlite3 --data-dir /var/lib/bosun

use anyhow::{Context, Result};
use bosun_db::{BosunDb, StorageBackend};
use bosun_driver::MysqlDriverFactory;
use bosun_runner::{BackupRunner, RunnerConfig};
use bosun_storage::{ArtifactStore, LocalDisk, RemoteStore};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "bosun", about = "Automatic backup lifecycle manager")]
struct Args {
    /// Metadata database path
    #[arg(long, env = "BOSUN_DATABASE")]
    database: Option<PathBuf>,

    /// Root directory for local backup and binlog artifacts
    #[arg(long, env = "BOSUN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Scheduler tick interval in seconds
    #[arg(long, env = "BOSUN_TICK_INTERVAL_SECS", default_value_t = 600)]
    tick_interval_secs: u64,

    /// Storage backend for new backups
    #[arg(long, value_enum, env = "BOSUN_STORAGE_BACKEND", default_value_t = BackendArg::Local)]
    storage_backend: BackendArg,

    /// S3 bucket (required with --storage-backend s3; credentials from env)
    #[arg(long, env = "BOSUN_S3_BUCKET")]
    s3_bucket: Option<String>,

    /// Verbose console logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Local,
    S3,
}

impl std::fmt::Display for BackendArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::S3 => write!(f, "s3"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    bosun_logging::init_logging("bosun", args.verbose)?;

    let home = bosun_logging::bosun_home();
    let database = args.database.unwrap_or_else(|| home.join("bosun.sqlite3"));
    let data_dir = args.data_dir.unwrap_or_else(|| home.join("data"));

    tracing::info!("Starting Bosun backup runner");
    tracing::info!("  Database: {}", database.display());
    tracing::info!("  Data dir: {}", data_dir.display());
    tracing::info!("  Interval: {}s", args.tick_interval_secs);

    let db = BosunDb::open(&database).await?;

    let local: Arc<dyn ArtifactStore> = Arc::new(LocalDisk::new(&data_dir));
    let (backend, remote) = match args.storage_backend {
        BackendArg::Local => (StorageBackend::Local, None),
        BackendArg::S3 => {
            let bucket = args
                .s3_bucket
                .context("--s3-bucket is required with --storage-backend s3")?;
            let store: Arc<dyn ArtifactStore> = Arc::new(RemoteStore::s3(&bucket)?);
            (StorageBackend::ObjectStore, Some(store))
        }
    };

    let runner = BackupRunner::new(
        db,
        Arc::new(MysqlDriverFactory::new()),
        local,
        remote,
        RunnerConfig {
            tick_interval: Duration::from_secs(args.tick_interval_secs),
            data_dir,
            backend,
        },
    )?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received ctrl-c; shutting down");
            shutdown.cancel();
        }
    });

    runner.run(cancel).await;

    Ok(())
}
