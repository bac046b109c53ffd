//! Shared logging utilities for Bosun binaries.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "bosun=info,bosun_runner=info,bosun_db=info,bosun_driver=info";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Initialize tracing with a rolling file writer and stderr output.
///
/// `verbose` widens the stderr layer to the file filter; otherwise stderr
/// stays at warn and the full stream goes to the log file.
pub fn init_logging(app_name: &str, verbose: bool) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_writer = RollingWriter::open(log_dir, app_name)
        .context("Failed to initialize rolling log writer")?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    Ok(())
}

/// Get the Bosun home directory: ~/.bosun
pub fn bosun_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("BOSUN_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .expect("Could not determine home directory")
        .join(".bosun")
}

/// Get the logs directory: ~/.bosun/logs
pub fn logs_dir() -> PathBuf {
    bosun_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Size-capped log writer keeping `MAX_LOG_FILES` rotations.
///
/// Cloneable; all clones share one file handle behind a mutex, which is what
/// `MakeWriter` needs.
#[derive(Clone)]
struct RollingWriter {
    inner: Arc<Mutex<RollingState>>,
}

struct RollingState {
    dir: PathBuf,
    base_name: String,
    file: File,
    current_size: u64,
}

impl RollingWriter {
    fn open(dir: PathBuf, app_name: &str) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        let base_name = sanitize_name(app_name);
        let (file, current_size) = open_log_file(&dir, &base_name)
            .with_context(|| format!("Failed to open log file for {app_name}"))?;
        let writer = Self {
            inner: Arc::new(Mutex::new(RollingState {
                dir,
                base_name,
                file,
                current_size,
            })),
        };
        Ok(writer)
    }
}

impl RollingState {
    fn current_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.base_name, index))
    }

    /// Shift `name.log` -> `name.log.1` -> ... and reopen a fresh file.
    fn rotate(&mut self) -> io::Result<()> {
        let _ = self.file.flush();

        let oldest = self.rotated_path(MAX_LOG_FILES - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..MAX_LOG_FILES - 1).rev() {
            let src = self.rotated_path(index);
            if src.exists() {
                fs::rename(&src, self.rotated_path(index + 1))?;
            }
        }
        let current = self.current_path();
        if current.exists() {
            fs::rename(current, self.rotated_path(1))?;
        }

        let (file, current_size) = open_log_file(&self.dir, &self.base_name)?;
        self.file = file;
        self.current_size = current_size;
        Ok(())
    }
}

fn open_log_file(dir: &std::path::Path, base_name: &str) -> io::Result<(File, u64)> {
    let path = dir.join(format!("{base_name}.log"));
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        if state.current_size + buf.len() as u64 > MAX_LOG_FILE_SIZE {
            state.rotate()?;
        }
        let bytes = state.file.write(buf)?;
        state.current_size += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        state.file.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("bosun"), "bosun");
        assert_eq!(sanitize_name("bosun runner/1"), "bosun_runner_1");
    }

    #[test]
    fn test_rolling_writer_rotates() {
        let tmp = TempDir::new().unwrap();
        let mut writer = RollingWriter::open(tmp.path().to_path_buf(), "test").unwrap();

        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();
        assert!(tmp.path().join("test.log").exists());

        {
            let mut state = writer.inner.lock().unwrap();
            state.rotate().unwrap();
        }
        writer.write_all(b"world\n").unwrap();
        writer.flush().unwrap();
        assert!(tmp.path().join("test.log.1").exists());
    }
}
