//! Log sink wiring for the binary.
//!
//! Library modules only emit `tracing` events. This module installs the
//! subscriber that writes them to a log file, with warnings and errors also
//! echoed to the terminal.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, util::TryInitError};

/// Environment variable holding the file log filter, e.g. `debug` or
/// `tidyplan::scanner=trace`.
pub const LOG_FILTER_ENV: &str = "TIDYPLAN_LOG";

const LOG_FILE_NAME: &str = "tidyplan.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Could not create log directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("A global logger is already installed: {0}")]
    AlreadyInstalled(#[from] TryInitError),
}

/// `%Y-%m-%d %H:%M:%S` in local time.
struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// `<data_local_dir>/tidyplan/tidyplan.log`, or `tidyplan.log` in the
/// working directory when the platform has no data directory.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("tidyplan").join(LOG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}

/// Installs the global subscriber. Keep the returned guard alive for the
/// whole process, otherwise buffered file lines are lost.
pub fn init_logging(log_file: &Path) -> Result<WorkerGuard, LoggingError> {
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&directory).map_err(|source| LoggingError::Io {
        path: directory.clone(),
        source,
    })?;

    let file_name = log_file
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| LOG_FILE_NAME.into());
    let file_appender = tracing_appender::rolling::never(&directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = env::var(LOG_FILTER_ENV)
        .ok()
        .and_then(|filter| EnvFilter::try_new(filter).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .with_timer(LocalTimestamp)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .without_time()
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .try_init()?;

    info!("Logging to {}", log_file.display());
    Ok(guard)
}
