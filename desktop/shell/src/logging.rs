//! Logging setup with file rotation.

use sidecar::config::LoggingSettings;

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "sidecar-shell";

/// Setup logging with console and rotating file output.
///
/// # Log Layers
/// - Console: human-readable, on stderr (stdout carries JSON events)
/// - File: daily rotation, `retention_count` files kept
pub fn setup_logging(
    data_dir: &Path,
    settings: &LoggingSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let logs_dir = logs_dir(data_dir, settings);
    std::fs::create_dir_all(&logs_dir)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .with_writer(std::io::stderr);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(settings.retention_count)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&logs_dir)?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(file_appender);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(settings)));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

pub fn logs_dir(data_dir: &Path, settings: &LoggingSettings) -> PathBuf {
    data_dir.join(&settings.directory)
}

/// Get path to current log file (for diagnostics export).
pub fn current_log_path(data_dir: &Path, settings: &LoggingSettings) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    logs_dir(data_dir, settings).join(format!("{LOG_FILE_PREFIX}.{today}.log"))
}

pub(crate) fn default_directives(settings: &LoggingSettings) -> String {
    format!("{level},sidecar={level},sidecar_shell={level}", level = settings.level)
}
