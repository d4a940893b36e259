//! Log sink set-up
//!
//! One append-only file, opened once and held for the life of the process.
//! The appender writes straight to the file on every event, so there is no
//! background worker to flush on exit. Lines look like:
//!
//! ```text
//! 2024-05-01T12:00:00.123456Z  INFO Successfully updated record example.com to IP 1.2.3.4 (was 9.9.9.9)
//! ```

use anyhow::{Context, Result, anyhow};
use dns_updater_core::LogConfig;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Build the subscriber described by `config` without installing it
pub fn build_subscriber(config: &LogConfig) -> Result<impl Subscriber + Send + Sync + 'static> {
    let level: LevelFilter = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let file_name = config
        .path
        .file_name()
        .ok_or_else(|| anyhow!("Log file path must name a file: {}", config.path.display()))?
        .to_string_lossy()
        .into_owned();

    let directory = log_directory(&config.path);

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(&directory)
        .with_context(|| format!("Failed to open log file {}", config.path.display()))?;

    let file_layer = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_target(false);

    let console_layer = config
        .console
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    Ok(tracing_subscriber::registry()
        .with(level)
        .with(file_layer)
        .with(console_layer))
}

/// Install the process-wide subscriber
pub fn init(config: &LogConfig) -> Result<()> {
    let subscriber = build_subscriber(config)?;
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn log_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
