// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-daemon file logging.
//!
//! Every daemon writes to the logfile named by its first argument. The
//! subscriber is non-blocking; startup failures are additionally written
//! synchronously so they are visible even when the process exits before
//! the writer flushes.

use std::io::Write;
use std::path::Path;

use thiserror::Error;

/// Handle keeping the background log writer alive.
pub type LogGuard = tracing_appender::non_blocking::WorkerGuard;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("cannot open log file {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("bad log path: {0}")]
    BadPath(String),
}

/// Install a file-backed tracing subscriber for this process.
///
/// The returned guard must be held for the lifetime of the process;
/// dropping it flushes and stops the background writer.
pub fn init(log_path: &Path) -> Result<LogGuard, LogError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| LogError::Open {
                path: log_path.display().to_string(),
                source,
            })?;
        }
    }

    let dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = log_path
        .file_name()
        .ok_or_else(|| LogError::BadPath(log_path.display().to_string()))?;

    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}

/// Write a startup error synchronously to the logfile.
pub fn write_startup_error(log_path: &Path, error: &dyn std::fmt::Display) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR startup failed: {error}");
}
