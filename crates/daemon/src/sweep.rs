// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File janitor: delete or compress files older than an age cutoff.
//!
//! Runs under the supervisor on a period; each invocation makes one pass
//! over the tree. Age is given in days and may be fractional. Compression
//! keeps the file next to the original as `<name>.gz` and removes the
//! original; already-compressed files are skipped.

use std::fs::File;
use std::io;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;
use tracing::{info, warn};

use dcx_core::fmatch::{MatchError, NameMatcher};
use dcx_core::fsutil::scan_dir;
use dcx_core::timefmt;

use crate::heartbeat::Heartbeat;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Match(#[from] MatchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    Delete,
    Compress,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub compressed: usize,
    pub failed: usize,
}

/// One janitor pass over `root`.
///
/// Files whose bare name matches any comma-separated glob in
/// `patterns_csv` and whose mtime is older than `age_days` ago are
/// deleted or compressed per `mode`. A heartbeat is stamped between
/// compressions (large files can be slow).
pub fn sweep(
    root: &Path,
    patterns_csv: &str,
    age_days: f64,
    mode: SweepMode,
    heartbeat: Option<&Heartbeat>,
) -> Result<SweepReport, SweepError> {
    let matcher = NameMatcher::new(patterns_csv)?;
    let gz = NameMatcher::new("*.gz")?;
    let cutoff = timefmt::compact_offset(-((age_days * 86_400.0) as i64));

    let mut report = SweepReport::default();

    for entry in scan_dir(root, &matcher, true, false)? {
        if entry.mtime >= cutoff {
            continue;
        }
        match mode {
            SweepMode::Delete => match std::fs::remove_file(&entry.path) {
                Ok(()) => {
                    info!(path = %entry.path.display(), "removed");
                    report.removed += 1;
                }
                Err(e) => {
                    warn!(path = %entry.path.display(), "remove failed: {e}");
                    report.failed += 1;
                }
            },
            SweepMode::Compress => {
                if gz.matches(&entry.name) {
                    continue;
                }
                match compress_one(&entry.path) {
                    Ok(()) => {
                        info!(path = %entry.path.display(), "compressed");
                        report.compressed += 1;
                    }
                    Err(e) => {
                        warn!(path = %entry.path.display(), "compress failed: {e}");
                        report.failed += 1;
                    }
                }
                if let Some(hb) = heartbeat {
                    hb.beat();
                }
            }
        }
    }

    Ok(report)
}

/// Gzip `path` to `path.gz` and remove the original.
fn compress_one(path: &Path) -> io::Result<()> {
    let mut gz_os = path.as_os_str().to_os_string();
    gz_os.push(".gz");
    let gz_path = std::path::PathBuf::from(gz_os);

    let mut input = File::open(path)?;
    let output = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    std::fs::remove_file(path)
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
