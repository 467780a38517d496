// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory scanning and atomic file placement.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::fmatch::NameMatcher;
use crate::timefmt;

/// Cap on entries returned by one scan, matching the daemons' per-pass
/// batch size. Anything beyond the cap is picked up on the next pass.
pub const SCAN_LIMIT: usize = 10_000;

/// One file found by [`scan_dir`].
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Bare filename (transfers and ingest dispatch key off this).
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    pub size: u64,
    /// Modification time in compact `yyyymmddhh24miss` form.
    pub mtime: String,
}

/// Enumerate files under `root` whose bare name matches `matcher`.
///
/// `recurse` descends into subdirectories; `sort_by_name` orders entries
/// lexicographically by filename so temporal file naming is preserved.
pub fn scan_dir(
    root: &Path,
    matcher: &NameMatcher,
    recurse: bool,
    sort_by_name: bool,
) -> io::Result<Vec<FileEntry>> {
    // A missing root is a configuration problem, not an empty directory.
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("not a directory: {}", root.display()),
        ));
    }

    let depth = if recurse { usize::MAX } else { 1 };
    let mut entries = Vec::new();

    for item in WalkDir::new(root).min_depth(1).max_depth(depth) {
        let item = item.map_err(io::Error::other)?;
        if !item.file_type().is_file() {
            continue;
        }
        let name = item.file_name().to_string_lossy().to_string();
        if !matcher.matches(&name) {
            continue;
        }
        let meta = item.metadata().map_err(io::Error::other)?;
        let mtime = meta
            .modified()
            .map(timefmt::compact_from_system)
            .unwrap_or_default();
        entries.push(FileEntry {
            name,
            path: item.into_path(),
            size: meta.len(),
            mtime,
        });
        if entries.len() >= SCAN_LIMIT {
            break;
        }
    }

    if sort_by_name {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(entries)
}

/// Temp-file path used while a file is being produced.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Write `bytes` to `path` atomically: temp name first, rename on success.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

/// Set a file's mtime from a compact timestamp string.
pub fn set_mtime_compact(path: &Path, compact: &str) -> io::Result<()> {
    let Some(when) = timefmt::parse_compact(compact) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("bad mtime: {compact}"),
        ));
    };
    let ft = filetime::FileTime::from_unix_time(when.timestamp(), 0);
    filetime::set_file_mtime(path, ft)
}

#[cfg(test)]
#[path = "fsutil_tests.rs"]
mod tests;
