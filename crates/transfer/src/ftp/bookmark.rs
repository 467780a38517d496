// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transfer bookmark: files already moved, one record per line,
//! `<filename>…</filename><mtime>…</mtime>`.
//!
//! At the start of an incremental run the bookmark is rewritten (atomic
//! replace) to exactly the kept set; each successful transfer appends one
//! record. A crash therefore costs at most one re-transfer, which is safe
//! because transfers are idempotent.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use dcx_core::config::tag_str;
use dcx_core::fsutil;

/// Load the bookmark into a name → mtime map. A missing file is an empty
/// bookmark (first run).
pub fn load(path: &Path) -> io::Result<BTreeMap<String, String>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e),
    };

    let mut map = BTreeMap::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let Some(filename) = tag_str(&line, "filename") else {
            continue;
        };
        let mtime = tag_str(&line, "mtime").unwrap_or_default();
        map.insert(filename, mtime);
    }
    Ok(map)
}

/// Replace the bookmark with exactly `entries` (atomic rewrite).
pub fn rewrite(path: &Path, entries: &[(String, String)]) -> io::Result<()> {
    let mut out = String::new();
    for (filename, mtime) in entries {
        out.push_str(&format!(
            "<filename>{filename}</filename><mtime>{mtime}</mtime>\n"
        ));
    }
    fsutil::atomic_write(path, out.as_bytes())
}

/// Append one successfully-transferred file.
pub fn append(path: &Path, filename: &str, mtime: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "<filename>{filename}</filename><mtime>{mtime}</mtime>"
    )
}

#[cfg(test)]
#[path = "bookmark_tests.rs"]
mod tests;
