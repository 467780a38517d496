// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-delimited XML record codec.
//!
//! A record is a run of `<col>value</col>` segments closed by the
//! `<endl/>` marker. Files produced by the miner wrap records in a
//! `<data>` … `</data>` envelope; the reader tolerates the envelope and
//! any unknown tags because field extraction is name-driven.

use std::io::{self, BufRead};

use crate::config;

/// Record terminator written after every record line.
pub const RECORD_END: &str = "<endl/>";

/// Streams records out of any buffered reader, splitting on [`RECORD_END`].
///
/// Bytes after the final terminator (the `</data>` envelope line) are
/// discarded, matching the behavior of reading with a custom line
/// terminator.
pub struct RecordReader<R> {
    inner: R,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next record, or `None` at end of input.
    pub fn next_record(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        loop {
            let n = self.inner.read_line(&mut buf)?;
            if n == 0 {
                // Leftover without a terminator is the closing envelope.
                return Ok(None);
            }
            if let Some(pos) = buf.find(RECORD_END) {
                buf.truncate(pos);
                return Ok(Some(buf));
            }
        }
    }
}

/// Extract the value of column `col` from a record, empty when absent.
pub fn field(record: &str, col: &str) -> String {
    config::tag_str(record, col).unwrap_or_default()
}

/// Keep only digits, optionally with sign and decimal point.
///
/// Date values keep digits alone, so any `yyyymmddhh24miss` rendering
/// with arbitrary separators collapses to the canonical 14 digits.
/// Number values keep sign and point as well.
pub fn pick_number(src: &str, keep_sign: bool, keep_dot: bool) -> String {
    src.chars()
        .filter(|c| {
            c.is_ascii_digit()
                || (keep_sign && (*c == '+' || *c == '-'))
                || (keep_dot && *c == '.')
        })
        .collect()
}

/// Keep digits only.
pub fn pick_digits(src: &str) -> String {
    pick_number(src, false, false)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
