// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compact `yyyymmddhh24miss` timestamp handling.
//!
//! File mtimes, transfer announcements, bookmark entries, and the date
//! columns of ingested records all carry this 14-digit form. Comparisons
//! are plain string comparisons, which order correctly by construction.

use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// strftime rendering of the compact form.
pub const COMPACT: &str = "%Y%m%d%H%M%S";

/// Current local time in compact form.
pub fn compact_now() -> String {
    Local::now().format(COMPACT).to_string()
}

/// Local time `offset_sec` seconds from now, compact form.
pub fn compact_offset(offset_sec: i64) -> String {
    let t = Local::now() + chrono::Duration::seconds(offset_sec);
    t.format(COMPACT).to_string()
}

/// Render a filesystem timestamp in compact form.
pub fn compact_from_system(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format(COMPACT).to_string()
}

/// Parse the compact form into a local timestamp.
pub fn parse_compact(s: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s, COMPACT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// Convert the compact form to ISO-8601 text (`yyyy-mm-dd hh:mm:ss`).
pub fn compact_to_iso(s: &str) -> Option<String> {
    let naive = NaiveDateTime::parse_from_str(s, COMPACT).ok()?;
    Some(naive.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Current local time as ISO-8601 text.
pub fn iso_now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Hour gate: `gate` is a comma-separated list of two-digit hours during
/// which a job is allowed to run. An empty gate always passes.
pub fn in_start_hours(gate: &str) -> bool {
    if gate.trim().is_empty() {
        return true;
    }
    let hour = Local::now().format("%H").to_string();
    gate.contains(&hour)
}

#[cfg(test)]
#[path = "timefmt_tests.rs"]
mod tests;
