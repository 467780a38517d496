// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Datelike, Local, Timelike};

#[test]
fn compact_now_is_fourteen_digits() {
    let now = compact_now();
    assert_eq!(now.len(), 14);
    assert!(now.chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn compact_round_trips() {
    let stamp = "20240519162835";
    let parsed = parse_compact(stamp).unwrap();
    assert_eq!(parsed.year(), 2024);
    assert_eq!(parsed.month(), 5);
    assert_eq!(parsed.day(), 19);
    assert_eq!(parsed.hour(), 16);
    assert_eq!(parsed.format(COMPACT).to_string(), stamp);
}

#[test]
fn compact_to_iso_converts() {
    assert_eq!(
        compact_to_iso("20240519162835").as_deref(),
        Some("2024-05-19 16:28:35")
    );
    assert_eq!(compact_to_iso("garbage"), None);
    assert_eq!(compact_to_iso(""), None);
}

#[test]
fn offsets_order_as_strings() {
    let past = compact_offset(-86_400);
    let now = compact_now();
    assert!(past < now);
}

#[test]
fn hour_gate() {
    assert!(in_start_hours(""));
    assert!(in_start_hours("  "));

    let hour = Local::now().format("%H").to_string();
    assert!(in_start_hours(&format!("00,{hour},23")));

    // A gate that cannot contain the current hour.
    assert!(!in_start_hours("xx"));
}
