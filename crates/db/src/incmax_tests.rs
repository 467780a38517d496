// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn table_store_wins_over_file() {
    let store = IncStore::from_config("/data/book.db", "/data/book.txt").unwrap();
    assert!(matches!(store, IncStore::Table { .. }));

    let store = IncStore::from_config("", "/data/book.txt").unwrap();
    assert!(matches!(store, IncStore::File(_)));

    assert!(IncStore::from_config("", "").is_none());
    assert!(IncStore::from_config("  ", " ").is_none());
}

#[test]
fn file_store_round_trips_and_defaults_to_zero() {
    let dir = tempdir().unwrap();
    let store = IncStore::File(dir.path().join("inc.txt"));

    assert_eq!(store.read("miner_a").unwrap(), 0);
    store.write("miner_a", 2500).unwrap();
    assert_eq!(store.read("miner_a").unwrap(), 2500);

    // Overwritten, not appended.
    store.write("miner_a", 3000).unwrap();
    assert_eq!(store.read("miner_a").unwrap(), 3000);
}

#[test]
fn garbage_file_reads_as_zero() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inc.txt");
    std::fs::write(&path, "not a number\n").unwrap();
    assert_eq!(IncStore::File(path).read("x").unwrap(), 0);
}

#[test]
fn table_store_auto_creates_and_upserts() {
    let dir = tempdir().unwrap();
    let connstr = dir.path().join("book.db").display().to_string();
    let store = IncStore::Table {
        connstr: connstr.clone(),
    };

    // First read: no table yet.
    assert_eq!(store.read("miner_a").unwrap(), 0);

    store.write("miner_a", 1000).unwrap();
    store.write("miner_b", 7).unwrap();
    assert_eq!(store.read("miner_a").unwrap(), 1000);
    assert_eq!(store.read("miner_b").unwrap(), 7);

    // Per-pname upsert.
    store.write("miner_a", 1500).unwrap();
    assert_eq!(store.read("miner_a").unwrap(), 1500);
    assert_eq!(store.read("miner_b").unwrap(), 7);
}
