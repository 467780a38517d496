// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn missing_bookmark_is_empty() {
    let dir = tempdir().unwrap();
    let map = load(&dir.path().join("absent.xml")).unwrap();
    assert!(map.is_empty());
}

#[test]
fn rewrite_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ok.xml");

    let entries = vec![
        ("a.txt".to_string(), "20240519100000".to_string()),
        ("b.txt".to_string(), "20240519110000".to_string()),
    ];
    rewrite(&path, &entries).unwrap();

    let map = load(&path).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["a.txt"], "20240519100000");
    assert_eq!(map["b.txt"], "20240519110000");
}

#[test]
fn append_extends_the_kept_set() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ok.xml");

    rewrite(&path, &[("kept.txt".to_string(), "1".to_string())]).unwrap();
    append(&path, "new.txt", "2").unwrap();

    let map = load(&path).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["new.txt"], "2");
}

#[test]
fn append_creates_the_file_on_first_transfer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fresh.xml");
    append(&path, "first.txt", "20240519100000").unwrap();
    assert_eq!(load(&path).unwrap().len(), 1);
}

#[test]
fn rewrite_replaces_previous_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ok.xml");

    rewrite(&path, &[("old.txt".to_string(), "1".to_string())]).unwrap();
    rewrite(&path, &[]).unwrap();
    assert!(load(&path).unwrap().is_empty());
}

#[test]
fn malformed_lines_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ok.xml");
    std::fs::write(
        &path,
        "garbage line\n<filename>good.txt</filename><mtime>1</mtime>\n",
    )
    .unwrap();
    let map = load(&path).unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key("good.txt"));
}
