// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

struct Fixture {
    _dir: tempfile::TempDir,
    local: String,
    remote: String,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let local = dir.path().join("local.db").display().to_string();
    let remote = dir.path().join("remote.db").display().to_string();

    let conn = rusqlite::Connection::open(&remote).unwrap();
    conn.execute_batch(
        "create table T_ZHOBTCODE(obtid varchar(5) primary key, cityname varchar(30));
         insert into T_ZHOBTCODE values('57001', 'changsha');
         insert into T_ZHOBTCODE values('57002', 'xiangtan');
         insert into T_ZHOBTCODE values('58001', 'nanjing');",
    )
    .unwrap();

    let conn = rusqlite::Connection::open(&local).unwrap();
    conn.execute_batch(
        "create table T_ZHOBTCODE2(obtid varchar(5) primary key, cityname varchar(30));",
    )
    .unwrap();

    Fixture {
        _dir: dir,
        local,
        remote,
    }
}

fn config(fx: &Fixture, synctype: u64) -> SyncConfig {
    SyncConfig {
        localconnstr: fx.local.clone(),
        linktname: "rem.T_ZHOBTCODE".to_string(),
        localtname: "T_ZHOBTCODE2".to_string(),
        remotecols: String::new(),
        localcols: String::new(),
        rwhere: String::new(),
        lwhere: String::new(),
        synctype,
        remoteconnstr: fx.remote.clone(),
        remotetname: "T_ZHOBTCODE".to_string(),
        remotekeycol: "obtid".to_string(),
        localkeycol: "obtid".to_string(),
        keylen: 5,
        maxcount: 2,
        timeout: 50,
        pname: "syncref_test".to_string(),
    }
}

fn local_rows(fx: &Fixture) -> Vec<(String, String)> {
    let conn = rusqlite::Connection::open(&fx.local).unwrap();
    let mut stmt = conn
        .prepare("select obtid, cityname from T_ZHOBTCODE2 order by obtid")
        .unwrap();
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

#[test]
fn whole_replace_mirrors_the_remote_slice() {
    let fx = fixture();
    let report = run_sync(&config(&fx, 1), None).unwrap();
    assert_eq!(report.rows, 3);
    assert_eq!(local_rows(&fx).len(), 3);

    // Re-running replaces, not duplicates.
    let report = run_sync(&config(&fx, 1), None).unwrap();
    assert_eq!(report.rows, 3);
    assert_eq!(local_rows(&fx).len(), 3);
}

#[test]
fn whole_replace_honors_where_clauses() {
    let fx = fixture();

    // Plant a stale local row outside the synced slice.
    let conn = rusqlite::Connection::open(&fx.local).unwrap();
    conn.execute(
        "insert into T_ZHOBTCODE2 values('99999', 'stale')",
        [],
    )
    .unwrap();
    drop(conn);

    let mut cfg = config(&fx, 1);
    cfg.rwhere = "where obtid like '57%'".to_string();
    cfg.lwhere = "where obtid like '57%'".to_string();
    run_sync(&cfg, None).unwrap();

    let rows = local_rows(&fx);
    // 57xxx replaced from remote, the out-of-slice row untouched.
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().any(|(id, _)| id == "99999"));
    assert!(rows.iter().all(|(id, _)| id != "58001"));
}

#[test]
fn batched_sync_reconciles_in_key_batches() {
    let fx = fixture();
    // maxcount=2 over 3 keys: one full batch plus a final partial.
    let report = run_sync(&config(&fx, 2), None).unwrap();
    assert_eq!(report.rows, 3);
    assert_eq!(local_rows(&fx).len(), 3);
}

#[test]
fn batched_sync_updates_changed_rows() {
    let fx = fixture();
    run_sync(&config(&fx, 2), None).unwrap();

    // Change a remote value; the key still exists, so reconciliation
    // refreshes it.
    let conn = rusqlite::Connection::open(&fx.remote).unwrap();
    conn.execute(
        "update T_ZHOBTCODE set cityname = 'CHANGSHA' where obtid = '57001'",
        [],
    )
    .unwrap();
    drop(conn);

    run_sync(&config(&fx, 2), None).unwrap();
    let rows = local_rows(&fx);
    assert!(rows
        .iter()
        .any(|(id, city)| id == "57001" && city == "CHANGSHA"));
    assert_eq!(rows.len(), 3);
}

#[test]
fn explicit_column_lists_map_between_schemas() {
    let fx = fixture();

    // A local table with different column names.
    let conn = rusqlite::Connection::open(&fx.local).unwrap();
    conn.execute_batch(
        "create table T_RENAMED(stid varchar(5) primary key, city varchar(30));",
    )
    .unwrap();
    drop(conn);

    let mut cfg = config(&fx, 1);
    cfg.localtname = "T_RENAMED".to_string();
    cfg.localcols = "stid,city".to_string();
    cfg.remotecols = "obtid,cityname".to_string();
    run_sync(&cfg, None).unwrap();

    let conn = rusqlite::Connection::open(&fx.local).unwrap();
    let n: i64 = conn
        .query_row("select count(*) from T_RENAMED", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 3);
}

#[test]
fn config_requires_key_settings_for_batched_mode() {
    let xml = "<localconnstr>/l.db</localconnstr><linktname>rem.T_X</linktname>\
        <localtname>T_Y</localtname><synctype>2</synctype>\
        <remoteconnstr>/r.db</remoteconnstr><timeout>50</timeout><pname>s</pname>";
    assert!(SyncConfig::parse(xml).is_err());

    let full = format!(
        "{xml}<remotetname>T_X</remotetname><remotekeycol>id</remotekeycol>\
         <localkeycol>id</localkeycol><maxcount>100</maxcount>"
    );
    let cfg = SyncConfig::parse(&full).unwrap();
    assert_eq!(cfg.synctype, 2);
    assert_eq!(cfg.link_alias(), "rem");

    let bad = full.replace("<synctype>2</synctype>", "<synctype>3</synctype>");
    assert!(SyncConfig::parse(&bad).is_err());
}
