// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference-table synchronization.
//!
//! Mode 1 (whole-replace): delete the local slice, repopulate it from
//! the linked remote table in one transaction; fine for small dimension
//! tables. Mode 2 (batched key-driven): a second connection streams keys
//! from the remote table and the local side reconciles `maxcount` keys
//! per transaction; for tables where a global rewrite would lock too
//! much, at the cost of not observing remote deletions.
//!
//! The remote database file is attached under the schema alias carried
//! by `linktname` (`rem.T_X` attaches as `rem`).

use rusqlite::types::Value;
use tracing::info;

use dcx_core::config::{require_tag, tag_str, tag_u64, ConfigError};
use dcx_daemon::Heartbeat;

use crate::cols::{all_cols_csv, table_columns};
use crate::conn::{connect, value_to_text, DbResult};

/// Default alias when `linktname` carries no schema prefix.
const DEFAULT_LINK_ALIAS: &str = "rem";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub localconnstr: String,
    /// Schema-qualified remote table as seen from the local connection.
    pub linktname: String,
    pub localtname: String,
    /// Projection pulled from the remote side; filled from the local
    /// table's columns when empty.
    pub remotecols: String,
    /// Columns populated on the local side; filled likewise.
    pub localcols: String,
    /// Condition appended to remote queries.
    pub rwhere: String,
    /// Condition appended to the local delete (mode 1).
    pub lwhere: String,
    /// 1 = whole-replace, 2 = batched key-driven.
    pub synctype: u64,
    pub remoteconnstr: String,
    pub remotetname: String,
    pub remotekeycol: String,
    pub localkeycol: String,
    pub keylen: u64,
    pub maxcount: u64,
    pub timeout: u64,
    pub pname: String,
}

impl SyncConfig {
    pub fn parse(xml: &str) -> Result<Self, ConfigError> {
        let synctype = tag_u64(xml, "synctype").unwrap_or(0);
        if synctype != 1 && synctype != 2 {
            return Err(ConfigError::Invalid {
                tag: "synctype",
                value: tag_str(xml, "synctype").unwrap_or_default(),
            });
        }

        let cfg = Self {
            localconnstr: require_tag(xml, "localconnstr")?,
            linktname: require_tag(xml, "linktname")?,
            localtname: require_tag(xml, "localtname")?,
            remotecols: tag_str(xml, "remotecols").unwrap_or_default(),
            localcols: tag_str(xml, "localcols").unwrap_or_default(),
            rwhere: tag_str(xml, "rwhere").unwrap_or_default(),
            lwhere: tag_str(xml, "lwhere").unwrap_or_default(),
            synctype,
            remoteconnstr: require_tag(xml, "remoteconnstr")?,
            remotetname: if synctype == 2 {
                require_tag(xml, "remotetname")?
            } else {
                tag_str(xml, "remotetname").unwrap_or_default()
            },
            remotekeycol: if synctype == 2 {
                require_tag(xml, "remotekeycol")?
            } else {
                tag_str(xml, "remotekeycol").unwrap_or_default()
            },
            localkeycol: if synctype == 2 {
                require_tag(xml, "localkeycol")?
            } else {
                tag_str(xml, "localkeycol").unwrap_or_default()
            },
            keylen: tag_u64(xml, "keylen").unwrap_or(0),
            maxcount: tag_u64(xml, "maxcount").unwrap_or(0),
            timeout: tag_u64(xml, "timeout").ok_or(ConfigError::Missing("timeout"))?,
            pname: require_tag(xml, "pname")?,
        };
        if cfg.synctype == 2 && cfg.maxcount == 0 {
            return Err(ConfigError::Missing("maxcount"));
        }
        Ok(cfg)
    }

    /// Alias under which the remote database is attached.
    fn link_alias(&self) -> &str {
        match self.linktname.split_once('.') {
            Some((alias, _)) => alias,
            None => DEFAULT_LINK_ALIAS,
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub rows: usize,
}

/// One synchronization run.
pub fn run_sync(cfg: &SyncConfig, heartbeat: Option<&Heartbeat>) -> DbResult<SyncReport> {
    let conn = connect(&cfg.localconnstr)?;
    conn.execute(
        &format!("attach database ?1 as {}", cfg.link_alias()),
        [&cfg.remoteconnstr],
    )?;

    // Fall back to the local table's own column list.
    let mut remotecols = cfg.remotecols.trim().to_string();
    let mut localcols = cfg.localcols.trim().to_string();
    if remotecols.is_empty() || localcols.is_empty() {
        let cols = table_columns(&conn, &cfg.localtname)?;
        let csv = all_cols_csv(&cols);
        if remotecols.is_empty() {
            remotecols = csv.clone();
        }
        if localcols.is_empty() {
            localcols = csv;
        }
    }

    let report = if cfg.synctype == 1 {
        whole_replace(&conn, cfg, &localcols, &remotecols)?
    } else {
        batched(&conn, cfg, &localcols, &remotecols, heartbeat)?
    };

    info!(
        from = %cfg.linktname,
        to = %cfg.localtname,
        rows = report.rows,
        "sync complete"
    );
    Ok(report)
}

fn whole_replace(
    conn: &rusqlite::Connection,
    cfg: &SyncConfig,
    localcols: &str,
    remotecols: &str,
) -> DbResult<SyncReport> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        &format!("delete from {} {}", cfg.localtname, cfg.lwhere),
        [],
    )?;
    let rows = tx.execute(
        &format!(
            "insert into {}({}) select {} from {} {}",
            cfg.localtname, localcols, remotecols, cfg.linktname, cfg.rwhere
        ),
        [],
    )?;
    tx.commit()?;
    Ok(SyncReport { rows })
}

fn batched(
    conn: &rusqlite::Connection,
    cfg: &SyncConfig,
    localcols: &str,
    remotecols: &str,
    heartbeat: Option<&Heartbeat>,
) -> DbResult<SyncReport> {
    // Keys stream from their own connection while the local side works.
    let remote = connect(&cfg.remoteconnstr)?;
    let mut key_stmt = remote.prepare(&format!(
        "select {} from {} {}",
        cfg.remotekeycol, cfg.remotetname, cfg.rwhere
    ))?;
    let mut rows = key_stmt.query([])?;

    let mut report = SyncReport::default();
    let mut batch: Vec<String> = Vec::with_capacity(cfg.maxcount as usize);

    while let Some(row) = rows.next()? {
        batch.push(value_to_text(row.get::<_, Value>(0)?));
        if batch.len() == cfg.maxcount as usize {
            report.rows += flush_batch(conn, cfg, localcols, remotecols, &batch)?;
            batch.clear();
            if let Some(hb) = heartbeat {
                hb.beat();
            }
        }
    }

    if !batch.is_empty() {
        report.rows += flush_batch(conn, cfg, localcols, remotecols, &batch)?;
        if let Some(hb) = heartbeat {
            hb.beat();
        }
    }

    Ok(report)
}

/// Reconcile one key batch: delete, repopulate, commit.
fn flush_batch(
    conn: &rusqlite::Connection,
    cfg: &SyncConfig,
    localcols: &str,
    remotecols: &str,
    keys: &[String],
) -> DbResult<usize> {
    let binds = (1..=keys.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(",");

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        &format!(
            "delete from {} where {} in ({binds})",
            cfg.localtname, cfg.localkeycol
        ),
        rusqlite::params_from_iter(keys.iter()),
    )?;
    let rows = tx.execute(
        &format!(
            "insert into {}({}) select {} from {} where {} in ({binds})",
            cfg.localtname, localcols, remotecols, cfg.linktname, cfg.remotekeycol
        ),
        rusqlite::params_from_iter(keys.iter()),
    )?;
    tx.commit()?;
    Ok(rows)
}

#[cfg(test)]
#[path = "syncref_tests.rs"]
mod tests;
