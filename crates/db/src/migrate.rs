// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aged-row migration between tables of the same shape.
//!
//! Rows matching the condition move from the source table to the history
//! table in key batches: insert-select then delete, one transaction per
//! batch, so no single huge transaction builds up. `rowid` is the
//! recommended key column.

use rusqlite::types::Value;
use tracing::info;

use dcx_core::config::{require_tag, tag_str, tag_u64, ConfigError};
use dcx_daemon::Heartbeat;

use crate::cols::{all_cols_csv, table_columns};
use crate::conn::{connect, value_to_text, DbResult};

#[derive(Debug, Clone)]
pub struct MigrateConfig {
    pub connstr: String,
    pub tname: String,
    pub totname: String,
    /// Unique key column used to address batches; `rowid` works best.
    pub keycol: String,
    /// The `where …` condition selecting rows to migrate.
    pub where_clause: String,
    pub maxcount: u64,
    pub starttime: String,
    pub timeout: u64,
    pub pname: String,
}

impl MigrateConfig {
    pub fn parse(xml: &str) -> Result<Self, ConfigError> {
        let cfg = Self {
            connstr: require_tag(xml, "connstr")?,
            tname: require_tag(xml, "tname")?,
            totname: require_tag(xml, "totname")?,
            keycol: require_tag(xml, "keycol")?,
            where_clause: require_tag(xml, "where")?,
            maxcount: tag_u64(xml, "maxcount").unwrap_or(0),
            starttime: tag_str(xml, "starttime").unwrap_or_default(),
            timeout: tag_u64(xml, "timeout").ok_or(ConfigError::Missing("timeout"))?,
            pname: require_tag(xml, "pname")?,
        };
        if cfg.maxcount == 0 {
            return Err(ConfigError::Missing("maxcount"));
        }
        Ok(cfg)
    }
}

#[derive(Debug, Default)]
pub struct MigrateReport {
    pub rows: usize,
}

/// One migration run.
pub fn run_migrate(cfg: &MigrateConfig, heartbeat: Option<&Heartbeat>) -> DbResult<MigrateReport> {
    let conn = connect(&cfg.connstr)?;

    let cols = table_columns(&conn, &cfg.tname)?;
    let cols_csv = all_cols_csv(&cols);

    // Collect the matching keys up front; the batches mutate the table
    // the selection would otherwise be streaming from.
    let keys: Vec<String> = {
        let mut stmt = conn.prepare(&format!(
            "select {} from {} {}",
            cfg.keycol, cfg.tname, cfg.where_clause
        ))?;
        let mut rows = stmt.query([])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(value_to_text(row.get::<_, Value>(0)?));
        }
        keys
    };

    let mut report = MigrateReport::default();
    for batch in keys.chunks(cfg.maxcount as usize) {
        let binds = (1..=batch.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(",");

        let tx = conn.unchecked_transaction()?;
        let rows = tx.execute(
            &format!(
                "insert into {}({cols_csv}) select {cols_csv} from {} where {} in ({binds})",
                cfg.totname, cfg.tname, cfg.keycol
            ),
            rusqlite::params_from_iter(batch.iter()),
        )?;
        tx.execute(
            &format!(
                "delete from {} where {} in ({binds})",
                cfg.tname, cfg.keycol
            ),
            rusqlite::params_from_iter(batch.iter()),
        )?;
        tx.commit()?;

        report.rows += rows;
        if let Some(hb) = heartbeat {
            hb.beat();
        }
    }

    info!(
        from = %cfg.tname,
        to = %cfg.totname,
        rows = report.rows,
        "migration complete"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
