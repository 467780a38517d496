// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The incremental-max bookmark.
//!
//! The miner records the largest value of its incremental column so the
//! next run picks up where this one stopped. The bookmark lives either in
//! a single-line file or in `T_MAXINCVALUE(pname, maxincvalue)` on a
//! bookkeeping database; the database wins when both are configured. A
//! lost bookmark simply re-mines from the beginning, which is safe
//! because ingestion upserts.

use std::path::PathBuf;

use dcx_core::fsutil;

use crate::conn::{connect, DbResult};

/// Where the bookmark lives.
#[derive(Debug, Clone)]
pub enum IncStore {
    File(PathBuf),
    Table { connstr: String },
}

impl IncStore {
    /// Pick the store from the two config tags; `connstr1` wins.
    pub fn from_config(connstr1: &str, incfilename: &str) -> Option<Self> {
        if !connstr1.trim().is_empty() {
            Some(Self::Table {
                connstr: connstr1.trim().to_string(),
            })
        } else if !incfilename.trim().is_empty() {
            Some(Self::File(PathBuf::from(incfilename.trim())))
        } else {
            None
        }
    }

    /// Last recorded max, 0 when nothing was recorded yet.
    pub fn read(&self, pname: &str) -> DbResult<i64> {
        match self {
            Self::File(path) => {
                let text = match std::fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
                    Err(e) => return Err(e.into()),
                };
                Ok(text.trim().parse().unwrap_or(0))
            }
            Self::Table { connstr } => {
                let conn = connect(connstr)?;
                ensure_table(&conn)?;
                let value = conn
                    .query_row(
                        "select maxincvalue from T_MAXINCVALUE where pname = ?1",
                        [pname],
                        |row| row.get::<_, i64>(0),
                    )
                    .map(Some)
                    .or_else(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;
                Ok(value.unwrap_or(0))
            }
        }
    }

    /// Record a new max. The table is created on first write.
    pub fn write(&self, pname: &str, value: i64) -> DbResult<()> {
        match self {
            Self::File(path) => {
                fsutil::atomic_write(path, format!("{value}\n").as_bytes())?;
                Ok(())
            }
            Self::Table { connstr } => {
                let conn = connect(connstr)?;
                ensure_table(&conn)?;
                conn.execute(
                    "insert into T_MAXINCVALUE(pname, maxincvalue) values(?1, ?2)
                     on conflict(pname) do update set maxincvalue = excluded.maxincvalue",
                    rusqlite::params![pname, value],
                )?;
                Ok(())
            }
        }
    }
}

fn ensure_table(conn: &rusqlite::Connection) -> DbResult<()> {
    conn.execute_batch(
        "create table if not exists T_MAXINCVALUE(
             pname       varchar(64) primary key,
             maxincvalue integer
         );",
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "incmax_tests.rs"]
mod tests;
