// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The DB miner: bookmarked SELECT → chunked XML record files.
//!
//! The query runs once per invocation (a scheduler re-invokes the
//! program); the result set is spilled into files of at most `maxcount`
//! records each, named `{prefix}_{yyyymmddhh24miss}_{suffix}_{seq}.xml`.
//! In incremental mode the first placeholder of the SELECT is the lower
//! bound on the incremental column, fed from the incremental-max
//! bookmark, which is updated only when at least one record was emitted.

use std::io::Write;
use std::path::PathBuf;

use rusqlite::types::Value;
use tracing::info;

use dcx_core::config::{require_tag, tag_str, tag_u64, ConfigError};
use dcx_core::record::RECORD_END;
use dcx_core::{fsutil, timefmt};
use dcx_daemon::Heartbeat;

use crate::conn::{connect, value_to_text, DbError, DbResult};
use crate::incmax::IncStore;

#[derive(Debug, Clone)]
pub struct MineConfig {
    pub connstr: String,
    pub selectsql: String,
    pub fields: Vec<String>,
    pub fieldlens: Vec<i64>,
    pub outpath: PathBuf,
    pub bfilename: String,
    pub efilename: String,
    /// Records per output file; 0 = unlimited (one file).
    pub maxcount: u64,
    /// Comma-separated two-digit hours gating execution; empty = always.
    pub starttime: String,
    pub incfield: String,
    pub incfilename: String,
    pub connstr1: String,
    pub timeout: u64,
    pub pname: String,
}

impl MineConfig {
    pub fn parse(xml: &str) -> Result<Self, ConfigError> {
        let fieldstr = require_tag(xml, "fieldstr")?;
        let fieldlen = require_tag(xml, "fieldlen")?;
        let fields: Vec<String> = fieldstr.split(',').map(|s| s.trim().to_string()).collect();
        let fieldlens: Vec<i64> = fieldlen
            .split(',')
            .map(|s| s.trim().parse().unwrap_or(0))
            .collect();
        if fields.len() != fieldlens.len() {
            return Err(ConfigError::Invalid {
                tag: "fieldlen",
                value: fieldlen,
            });
        }

        let cfg = Self {
            connstr: require_tag(xml, "connstr")?,
            selectsql: require_tag(xml, "selectsql")?,
            fields,
            fieldlens,
            outpath: PathBuf::from(require_tag(xml, "outpath")?),
            bfilename: require_tag(xml, "bfilename")?,
            efilename: require_tag(xml, "efilename")?,
            maxcount: tag_u64(xml, "maxcount").unwrap_or(0),
            starttime: tag_str(xml, "starttime").unwrap_or_default(),
            incfield: tag_str(xml, "incfield").unwrap_or_default(),
            incfilename: tag_str(xml, "incfilename").unwrap_or_default(),
            connstr1: tag_str(xml, "connstr1").unwrap_or_default(),
            timeout: tag_u64(xml, "timeout").ok_or(ConfigError::Missing("timeout"))?,
            pname: require_tag(xml, "pname")?,
        };

        // Incremental mining needs somewhere to keep the bookmark.
        if !cfg.incfield.is_empty()
            && cfg.incfilename.is_empty()
            && cfg.connstr1.is_empty()
        {
            return Err(ConfigError::Missing("incfilename"));
        }
        Ok(cfg)
    }
}

#[derive(Debug, Default)]
pub struct MineReport {
    pub files: Vec<PathBuf>,
    pub rows: u64,
    /// The bookmark value after the run (unchanged when no rows).
    pub maxinc: i64,
}

/// One mining run.
pub fn run_mine(cfg: &MineConfig, heartbeat: Option<&Heartbeat>) -> DbResult<MineReport> {
    let incremental = !cfg.incfield.is_empty();

    let inc_pos = if incremental {
        match cfg.fields.iter().position(|f| *f == cfg.incfield) {
            Some(pos) => Some(pos),
            None => {
                return Err(DbError::IncFieldNotInList {
                    incfield: cfg.incfield.clone(),
                    fieldstr: cfg.fields.join(","),
                })
            }
        }
    } else {
        None
    };

    let store = IncStore::from_config(&cfg.connstr1, &cfg.incfilename);
    let mut maxinc = match (&store, incremental) {
        (Some(store), true) => store.read(&cfg.pname)?,
        _ => 0,
    };
    if incremental {
        info!(maxinc, "maxincvalue of data mined last time");
    }

    let conn = connect(&cfg.connstr)?;
    let mut stmt = conn.prepare(&cfg.selectsql)?;
    let mut rows = if incremental {
        stmt.query([maxinc])?
    } else {
        stmt.query([])?
    };
    if let Some(hb) = heartbeat {
        hb.beat();
    }

    let mut report = MineReport::default();
    let mut writer = ChunkWriter::new(cfg);

    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(cfg.fields.len());
        for i in 0..cfg.fields.len() {
            values.push(value_to_text(row.get::<_, Value>(i)?));
        }

        writer.write_record(&cfg.fields, &values)?;
        report.rows += 1;

        if cfg.maxcount > 0 && report.rows % cfg.maxcount == 0 {
            let path = writer.close_current()?;
            info!(file = %path.display(), records = cfg.maxcount, "generated file");
            report.files.push(path);
            if let Some(hb) = heartbeat {
                hb.beat();
            }
        }

        if let Some(pos) = inc_pos {
            if let Ok(v) = values[pos].trim().parse::<i64>() {
                maxinc = maxinc.max(v);
            }
        }
    }

    if let Some(path) = writer.close_if_open()? {
        let records = if cfg.maxcount == 0 {
            report.rows
        } else {
            report.rows % cfg.maxcount
        };
        info!(file = %path.display(), records, "generated file");
        report.files.push(path);
        if let Some(hb) = heartbeat {
            hb.beat();
        }
    }

    if report.rows > 0 {
        if let (Some(store), true) = (&store, incremental) {
            store.write(&cfg.pname, maxinc)?;
        }
    }
    report.maxinc = maxinc;
    Ok(report)
}

/// Writes records into `<data>`-wrapped files, one temp file at a time,
/// renamed into place on close.
struct ChunkWriter<'a> {
    cfg: &'a MineConfig,
    seq: u64,
    current: Option<(PathBuf, std::io::BufWriter<std::fs::File>)>,
}

impl<'a> ChunkWriter<'a> {
    fn new(cfg: &'a MineConfig) -> Self {
        Self {
            cfg,
            seq: 1,
            current: None,
        }
    }

    fn write_record(&mut self, fields: &[String], values: &[String]) -> DbResult<()> {
        if self.current.is_none() {
            let name = format!(
                "{}_{}_{}_{}.xml",
                self.cfg.bfilename,
                timefmt::compact_now(),
                self.cfg.efilename,
                self.seq
            );
            self.seq += 1;
            let path = self.cfg.outpath.join(name);
            let file = std::fs::File::create(fsutil::tmp_path(&path))?;
            let mut out = std::io::BufWriter::new(file);
            writeln!(out, "<data>")?;
            self.current = Some((path, out));
        }

        let Some((_, out)) = self.current.as_mut() else {
            return Ok(());
        };
        for (field, value) in fields.iter().zip(values) {
            write!(out, "<{field}>{value}</{field}>")?;
        }
        writeln!(out, "{RECORD_END}")?;
        Ok(())
    }

    fn close_current(&mut self) -> DbResult<PathBuf> {
        let Some((path, mut out)) = self.current.take() else {
            return Err(DbError::Io(std::io::Error::other("no open chunk")));
        };
        writeln!(out, "</data>")?;
        out.flush()?;
        drop(out);
        std::fs::rename(fsutil::tmp_path(&path), &path)?;
        Ok(path)
    }

    fn close_if_open(&mut self) -> DbResult<Option<PathBuf>> {
        if self.current.is_none() {
            return Ok(None);
        }
        self.close_current().map(Some)
    }
}

#[cfg(test)]
#[path = "mine_tests.rs"]
mod tests;
