// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The XML ingester: record files → table rows, one commit per file.
//!
//! A long-running process that scans its inbox for `*.XML` files in
//! filename order, dispatches each through the ordered rule table, and
//! upserts records against the introspected target schema. Per-record
//! failures are data-quality issues and do not poison the file;
//! connection-level failures bounce the process so the supervisor
//! restarts it with a fresh connection.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{info, warn};

use dcx_core::config::{require_tag, tag_str, tag_u64, ConfigError};
use dcx_core::fmatch::NameMatcher;
use dcx_core::fsutil::scan_dir;
use dcx_core::record::{field, pick_digits, pick_number, RecordReader};
use dcx_core::timefmt;
use dcx_daemon::{Heartbeat, Shutdown};

use crate::cols::{table_columns, ColType, TableColumn};
use crate::conn::{connect, is_connection_fatal, is_unique_violation, DbResult};
use crate::sqlgen::{build_insert, build_update, Bind, SqlPlan};

/// Rule table reload period, in outer-loop passes.
const RULE_RELOAD_PASSES: u32 = 30;

/// One dispatch rule: first filename match wins.
#[derive(Debug, Clone)]
pub struct IngestRule {
    /// Comma-separated filename globs.
    pub filename: String,
    pub tname: String,
    /// Update on PK conflict (`uptbz = 1`).
    pub upsert: bool,
    /// Statement run before the file, committed with it.
    pub execsql: String,
}

/// Ingester parameters.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub connstr: String,
    pub inifilename: PathBuf,
    pub xmlpath: PathBuf,
    pub xmlpathbak: PathBuf,
    pub xmlpatherr: PathBuf,
    /// Inbox scan interval when idle, clamped to 2..=30 seconds.
    pub timetvl: u64,
    pub timeout: u64,
    pub pname: String,
}

impl IngestConfig {
    pub fn parse(xml: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            connstr: require_tag(xml, "connstr")?,
            inifilename: PathBuf::from(require_tag(xml, "inifilename")?),
            xmlpath: PathBuf::from(require_tag(xml, "xmlpath")?),
            xmlpathbak: PathBuf::from(require_tag(xml, "xmlpathbak")?),
            xmlpatherr: PathBuf::from(require_tag(xml, "xmlpatherr")?),
            timetvl: tag_u64(xml, "timetvl").unwrap_or(0).clamp(2, 30),
            timeout: tag_u64(xml, "timeout").ok_or(ConfigError::Missing("timeout"))?,
            pname: require_tag(xml, "pname")?,
        })
    }
}

/// Outcome of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok {
        total: u64,
        inserted: u64,
        updated: u64,
    },
    /// No rule matched the filename.
    BadRule,
    /// The rule's table does not exist.
    NoTable,
    /// The rule's pre-SQL failed.
    PreSqlErr,
    /// Connection-level failure; the process must exit.
    DbErr,
    /// The file could not be opened; the process must exit.
    OpenErr,
}

/// Load the rule table. Rules are `<endl/>`-terminated records of
/// `filename`, `tname`, `uptbz`, `execsql` tags.
pub fn load_rules(path: &Path) -> DbResult<Vec<IngestRule>> {
    let file = std::fs::File::open(path)?;
    let mut reader = RecordReader::new(BufReader::new(file));
    let mut rules = Vec::new();
    while let Some(record) = reader.next_record()? {
        let filename = field(&record, "filename");
        let tname = field(&record, "tname");
        if filename.is_empty() || tname.is_empty() {
            continue;
        }
        rules.push(IngestRule {
            filename,
            tname,
            upsert: field(&record, "uptbz").trim() == "1",
            execsql: field(&record, "execsql"),
        });
    }
    info!(count = rules.len(), "load ingest rules");
    Ok(rules)
}

/// The ingest daemon loop. Returns when shutdown is requested or when an
/// outcome demands a process bounce (the supervisor restarts us).
pub fn run_ingest(
    cfg: &IngestConfig,
    heartbeat: Option<&Heartbeat>,
    shutdown: &Shutdown,
) -> DbResult<()> {
    let matcher = NameMatcher::new("*.XML")?;
    let mut rules: Vec<IngestRule> = Vec::new();
    let mut conn: Option<Connection> = None;
    let mut passes = RULE_RELOAD_PASSES; // force an initial load

    loop {
        if shutdown.requested() {
            return Ok(());
        }

        passes += 1;
        if passes > RULE_RELOAD_PASSES {
            rules = load_rules(&cfg.inifilename)?;
            passes = 0;
        }

        if conn.is_none() {
            conn = Some(connect(&cfg.connstr)?);
            info!(connstr = %cfg.connstr, "connect to database success");
        }
        let Some(db) = conn.as_ref() else {
            continue;
        };

        let files = scan_dir(&cfg.xmlpath, &matcher, false, true)?;
        let had_files = !files.is_empty();

        for entry in &files {
            if shutdown.requested() {
                return Ok(());
            }

            let outcome = process_file(db, &rules, &entry.path, &entry.name);
            if let Some(hb) = heartbeat {
                hb.beat();
            }

            match &outcome {
                Outcome::Ok {
                    total,
                    inserted,
                    updated,
                } => {
                    let bak = cfg.xmlpathbak.join(&entry.name);
                    std::fs::rename(&entry.path, &bak)?;
                    info!(
                        file = %entry.name,
                        total,
                        inserted,
                        updated,
                        failed = total - inserted - updated,
                        "ingested"
                    );
                }
                Outcome::BadRule | Outcome::NoTable | Outcome::PreSqlErr => {
                    let err = cfg.xmlpatherr.join(&entry.name);
                    std::fs::rename(&entry.path, &err)?;
                    warn!(file = %entry.name, outcome = ?outcome, "moved to error directory");
                }
                Outcome::DbErr => {
                    warn!(file = %entry.name, "database error, exiting for restart");
                    return Ok(());
                }
                Outcome::OpenErr => {
                    warn!(file = %entry.name, "open failed, exiting for restart");
                    return Ok(());
                }
            }
        }

        if !had_files {
            // Sleep in slices so a stop request lands promptly.
            for _ in 0..cfg.timetvl {
                if shutdown.requested() {
                    return Ok(());
                }
                std::thread::sleep(Duration::from_secs(1));
            }
        }
        if let Some(hb) = heartbeat {
            hb.beat();
        }
    }
}

/// Ingest one file. Filesystem moves are the caller's job; this only
/// reports what happened.
pub fn process_file(
    conn: &Connection,
    rules: &[IngestRule],
    path: &Path,
    name: &str,
) -> Outcome {
    let Some(rule) = find_rule(rules, name) else {
        return Outcome::BadRule;
    };

    let cols = match table_columns(conn, &rule.tname) {
        Ok(cols) => cols,
        Err(_) => return Outcome::DbErr,
    };
    if cols.is_empty() {
        return Outcome::NoTable;
    }

    let insert_plan = build_insert(&rule.tname, &cols);
    let update_plan = rule.upsert.then(|| build_update(&rule.tname, &cols));

    let tx = match conn.unchecked_transaction() {
        Ok(tx) => tx,
        Err(_) => return Outcome::DbErr,
    };

    // Pre-SQL joins the file's transaction so an unopenable file rolls
    // it back.
    if !rule.execsql.trim().is_empty() {
        if let Err(e) = tx.execute(&rule.execsql, []) {
            warn!(sql = %rule.execsql, "pre-sql failed: {e}");
            return Outcome::PreSqlErr;
        }
    }

    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return Outcome::OpenErr, // tx drops → pre-sql rolls back
    };
    let mut reader = RecordReader::new(BufReader::new(file));

    let mut total = 0u64;
    let mut inserted = 0u64;
    let mut updated = 0u64;

    {
        let mut ins_stmt = match tx.prepare(&insert_plan.sql) {
            Ok(stmt) => stmt,
            Err(_) => return Outcome::DbErr,
        };
        let mut upt_stmt = match &update_plan {
            Some(plan) => match tx.prepare(&plan.sql) {
                Ok(stmt) => Some(stmt),
                Err(_) => return Outcome::DbErr,
            },
            None => None,
        };

        loop {
            let record = match reader.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(_) => return Outcome::OpenErr,
            };
            total += 1;

            let values = split_record(&record, &cols);

            let params = match plan_params(&insert_plan, &values) {
                Ok(params) => params,
                Err(bad) => {
                    warn!(record = %record.trim(), value = %bad, "bad date value, record skipped");
                    continue;
                }
            };

            match ins_stmt.execute(rusqlite::params_from_iter(params)) {
                Ok(_) => inserted += 1,
                Err(e) if is_unique_violation(&e) => {
                    if let (Some(stmt), Some(plan)) = (upt_stmt.as_mut(), &update_plan) {
                        match plan_params(plan, &values) {
                            Ok(params) => {
                                match stmt.execute(rusqlite::params_from_iter(params)) {
                                    Ok(_) => updated += 1,
                                    Err(e) => {
                                        warn!(record = %record.trim(), "update failed: {e}");
                                    }
                                }
                            }
                            Err(bad) => {
                                warn!(record = %record.trim(), value = %bad, "bad date value on update");
                            }
                        }
                    }
                }
                Err(e) if is_connection_fatal(&e) => {
                    warn!("connection-level failure: {e}");
                    return Outcome::DbErr;
                }
                Err(e) => {
                    warn!(record = %record.trim(), "insert failed: {e}");
                }
            }
        }
    }

    if tx.commit().is_err() {
        return Outcome::DbErr;
    }

    Outcome::Ok {
        total,
        inserted,
        updated,
    }
}

/// First rule whose glob list matches the filename.
fn find_rule<'a>(rules: &'a [IngestRule], name: &str) -> Option<&'a IngestRule> {
    rules.iter().find(|rule| {
        NameMatcher::new(&rule.filename)
            .map(|m| m.matches(name))
            .unwrap_or(false)
    })
}

/// Extract and scrub every column's value from one record.
///
/// Dates keep digits only (any separator convention collapses to the
/// canonical 14), numbers keep digits, sign, and point; character values
/// pass through untouched.
fn split_record(record: &str, cols: &[TableColumn]) -> Vec<String> {
    cols.iter()
        .map(|col| {
            let raw = field(record, &col.name);
            match col.ctype {
                ColType::Date => pick_digits(&raw),
                ColType::Number => pick_number(&raw, true, true),
                ColType::Char => raw,
            }
        })
        .collect()
}

/// Materialize a bind plan against one record's values.
///
/// Empty values bind NULL. A non-empty date value that does not parse is
/// a per-record error (`Err` carries the offending value), matching the
/// strictness of a database-side date conversion.
fn plan_params(plan: &SqlPlan, values: &[String]) -> Result<Vec<Value>, String> {
    let mut params = Vec::with_capacity(plan.binds.len());
    for bind in &plan.binds {
        let value = match bind {
            Bind::Field { col } => text_or_null(&values[*col]),
            Bind::DateField { col } => {
                let raw = &values[*col];
                if raw.is_empty() {
                    Value::Null
                } else {
                    match timefmt::compact_to_iso(raw) {
                        Some(iso) => Value::Text(iso),
                        None => return Err(raw.clone()),
                    }
                }
            }
            Bind::Now => Value::Text(timefmt::iso_now()),
        };
        params.push(value);
    }
    Ok(params)
}

fn text_or_null(s: &str) -> Value {
    if s.is_empty() {
        Value::Null
    } else {
        Value::Text(s.to_string())
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
