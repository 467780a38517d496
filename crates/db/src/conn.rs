// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection handling and error classification.
//!
//! Two classifications matter to the daemons:
//!
//! - a **unique violation** is a signal, not an error: with upsert
//!   enabled it routes the record to the UPDATE path;
//! - the **connection-level fatal set** means the process must exit so a
//!   fresh connection is established cleanly by the restarted daemon.

use std::time::Duration;

use rusqlite::{Connection, ErrorCode};
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] dcx_core::config::ConfigError),

    #[error("bad match pattern: {0}")]
    Match(#[from] dcx_core::fmatch::MatchError),

    #[error("incremental column {incfield} not in field list {fieldstr}")]
    IncFieldNotInList { incfield: String, fieldstr: String },
}

/// Open the database named by a connection string (a file path).
pub fn connect(connstr: &str) -> DbResult<Connection> {
    let conn = Connection::open(connstr)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

/// Primary-key or unique-index conflict: the upsert signal.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
    const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

/// The enumerated fatal set: the connection or the database underneath it
/// is gone, and continuing on this handle cannot work.
pub fn is_connection_fatal(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::DiskFull
                | ErrorCode::SystemIoFailure
        ),
        _ => false,
    }
}

/// Render any SQLite value as record text.
pub fn value_to_text(value: rusqlite::types::Value) -> String {
    use rusqlite::types::Value;
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(_) => String::new(),
    }
}
