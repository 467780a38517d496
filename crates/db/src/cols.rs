// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table introspection.
//!
//! Declared column types collapse into three semantic types the record
//! pipeline understands: `char` (declared length preserved), `date`
//! (canonical 14-character compact timestamp), and `number` (canonical
//! length 22). Columns of any other type are ignored, and the primary-key
//! ordinal comes straight from the schema.

use rusqlite::Connection;

use crate::conn::DbResult;

/// Canonical length of a `date` column's compact rendering.
pub const DATE_LEN: i64 = 14;

/// Canonical length of a `number` column's text rendering.
pub const NUMBER_LEN: i64 = 22;

/// Fallback length for character columns declared without one.
const DEFAULT_CHAR_LEN: i64 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColType {
    Char,
    Date,
    Number,
}

/// One introspected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub ctype: ColType,
    pub len: i64,
    /// 1-based position within the primary key, 0 when not a key column.
    pub pkseq: i64,
}

/// All usable columns of `table`, in declaration order.
///
/// An empty result means the table does not exist (or has no column of a
/// supported type); callers treat that as a configuration error.
pub fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<TableColumn>> {
    let mut stmt =
        conn.prepare("select name, lower(coalesce(type, '')), pk from pragma_table_info(?1)")?;
    let rows = stmt.query_map([table], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut cols = Vec::new();
    for row in rows {
        let (name, decl, pkseq) = row?;
        let Some((ctype, len)) = classify(&decl) else {
            continue;
        };
        cols.push(TableColumn {
            name: name.to_lowercase(),
            ctype,
            len,
            pkseq,
        });
    }
    Ok(cols)
}

/// Comma-separated column-name list.
pub fn all_cols_csv(cols: &[TableColumn]) -> String {
    cols.iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Key columns ordered by their position in the primary key.
pub fn pk_cols(cols: &[TableColumn]) -> Vec<&TableColumn> {
    let mut pks: Vec<&TableColumn> = cols.iter().filter(|c| c.pkseq > 0).collect();
    pks.sort_by_key(|c| c.pkseq);
    pks
}

/// Map a declared type to the semantic type and canonical length.
fn classify(decl: &str) -> Option<(ColType, i64)> {
    if decl.contains("date") || decl.contains("time") {
        return Some((ColType::Date, DATE_LEN));
    }
    if decl.contains("int")
        || decl.contains("num")
        || decl.contains("real")
        || decl.contains("dec")
        || decl.contains("double")
        || decl.contains("float")
    {
        return Some((ColType::Number, NUMBER_LEN));
    }
    if decl.contains("char") || decl.contains("text") || decl.contains("clob") {
        return Some((ColType::Char, declared_len(decl).unwrap_or(DEFAULT_CHAR_LEN)));
    }
    None
}

/// Pull `N` out of a declaration like `varchar(30)`.
fn declared_len(decl: &str) -> Option<i64> {
    let start = decl.find('(')? + 1;
    let end = decl[start..].find(')')? + start;
    decl[start..end].split(',').next()?.trim().parse().ok()
}

#[cfg(test)]
#[path = "cols_tests.rs"]
mod tests;
