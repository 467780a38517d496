// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upsert SQL synthesis from an introspected column set.
//!
//! The builder emits a `(sql, bind plan)` pair. The plan carries one
//! entry per placeholder, in placeholder order, saying which record field
//! feeds it and what conversion applies at bind time. Special columns:
//!
//! - `upttime` is excluded from INSERT (its default applies) and set to
//!   the current timestamp in UPDATE;
//! - `keyid` draws from the table's own key sequence in INSERT and is
//!   never touched by UPDATE;
//! - `date` columns arrive as compact 14-digit strings and are converted
//!   to ISO text when bound.

use crate::cols::{pk_cols, ColType, TableColumn};

/// The timestamp-maintenance column.
const UPTTIME: &str = "upttime";

/// The sequence-fed surrogate key column.
const KEYID: &str = "keyid";

/// How a placeholder's value is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bind {
    /// The record field for column index `col`, bound as-is.
    Field { col: usize },
    /// The record field for column index `col`, compact date → ISO.
    DateField { col: usize },
    /// The current timestamp.
    Now,
}

/// A synthesized statement and its bind plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPlan {
    pub sql: String,
    pub binds: Vec<Bind>,
}

/// `insert into T(cols) values(…)`.
pub fn build_insert(table: &str, cols: &[TableColumn]) -> SqlPlan {
    let mut names = Vec::new();
    let mut values = Vec::new();
    let mut binds = Vec::new();
    let mut seq = 1;

    for (i, col) in cols.iter().enumerate() {
        if col.name == UPTTIME {
            continue;
        }
        names.push(col.name.clone());

        if col.name == KEYID {
            // The table's own key sequence; sound because each table has
            // a single writing daemon.
            values.push(format!("coalesce((select max({KEYID}) from {table}), 0) + 1"));
        } else if col.ctype == ColType::Date {
            values.push(format!("?{seq}"));
            binds.push(Bind::DateField { col: i });
            seq += 1;
        } else {
            values.push(format!("?{seq}"));
            binds.push(Bind::Field { col: i });
            seq += 1;
        }
    }

    SqlPlan {
        sql: format!(
            "insert into {table}({}) values({})",
            names.join(","),
            values.join(",")
        ),
        binds,
    }
}

/// `update T set … where 1=1 and pk=… and …`.
///
/// Set-clause covers non-key columns (minus `keyid`); the where-clause
/// binds every key column in key order.
pub fn build_update(table: &str, cols: &[TableColumn]) -> SqlPlan {
    let mut sets = Vec::new();
    let mut binds = Vec::new();
    let mut seq = 1;

    for (i, col) in cols.iter().enumerate() {
        if col.pkseq != 0 || col.name == KEYID {
            continue;
        }
        if col.name == UPTTIME {
            sets.push(format!("{UPTTIME}=?{seq}"));
            binds.push(Bind::Now);
            seq += 1;
        } else if col.ctype == ColType::Date {
            sets.push(format!("{}=?{seq}", col.name));
            binds.push(Bind::DateField { col: i });
            seq += 1;
        } else {
            sets.push(format!("{}=?{seq}", col.name));
            binds.push(Bind::Field { col: i });
            seq += 1;
        }
    }

    let mut wheres = String::from(" where 1=1");
    for pk in pk_cols(cols) {
        let col = cols
            .iter()
            .position(|c| c.name == pk.name)
            .unwrap_or_default();
        wheres.push_str(&format!(" and {}=?{seq}", pk.name));
        binds.push(if pk.ctype == ColType::Date {
            Bind::DateField { col }
        } else {
            Bind::Field { col }
        });
        seq += 1;
    }

    SqlPlan {
        sql: format!("update {table} set {}{}", sets.join(","), wheres),
        binds,
    }
}

#[cfg(test)]
#[path = "sqlgen_tests.rs"]
mod tests;
