// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Comma-separated filename glob matching.
//!
//! Patterns like `*.XML,*.TXT` match case-insensitively: the miner writes
//! `.xml` files and the ingester scans for `*.XML`, and both must agree.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("bad match pattern {pattern}: {source}")]
    BadPattern {
        pattern: String,
        source: globset::Error,
    },
}

/// A compiled comma-separated glob list.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    set: GlobSet,
}

impl NameMatcher {
    pub fn new(patterns_csv: &str) -> Result<Self, MatchError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns_csv.split(',') {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| MatchError::BadPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| MatchError::BadPattern {
            pattern: patterns_csv.to_string(),
            source,
        })?;
        Ok(Self { set })
    }

    /// Whether a bare filename matches any pattern in the list.
    pub fn matches(&self, name: &str) -> bool {
        self.set.is_match(name)
    }
}

#[cfg(test)]
#[path = "fmatch_tests.rs"]
mod tests;
