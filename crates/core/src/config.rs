// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged config-string parsing.
//!
//! Every daemon receives its configuration as a single string of
//! `<tag>value</tag>` pairs. Unknown tags are ignored; each daemon pulls
//! out the tags it cares about and validates them.

use thiserror::Error;

/// Errors raised while extracting daemon parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is null")]
    Missing(&'static str),

    #[error("invalid value for {tag}: {value}")]
    Invalid { tag: &'static str, value: String },

    #[error("timeout({timeout}) <= timetvl({timetvl})")]
    TimeoutNotAboveInterval { timeout: u64, timetvl: u64 },
}

/// Extract the raw value of `<name>…</name>` from `buffer`.
///
/// Returns `None` when the opening or closing tag is absent. Nested tags
/// are not supported; the value runs to the first matching close tag.
pub fn tag_str(buffer: &str, name: &str) -> Option<String> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = buffer.find(&open)? + open.len();
    let end = buffer[start..].find(&close)? + start;
    Some(buffer[start..end].to_string())
}

/// Extract a tag as an integer. Absent or unparsable values yield `None`.
pub fn tag_i64(buffer: &str, name: &str) -> Option<i64> {
    tag_str(buffer, name)?.trim().parse().ok()
}

/// Extract a tag as an unsigned integer.
pub fn tag_u64(buffer: &str, name: &str) -> Option<u64> {
    tag_str(buffer, name)?.trim().parse().ok()
}

/// Extract a tag as a port number.
pub fn tag_u16(buffer: &str, name: &str) -> Option<u16> {
    tag_str(buffer, name)?.trim().parse().ok()
}

/// Extract a tag as a boolean. Only the literal `true` is true.
pub fn tag_bool(buffer: &str, name: &str) -> bool {
    tag_str(buffer, name).is_some_and(|v| v.trim() == "true")
}

/// Extract a mandatory non-empty tag.
pub fn require_tag(buffer: &str, name: &'static str) -> Result<String, ConfigError> {
    match tag_str(buffer, name) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
