// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-frame grammar.
//!
//! Payloads are the tagged ASCII strings of the wire protocol:
//!
//! - login: the client's whole config string plus `<clienttype>N</clienttype>`
//! - login reply: `success` or `failed` (plain, no tags)
//! - keepalive: `<activetest>ok</activetest>`, reply `ok`
//! - file announcement: `<filename>…</filename><filesize>N</filesize><mtime>…</mtime>`
//! - ack: `<filename>…</filename><result>success|failed</result>`

use dcx_core::config::{tag_str, tag_u64};

/// Keepalive request payload.
pub const ACTIVETEST: &str = "<activetest>ok</activetest>";

/// Keepalive reply payload.
pub const ACTIVETEST_REPLY: &str = "ok";

/// Login accepted reply.
pub const LOGIN_OK: &str = "success";

/// Login rejected reply.
pub const LOGIN_FAILED: &str = "failed";

/// File announcement sent ahead of each body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub filename: String,
    pub filesize: u64,
    /// Compact `yyyymmddhh24miss` modification time.
    pub mtime: String,
}

impl FileMeta {
    pub fn encode(&self) -> String {
        format!(
            "<filename>{}</filename><filesize>{}</filesize><mtime>{}</mtime>",
            self.filename, self.filesize, self.mtime
        )
    }

    pub fn parse(text: &str) -> Option<Self> {
        Some(Self {
            filename: tag_str(text, "filename")?,
            filesize: tag_u64(text, "filesize")?,
            mtime: tag_str(text, "mtime").unwrap_or_default(),
        })
    }
}

/// Per-file acknowledgement from the receiving side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub filename: String,
    pub ok: bool,
}

impl Ack {
    pub fn encode(&self) -> String {
        let result = if self.ok { "success" } else { "failed" };
        format!(
            "<filename>{}</filename><result>{}</result>",
            self.filename, result
        )
    }

    pub fn parse(text: &str) -> Option<Self> {
        let filename = tag_str(text, "filename")?;
        let result = tag_str(text, "result")?;
        Some(Self {
            filename,
            ok: result == "success",
        })
    }
}

/// A classified inbound control frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    ActiveTest,
    ActiveReply,
    File(FileMeta),
    Ack(Ack),
    /// Anything unrecognized; ignored by both roles.
    Other(String),
}

/// Classify a control frame.
///
/// Order matters: an ack also contains `<filename>`, so the `<result>`
/// check comes first.
pub fn parse_control(text: &str) -> Control {
    if text == ACTIVETEST {
        return Control::ActiveTest;
    }
    if text == ACTIVETEST_REPLY {
        return Control::ActiveReply;
    }
    if text.contains("<result>") {
        if let Some(ack) = Ack::parse(text) {
            return Control::Ack(ack);
        }
    }
    if text.contains("<filename>") {
        if let Some(meta) = FileMeta::parse(text) {
            return Control::File(meta);
        }
    }
    Control::Other(text.to_string())
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
