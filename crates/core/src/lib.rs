// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dcx-core: shared building blocks for the dcx daemons.
//!
//! Tagged config strings, the line-delimited XML record codec, compact
//! timestamp handling, comma-separated glob matching, and the filesystem
//! helpers every daemon leans on.

pub mod config;
pub mod fmatch;
pub mod fsutil;
pub mod record;
pub mod timefmt;

pub use config::{tag_bool, tag_i64, tag_str, tag_u16, tag_u64, require_tag, ConfigError};
pub use fmatch::NameMatcher;
pub use fsutil::FileEntry;
pub use record::{field, pick_digits, pick_number, RecordReader, RECORD_END};
