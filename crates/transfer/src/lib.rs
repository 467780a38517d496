// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dcx-transfer: moving record files between machines.
//!
//! The framed TCP transfer protocol (server, push and pull clients, the
//! pipelined sender and the receiver it talks to) and the FTP replicator
//! with its transfer bookmark.

pub mod client;
pub mod frame;
pub mod ftp;
pub mod message;
pub mod receiver;
pub mod sender;
pub mod server;
pub mod settings;

pub use frame::{ProtocolError, CHUNK};
pub use message::{Ack, Control, FileMeta};
pub use settings::TransferJob;
