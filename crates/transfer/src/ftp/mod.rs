// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental directory replication over FTP.
//!
//! One run is one pass: list the source side, diff against the transfer
//! bookmark, move what is new or changed, record what landed. The remote
//! end is behind the [`RemoteStore`] trait so the replication logic is
//! exercised against a fake in tests; [`FtpSession`] is the real client.

pub mod bookmark;
pub mod replicate;
pub mod session;
pub mod settings;

use std::path::Path;

use thiserror::Error;

pub use replicate::{run_download, run_upload, ReplicateReport};
pub use session::FtpSession;
pub use settings::{FtpGetConfig, FtpPutConfig};

#[derive(Debug, Error)]
pub enum FtpError {
    #[error("ftp error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad match pattern: {0}")]
    Match(#[from] dcx_core::fmatch::MatchError),
}

/// The remote end of a replication run.
///
/// Names are relative to the remote working directory selected at login;
/// rename targets may be absolute (the backup root lives elsewhere).
pub trait RemoteStore {
    /// Bare names in the remote directory.
    fn list(&mut self) -> Result<Vec<String>, FtpError>;

    /// Modification time of a remote file, compact `yyyymmddhh24miss`.
    fn mtime(&mut self, name: &str) -> Result<String, FtpError>;

    fn download(&mut self, name: &str, local: &Path) -> Result<(), FtpError>;

    fn upload(&mut self, local: &Path, name: &str) -> Result<(), FtpError>;

    fn remove(&mut self, name: &str) -> Result<(), FtpError>;

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FtpError>;
}
