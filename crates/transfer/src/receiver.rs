// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The receiving half of a transfer session.
//!
//! Serves keepalives and file announcements in arrival order. Bodies are
//! written to a temp name and renamed into place once complete, then the
//! advertised mtime is restored. A file that cannot be opened or renamed
//! is acked `failed`; the body is still drained off the stream so one
//! bad file never desynchronizes the session.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use dcx_core::fsutil;
use dcx_daemon::{Heartbeat, Shutdown};

use crate::frame::{read_frame, read_text, write_text, ProtocolError, CHUNK};
use crate::message::{parse_control, Ack, Control, FileMeta, ACTIVETEST_REPLY};

/// Run the receiving role until shutdown or a stream-level failure.
pub async fn run_receiver<R, W>(
    reader: &mut R,
    writer: &mut W,
    dest_root: &Path,
    heartbeat: Option<&Heartbeat>,
    shutdown: &Shutdown,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = serve_frames(reader, writer, dest_root, heartbeat, shutdown).await;
    // A stop request racing the stream teardown is still a clean stop.
    if shutdown.requested() {
        return Ok(());
    }
    result
}

async fn serve_frames<R, W>(
    reader: &mut R,
    writer: &mut W,
    dest_root: &Path,
    heartbeat: Option<&Heartbeat>,
    shutdown: &Shutdown,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        if shutdown.requested() {
            return Ok(());
        }

        let text = tokio::select! {
            text = read_text(reader) => text?,
            _ = shutdown.wait() => return Ok(()),
        };

        match parse_control(&text) {
            Control::ActiveTest => write_text(writer, ACTIVETEST_REPLY).await?,
            Control::File(meta) => {
                let ok = receive_body(reader, dest_root, &meta).await?;
                if ok {
                    info!(file = %meta.filename, size = meta.filesize, "received");
                } else {
                    warn!(file = %meta.filename, "receive failed, acking failure");
                }
                let ack = Ack {
                    filename: meta.filename,
                    ok,
                };
                write_text(writer, &ack.encode()).await?;
                if let Some(hb) = heartbeat {
                    hb.beat();
                }
            }
            _ => {}
        }
    }
}

/// Consume exactly `filesize` bytes of data frames and land the file.
///
/// Returns `Ok(true)` only when open, every write, the rename, and the
/// mtime restore all succeed. Local filesystem failures drain the
/// remaining frames and return `Ok(false)`; only stream-level failures
/// are `Err`.
async fn receive_body<R>(
    reader: &mut R,
    dest_root: &Path,
    meta: &FileMeta,
) -> Result<bool, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let dest = dest_root.join(&meta.filename);
    let tmp = fsutil::tmp_path(&dest);

    let mut file = match tokio::fs::File::create(&tmp).await {
        Ok(f) => Some(f),
        Err(e) => {
            warn!(file = %tmp.display(), "open failed: {e}");
            None
        }
    };

    let mut remaining = meta.filesize as usize;
    while remaining > 0 {
        let frame = read_frame(reader).await?;
        let expected = remaining.min(CHUNK);
        if frame.len() != expected {
            return Err(ProtocolError::BadChunk {
                got: frame.len(),
                expected,
            });
        }
        if let Some(f) = file.as_mut() {
            if let Err(e) = f.write_all(&frame).await {
                warn!(file = %tmp.display(), "write failed: {e}");
                file = None;
            }
        }
        remaining -= frame.len();
    }

    let Some(mut f) = file else {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Ok(false);
    };
    if let Err(e) = f.flush().await {
        warn!(file = %tmp.display(), "flush failed: {e}");
        let _ = tokio::fs::remove_file(&tmp).await;
        return Ok(false);
    }
    drop(f);

    if let Err(e) = tokio::fs::rename(&tmp, &dest).await {
        warn!(from = %tmp.display(), to = %dest.display(), "rename failed: {e}");
        let _ = tokio::fs::remove_file(&tmp).await;
        return Ok(false);
    }

    // The peer's timestamp, not ours: bookkeeping downstream (FTP
    // bookmarks, re-transfer checks) compares mtimes across machines.
    if let Err(e) = fsutil::set_mtime_compact(&dest, &meta.mtime) {
        warn!(file = %dest.display(), "set mtime failed: {e}");
        return Ok(false);
    }

    Ok(true)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
