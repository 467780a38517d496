// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format for the transfer protocol.
//!
//! Wire format: 4-byte length prefix (big-endian) + payload. A frame is
//! either a control frame (tagged ASCII text) or a data frame (raw bytes
//! of the current file body, at most [`CHUNK`] per frame). All control
//! decisions are made on frames, never on bytes of file content.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// File bodies travel in data frames of at most this many bytes.
pub const CHUNK: usize = 1024;

/// Upper bound on any frame. Control frames are tiny and data frames are
/// capped at [`CHUNK`]; anything larger means a desynchronized stream.
pub const MAX_FRAME: usize = 64 * 1024;

/// Bounded wait for one outstanding ack while draining after a pass.
pub const ACK_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for the keepalive reply.
pub const ACTIVETEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout")]
    Timeout,

    #[error("control frame is not text")]
    NotText,

    #[error("login rejected by server")]
    LoginRejected,

    #[error("data frame of {got} bytes where {expected} were expected")]
    BadChunk { got: usize, expected: usize },

    #[error("bad match pattern: {0}")]
    Match(#[from] dcx_core::fmatch::MatchError),
}

/// Read one length-prefixed frame.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME,
        });
    }

    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
            _ => ProtocolError::Io(e),
        })?;
    Ok(buf)
}

/// Write one length-prefixed frame.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = data.len();
    if len > MAX_FRAME {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME,
        });
    }

    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a control frame as text.
pub async fn read_text<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<String, ProtocolError> {
    let bytes = read_frame(reader).await?;
    String::from_utf8(bytes).map_err(|_| ProtocolError::NotText)
}

/// Read a control frame as text, bounded by `timeout`.
pub async fn read_text_timeout<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<String, ProtocolError> {
    tokio::time::timeout(timeout, read_text(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

/// Write a control frame from text.
pub async fn write_text<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    text: &str,
) -> Result<(), ProtocolError> {
    write_frame(writer, text.as_bytes()).await
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
