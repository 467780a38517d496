// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sending half of a transfer session.
//!
//! Files are pipelined: the sender streams announcement + body per file
//! and only *polls* for acknowledgements between files, so it never waits
//! a round trip per file. A reader task turns the inbound stream into a
//! channel; `try_recv` is the non-blocking poll, and the post-pass drain
//! waits a bounded 10 s per outstanding ack. Idle passes sleep `timetvl`
//! and exchange a keepalive so the peer can tell the session is alive.

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{info, warn};

use dcx_core::fmatch::NameMatcher;
use dcx_core::fsutil::{scan_dir, FileEntry};
use dcx_daemon::{Heartbeat, Shutdown};

use crate::frame::{
    read_frame, write_frame, write_text, ProtocolError, ACK_DRAIN_TIMEOUT, ACTIVETEST_TIMEOUT,
    CHUNK,
};
use crate::message::{parse_control, Ack, Control, ACTIVETEST};

/// What the sending side needs to know, whichever end it runs on.
#[derive(Debug, Clone)]
pub struct SenderSettings {
    /// Root directory files are sent from.
    pub root: PathBuf,
    /// Backup root for `ptype = 2` disposition.
    pub bak_root: PathBuf,
    /// 1 = delete source after success ack, 2 = move to backup root.
    pub ptype: u64,
    pub matchname: String,
    pub recurse: bool,
    /// Sleep between scan passes that found nothing, seconds.
    pub timetvl: u64,
}

/// Inbound frames seen by the sending side.
enum Inbound {
    Ack(Ack),
    /// `ok` reply to our keepalive.
    Pong,
}

/// Run the sending role until shutdown or a stream-level failure.
///
/// Per-file failures are reported by the peer via acks and do not end the
/// session; any read/write failure on the stream does.
pub async fn run_sender<R, W>(
    reader: R,
    writer: &mut W,
    settings: &SenderSettings,
    heartbeat: Option<&Heartbeat>,
    shutdown: &Shutdown,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let matcher = NameMatcher::new(&settings.matchname)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let inbound = tokio::spawn(read_inbound(reader, tx));

    let mut outstanding: u64 = 0;

    let result = loop {
        if shutdown.requested() {
            break Ok(());
        }

        let files = match scan_dir(&settings.root, &matcher, settings.recurse, false) {
            Ok(files) => files,
            Err(e) => break Err(ProtocolError::Io(e)),
        };
        let sent_any = !files.is_empty();

        let mut stream_failure = None;
        for file in &files {
            if shutdown.requested() {
                break;
            }
            if let Err(e) = send_one(writer, file).await {
                stream_failure = Some(e);
                break;
            }
            outstanding += 1;
            info!(file = %file.name, size = file.size, "sent");
            if let Some(hb) = heartbeat {
                hb.beat();
            }

            // Non-blocking poll: consume whatever acks already arrived.
            while outstanding > 0 {
                match rx.try_recv() {
                    Ok(Inbound::Ack(ack)) => {
                        handle_ack(settings, &ack);
                        outstanding -= 1;
                    }
                    Ok(Inbound::Pong) => {}
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        inbound.abort();
                        return Err(ProtocolError::ConnectionClosed);
                    }
                }
            }
        }

        if let Some(e) = stream_failure {
            break Err(e);
        }

        // Drain the acks still in flight, bounded per ack. A drain
        // timeout leaves the files for the next pass; it is not fatal.
        while outstanding > 0 {
            match tokio::time::timeout(ACK_DRAIN_TIMEOUT, rx.recv()).await {
                Ok(Some(Inbound::Ack(ack))) => {
                    handle_ack(settings, &ack);
                    outstanding -= 1;
                }
                Ok(Some(Inbound::Pong)) => {}
                Ok(None) => {
                    inbound.abort();
                    return Err(ProtocolError::ConnectionClosed);
                }
                Err(_) => break,
            }
        }

        if !sent_any {
            tokio::time::sleep(std::time::Duration::from_secs(settings.timetvl)).await;
            if shutdown.requested() {
                break Ok(());
            }
            if let Err(e) = activetest(writer, &mut rx, settings, &mut outstanding).await {
                break Err(e);
            }
        }
    };

    inbound.abort();
    // A stop request racing the stream teardown is still a clean stop.
    if shutdown.requested() {
        return Ok(());
    }
    result
}

/// Reader task: classify inbound control frames onto the channel.
async fn read_inbound<R>(mut reader: R, tx: mpsc::UnboundedSender<Inbound>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(frame) => frame,
            // Dropping the sender closes the channel; the main loop sees
            // Disconnected on its next poll.
            Err(_) => return,
        };
        let Ok(text) = String::from_utf8(frame) else {
            continue;
        };
        let inbound = match parse_control(&text) {
            Control::Ack(ack) => Inbound::Ack(ack),
            Control::ActiveReply => Inbound::Pong,
            _ => continue,
        };
        if tx.send(inbound).is_err() {
            return;
        }
    }
}

/// Announce one file and stream its body in `CHUNK`-sized data frames.
async fn send_one<W>(writer: &mut W, file: &FileEntry) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let meta = crate::message::FileMeta {
        filename: file.name.clone(),
        filesize: file.size,
        mtime: file.mtime.clone(),
    };
    write_text(writer, &meta.encode()).await?;

    let mut src = tokio::fs::File::open(&file.path).await?;
    let mut remaining = file.size as usize;
    let mut buf = vec![0u8; CHUNK];
    while remaining > 0 {
        let take = remaining.min(CHUNK);
        src.read_exact(&mut buf[..take]).await?;
        write_frame(writer, &buf[..take]).await?;
        remaining -= take;
    }
    Ok(())
}

/// Apply the source disposition for a successful ack.
///
/// A `failed` ack leaves the source file alone; the next enumeration pass
/// picks it up again. Disposition failures are logged, not fatal.
fn handle_ack(settings: &SenderSettings, ack: &Ack) {
    if !ack.ok {
        warn!(file = %ack.filename, "peer reported failure, keeping source");
        return;
    }
    let src = settings.root.join(&ack.filename);
    match settings.ptype {
        1 => {
            if let Err(e) = std::fs::remove_file(&src) {
                warn!(file = %src.display(), "remove after ack failed: {e}");
            }
        }
        2 => {
            let dst = settings.bak_root.join(&ack.filename);
            if let Err(e) = std::fs::rename(&src, &dst) {
                warn!(file = %src.display(), to = %dst.display(), "backup after ack failed: {e}");
            }
        }
        _ => {}
    }
}

/// Exchange a keepalive; failure to get the reply ends the session.
async fn activetest<W>(
    writer: &mut W,
    rx: &mut mpsc::UnboundedReceiver<Inbound>,
    settings: &SenderSettings,
    outstanding: &mut u64,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_text(writer, ACTIVETEST).await?;
    loop {
        match tokio::time::timeout(ACTIVETEST_TIMEOUT, rx.recv()).await {
            Ok(Some(Inbound::Pong)) => return Ok(()),
            // Late acks from the previous pass may still arrive.
            Ok(Some(Inbound::Ack(ack))) => {
                handle_ack(settings, &ack);
                *outstanding = outstanding.saturating_sub(1);
            }
            Ok(None) => return Err(ProtocolError::ConnectionClosed),
            Err(_) => return Err(ProtocolError::Timeout),
        }
    }
}
