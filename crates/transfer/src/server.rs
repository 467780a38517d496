// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transfer server.
//!
//! Accepts connections and serves each session on its own task (the
//! parent goes straight back to accepting). A session starts with the
//! client's login payload; the server adopts the session parameters from
//! it, answers `success` or `failed`, and then plays the opposite role of
//! the client for the rest of the connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use dcx_daemon::{Heartbeat, Shutdown};

use crate::frame::{read_text_timeout, write_text, ProtocolError};
use crate::message::{LOGIN_FAILED, LOGIN_OK};
use crate::sender::{run_sender, SenderSettings};
use crate::receiver::run_receiver;
use crate::settings::{TransferJob, CLIENT_PULL, CLIENT_PUSH};

/// How long a freshly-accepted connection gets to present its login.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Accept and serve sessions until shutdown.
pub async fn run_server(
    listener: TcpListener,
    heartbeat: Option<Arc<Heartbeat>>,
    shutdown: Shutdown,
) -> Result<(), ProtocolError> {
    info!(addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(), "listening");

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = shutdown.wait() => {
                info!("server stopping");
                return Ok(());
            }
        };
        info!(%peer, "accepted client");
        if let Some(hb) = heartbeat.as_ref() {
            hb.beat();
        }

        let session_shutdown = shutdown.clone();
        let session_heartbeat = heartbeat.clone();
        tokio::spawn(async move {
            match serve_session(stream, session_heartbeat, session_shutdown).await {
                Ok(()) => info!(%peer, "session ended"),
                Err(e) => warn!(%peer, "session failed: {e}"),
            }
        });
    }
}

/// One client connection: login, then sender or receiver role.
async fn serve_session(
    stream: TcpStream,
    heartbeat: Option<Arc<Heartbeat>>,
    shutdown: Shutdown,
) -> Result<(), ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();

    let login = read_text_timeout(&mut reader, LOGIN_TIMEOUT).await?;
    let job = TransferJob::from_login(&login);

    if job.clienttype != CLIENT_PULL && job.clienttype != CLIENT_PUSH {
        warn!(clienttype = job.clienttype, "illegal client type");
        write_text(&mut writer, LOGIN_FAILED).await?;
        return Ok(());
    }
    write_text(&mut writer, LOGIN_OK).await?;
    info!(pname = %job.pname, clienttype = job.clienttype, "client login");

    if job.clienttype == CLIENT_PULL {
        // Client downloads: this side sends from srvpath.
        let settings = SenderSettings {
            root: job.srvpath.clone(),
            bak_root: job.srvpathbak.clone(),
            ptype: job.ptype,
            matchname: job.matchname.clone(),
            recurse: job.andchild,
            timetvl: job.timetvl.max(1),
        };
        run_sender(
            reader,
            &mut writer,
            &settings,
            heartbeat.as_deref(),
            &shutdown,
        )
        .await
    } else {
        // Client uploads: this side receives into srvpath.
        run_receiver(
            &mut reader,
            &mut writer,
            &job.srvpath,
            heartbeat.as_deref(),
            &shutdown,
        )
        .await
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
