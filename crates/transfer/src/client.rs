// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push and pull transfer clients.
//!
//! Both connect, send the login payload (the whole config string plus
//! `<clienttype>`), and check the server's verdict before settling into
//! their role for the life of the connection.

use tokio::net::TcpStream;
use tracing::info;

use dcx_daemon::{Heartbeat, Shutdown};

use crate::frame::{read_text, write_text, ProtocolError};
use crate::message::LOGIN_OK;
use crate::receiver::run_receiver;
use crate::sender::{run_sender, SenderSettings};
use crate::settings::TransferJob;

/// Upload files from `clientpath` to the server (clienttype 2).
pub async fn run_push(
    job: &TransferJob,
    heartbeat: Option<&Heartbeat>,
    shutdown: &Shutdown,
) -> Result<(), ProtocolError> {
    let stream = TcpStream::connect((job.ip.as_str(), job.port)).await?;
    let (mut reader, mut writer) = stream.into_split();

    login(&mut reader, &mut writer, job).await?;

    let settings = SenderSettings {
        root: job.clientpath.clone(),
        bak_root: job.clientpathbak.clone(),
        ptype: job.ptype,
        matchname: job.matchname.clone(),
        recurse: job.andchild,
        timetvl: job.timetvl,
    };
    run_sender(reader, &mut writer, &settings, heartbeat, shutdown).await
}

/// Download files from the server into `clientpath` (clienttype 1).
pub async fn run_pull(
    job: &TransferJob,
    heartbeat: Option<&Heartbeat>,
    shutdown: &Shutdown,
) -> Result<(), ProtocolError> {
    let stream = TcpStream::connect((job.ip.as_str(), job.port)).await?;
    let (mut reader, mut writer) = stream.into_split();

    login(&mut reader, &mut writer, job).await?;

    run_receiver(&mut reader, &mut writer, &job.clientpath, heartbeat, shutdown).await
}

async fn login<R, W>(reader: &mut R, writer: &mut W, job: &TransferJob) -> Result<(), ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    write_text(writer, &job.login_payload()).await?;
    let reply = read_text(reader).await?;
    if reply != LOGIN_OK {
        return Err(ProtocolError::LoginRejected);
    }
    info!(pname = %job.pname, "login success");
    Ok(())
}
