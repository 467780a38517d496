// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job supervisor: spawn, wait, cool down, restart, forever.
//!
//! One supervisor owns exactly one child command. The supervisor swallows
//! the ordinary termination signals so a stray `kill` cannot take the
//! whole job down (only SIGKILL can); children run with closed standard
//! IO in their own process group so terminal disconnects do not cascade.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SuperviseError {
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

/// Run `program argv…` in a loop: wait for it to exit, sleep
/// `interval`, start it again. Never returns.
pub async fn supervise(
    interval: Duration,
    program: &str,
    argv: &[String],
) -> Result<(), SuperviseError> {
    ignore_termination().map_err(SuperviseError::Signals)?;

    loop {
        let mut cmd = std::process::Command::new(program);
        cmd.args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        match tokio::process::Command::from(cmd).spawn() {
            Ok(mut child) => {
                let pid = child.id().unwrap_or_default();
                info!(program, pid, "child started");
                match child.wait().await {
                    Ok(status) => info!(program, %status, "child exited"),
                    Err(e) => warn!(program, "waiting for child failed: {e}"),
                }
            }
            Err(e) => warn!(program, "spawn failed: {e}"),
        }

        tokio::time::sleep(interval).await;
    }
}

/// Swallow every ordinary termination signal. Installing a handler
/// replaces the default terminate disposition; the task just logs and
/// keeps listening.
fn ignore_termination() -> std::io::Result<()> {
    for kind in [
        SignalKind::interrupt(),
        SignalKind::terminate(),
        SignalKind::hangup(),
        SignalKind::quit(),
    ] {
        let mut stream = signal(kind)?;
        tokio::spawn(async move {
            loop {
                if stream.recv().await.is_none() {
                    break;
                }
                info!("supervisor ignoring termination signal");
            }
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
