// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative shutdown signalling.
//!
//! Daemons never exit from inside a signal handler. SIGINT/SIGTERM set a
//! shared flag that every blocking loop samples between iterations, so a
//! stop lands at a batch boundary with connections and files closed
//! cleanly. Loops that block on the network race their IO against
//! [`Shutdown::wait`] instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::info;

/// Shared stop-requested flag.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install SIGINT/SIGTERM listeners that trip the flag.
    ///
    /// Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        let shutdown = Self::new();

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let flag = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, stopping after current work"),
                _ = sigint.recv() => info!("received SIGINT, stopping after current work"),
            }
            flag.trigger();
        });

        Ok(shutdown)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve once a stop has been requested.
    pub async fn wait(&self) {
        while !self.requested() {
            self.notify.notified().await;
        }
    }
}
