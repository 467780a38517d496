// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process heartbeat registry and liveness scanner.
//!
//! Every daemon registers itself with a process name and a timeout, then
//! beats at progress boundaries (between files, between batches). The
//! scanner terminates processes whose last beat is older than their
//! declared timeout and reaps entries whose pid no longer exists.
//!
//! The registry is a JSON file guarded by an exclusive `fs2` lock. Each
//! entry is written only by the process that owns it; the scanner is the
//! only party that removes foreign entries, and only after a liveness
//! probe fails. The scanner always acts on a snapshot of an entry taken
//! under the lock, never on the live table, so an owner exiting between
//! the decision to kill and the kill cannot redirect the signal.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Registry capacity. Registration fails once the table is full.
pub const MAX_ENTRIES: usize = 1000;

/// Longest accepted process name.
pub const MAX_PNAME: usize = 64;

/// Grace period between SIGTERM and SIGKILL, polled once per second.
const TERM_GRACE_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry is full ({MAX_ENTRIES} entries)")]
    Full,
}

/// One process's liveness record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub pname: String,
    /// Unix seconds when the process registered.
    pub start_time: i64,
    /// Unix seconds of the most recent beat. Monotonically non-decreasing.
    pub last_beat: i64,
    pub timeout_sec: i64,
}

/// What one scan did.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Entries removed because their pid no longer exists.
    pub stale: Vec<ProcessInfo>,
    /// Timed-out processes that exited after SIGTERM.
    pub terminated: Vec<ProcessInfo>,
    /// Timed-out processes that had to be SIGKILLed; entries removed.
    pub killed: Vec<ProcessInfo>,
}

/// Handle to the registry file.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    /// Registry at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry at the environment-selected path.
    ///
    /// `DCX_HEARTBEAT_FILE` takes priority (used by tests for isolation),
    /// then `$DCX_STATE_DIR`, `$XDG_STATE_HOME/dcx`, `~/.local/state/dcx`.
    pub fn from_env() -> Self {
        if let Ok(path) = std::env::var("DCX_HEARTBEAT_FILE") {
            return Self::at(path);
        }
        Self::at(state_dir().join("heartbeat.json"))
    }

    /// Register the calling process. Idempotent when the same pid
    /// re-registers. The returned [`Heartbeat`] deregisters on drop.
    pub fn register(&self, pname: &str, timeout_sec: i64) -> Result<Heartbeat, RegistryError> {
        let pid = std::process::id();
        let mut pname = pname.to_string();
        pname.truncate(MAX_PNAME);
        let now = unix_now();

        self.with_table(|table| {
            if !table.contains_key(&key(pid)) && table.len() >= MAX_ENTRIES {
                return Err(RegistryError::Full);
            }
            table.insert(
                key(pid),
                ProcessInfo {
                    pid,
                    pname: pname.clone(),
                    start_time: now,
                    last_beat: now,
                    timeout_sec,
                },
            );
            Ok(())
        })??;

        Ok(Heartbeat {
            registry: self.clone(),
            pid,
        })
    }

    /// Scan all entries: reap the stale, escalate on the timed-out.
    pub fn scan(&self) -> Result<ScanReport, RegistryError> {
        let mut report = ScanReport::default();

        // Pass 1 (under the lock): remove dead pids, snapshot the rest.
        let snapshot = self.with_table(|table| {
            let mut live = Vec::new();
            table.retain(|_, entry| {
                if process_exists(entry.pid) {
                    live.push(entry.clone());
                    true
                } else {
                    info!(pid = entry.pid, pname = %entry.pname, "process not exist");
                    report.stale.push(entry.clone());
                    false
                }
            });
            live
        })?;

        // Pass 2 (no lock held): act on the snapshots.
        let now = unix_now();
        for entry in snapshot {
            if now - entry.last_beat < entry.timeout_sec {
                continue;
            }
            // The entry is a local copy; the owner may exit concurrently,
            // in which case the signals fail harmlessly with ESRCH.
            info!(pid = entry.pid, pname = %entry.pname, "process timeout");
            let pid = Pid::from_raw(entry.pid as i32);
            let _ = kill(pid, Signal::SIGTERM);

            let mut gone = false;
            for _ in 0..TERM_GRACE_SECS {
                std::thread::sleep(Duration::from_secs(1));
                if !process_exists(entry.pid) {
                    gone = true;
                    break;
                }
            }

            if gone {
                // The dying process deregisters itself; the next scan
                // reaps the entry if it could not.
                info!(pid = entry.pid, pname = %entry.pname, "process terminated");
                report.terminated.push(entry);
            } else {
                let _ = kill(pid, Signal::SIGKILL);
                warn!(pid = entry.pid, pname = %entry.pname, "process killed");
                self.with_table(|table| {
                    table.remove(&key(entry.pid));
                })?;
                report.killed.push(entry);
            }
        }

        Ok(report)
    }

    /// All current entries (for tests and diagnostics).
    pub fn entries(&self) -> Result<Vec<ProcessInfo>, RegistryError> {
        self.with_table(|table| table.values().cloned().collect())
    }

    fn beat(&self, pid: u32) -> Result<(), RegistryError> {
        let now = unix_now();
        self.with_table(|table| {
            if let Some(entry) = table.get_mut(&key(pid)) {
                entry.last_beat = entry.last_beat.max(now);
            }
        })
    }

    fn deregister(&self, pid: u32) -> Result<(), RegistryError> {
        self.with_table(|table| {
            table.remove(&key(pid));
        })
    }

    /// Run `f` over the table with the registry file exclusively locked,
    /// then persist the (possibly mutated) table in place.
    fn with_table<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, ProcessInfo>) -> T,
    ) -> Result<T, RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let mut table: BTreeMap<String, ProcessInfo> = if contents.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&contents).unwrap_or_default()
        };

        let result = f(&mut table);

        let serialized = serde_json::to_vec(&table)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&serialized)?;
        // Lock released when `file` drops.
        Ok(result)
    }
}

/// A registered process's beat handle. Dropping it deregisters the entry
/// (best-effort, matching shutdown paths that may race the scanner).
#[derive(Debug)]
pub struct Heartbeat {
    registry: Registry,
    pid: u32,
}

impl Heartbeat {
    /// Stamp `last_beat = now` for the owning process.
    pub fn beat(&self) {
        if let Err(e) = self.registry.beat(self.pid) {
            warn!("heartbeat update failed: {e}");
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        let _ = self.registry.deregister(self.pid);
    }
}

/// Signal-0 liveness probe.
fn process_exists(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

fn key(pid: u32) -> String {
    pid.to_string()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// State directory for dcx.
fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DCX_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("dcx");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".local/state/dcx")
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
