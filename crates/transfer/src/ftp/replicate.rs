// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The replication runs: one pass each, any failure aborts the run (the
//! supervisor restarts it, and the bookmark keeps the restart cheap).

use std::collections::BTreeMap;

use tracing::info;

use dcx_core::fmatch::NameMatcher;
use dcx_core::fsutil::scan_dir;
use dcx_daemon::Heartbeat;

use super::bookmark;
use super::settings::{FtpGetConfig, FtpPutConfig};
use super::{FtpError, RemoteStore};

/// What one replication pass moved.
#[derive(Debug, Default)]
pub struct ReplicateReport {
    pub transferred: Vec<String>,
    /// Files skipped because the bookmark already covers them.
    pub kept: usize,
}

/// Remote → local.
///
/// ptype 1: incremental against the bookmark, optionally re-fetching
/// files whose remote mtime changed. ptype 2: fetch everything, delete
/// remote. ptype 3: fetch everything, rename remote into the backup root.
pub fn run_download(
    cfg: &FtpGetConfig,
    remote: &mut dyn RemoteStore,
    heartbeat: Option<&Heartbeat>,
) -> Result<ReplicateReport, FtpError> {
    let matcher = NameMatcher::new(&cfg.matchname)?;

    let mut listing: Vec<(String, String)> = Vec::new();
    for name in remote.list()? {
        if !matcher.matches(&name) {
            continue;
        }
        // The MDTM round trip per file is only worth it when the mtime
        // actually feeds the diff.
        let mtime = if cfg.ptype == 1 && cfg.checkmtime {
            remote.mtime(&name)?
        } else {
            String::new()
        };
        listing.push((name, mtime));
    }
    if let Some(hb) = heartbeat {
        hb.beat();
    }

    let mut report = ReplicateReport::default();
    let to_fetch = if cfg.ptype == 1 {
        let book = bookmark::load(&cfg.okfilename)?;
        let (kept, fetch) = partition(listing, &book, cfg.checkmtime);
        bookmark::rewrite(&cfg.okfilename, &kept)?;
        report.kept = kept.len();
        fetch
    } else {
        listing
    };

    fetch_all(cfg, remote, heartbeat, to_fetch, report)
}

fn fetch_all(
    cfg: &FtpGetConfig,
    remote: &mut dyn RemoteStore,
    heartbeat: Option<&Heartbeat>,
    to_fetch: Vec<(String, String)>,
    mut report: ReplicateReport,
) -> Result<ReplicateReport, FtpError> {
    for (name, mtime) in to_fetch {
        let local = cfg.localpath.join(&name);
        remote.download(&name, &local)?;
        info!(file = %name, "downloaded");

        match cfg.ptype {
            1 => bookmark::append(&cfg.okfilename, &name, &mtime)?,
            2 => remote.remove(&name)?,
            3 => remote.rename(&name, &format!("{}/{}", cfg.remotepathbak, name))?,
            _ => {}
        }
        report.transferred.push(name);
        if let Some(hb) = heartbeat {
            hb.beat();
        }
    }
    Ok(report)
}

/// Local → remote.
///
/// The local mtime is always at hand, so uploads always re-send files
/// that changed since they were bookmarked.
pub fn run_upload(
    cfg: &FtpPutConfig,
    remote: &mut dyn RemoteStore,
    heartbeat: Option<&Heartbeat>,
) -> Result<ReplicateReport, FtpError> {
    let matcher = NameMatcher::new(&cfg.matchname)?;
    let listing: Vec<(String, String)> = scan_dir(&cfg.localpath, &matcher, false, false)?
        .into_iter()
        .map(|e| (e.name, e.mtime))
        .collect();

    let mut report = ReplicateReport::default();
    let to_send = if cfg.ptype == 1 {
        let book = bookmark::load(&cfg.okfilename)?;
        let (kept, send) = partition(listing, &book, true);
        bookmark::rewrite(&cfg.okfilename, &kept)?;
        report.kept = kept.len();
        send
    } else {
        listing
    };

    for (name, mtime) in to_send {
        let local = cfg.localpath.join(&name);
        remote.upload(&local, &name)?;
        info!(file = %name, "uploaded");

        match cfg.ptype {
            1 => bookmark::append(&cfg.okfilename, &name, &mtime)?,
            2 => std::fs::remove_file(&local)?,
            3 => std::fs::rename(&local, cfg.localpathbak.join(&name))?,
            _ => {}
        }
        report.transferred.push(name);
        if let Some(hb) = heartbeat {
            hb.beat();
        }
    }
    Ok(report)
}

/// Split a listing into (kept, transfer) against the bookmark.
///
/// A file is kept when the bookmark knows it and, if mtimes are being
/// checked, the mtime is unchanged.
fn partition(
    listing: Vec<(String, String)>,
    book: &BTreeMap<String, String>,
    check_mtime: bool,
) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let mut kept = Vec::new();
    let mut transfer = Vec::new();
    for (name, mtime) in listing {
        match book.get(&name) {
            Some(booked) if !check_mtime || *booked == mtime => kept.push((name, mtime)),
            _ => transfer.push((name, mtime)),
        }
    }
    (kept, transfer)
}

#[cfg(test)]
#[path = "replicate_tests.rs"]
mod tests;
