// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sender/receiver sessions wired back-to-back over in-memory streams.

use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;
use tokio::io::split;

use dcx_daemon::Shutdown;

use crate::sender::{run_sender, SenderSettings};

use super::run_receiver;

fn settings(root: &Path, bak: &Path, ptype: u64) -> SenderSettings {
    SenderSettings {
        root: root.to_path_buf(),
        bak_root: bak.to_path_buf(),
        ptype,
        matchname: "*".to_string(),
        recurse: false,
        timetvl: 1,
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

/// Chunk-boundary and small/empty payloads, byte-identity, advertised
/// mtime, and delete-on-ack disposition.
#[tokio::test]
async fn pipelined_transfer_delivers_all_files() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let bak = tempdir().unwrap();

    let sizes = [0usize, 1, 1023, 1024, 1025, 5000];
    for (i, size) in sizes.iter().enumerate() {
        let body: Vec<u8> = (0..*size).map(|b| (b % 251) as u8).collect();
        let path = src.path().join(format!("file_{i}.dat"));
        std::fs::write(&path, &body).unwrap();
        dcx_core::fsutil::set_mtime_compact(&path, "20240519162835").unwrap();
    }

    let (a, b) = tokio::io::duplex(64 * 1024);
    let (send_r, mut send_w) = split(a);
    let (mut recv_r, mut recv_w) = split(b);

    let shutdown = Shutdown::new();
    let recv_shutdown = shutdown.clone();
    let dest_root = dst.path().to_path_buf();
    let receiver = tokio::spawn(async move {
        run_receiver(&mut recv_r, &mut recv_w, &dest_root, None, &recv_shutdown).await
    });

    let send_settings = settings(src.path(), bak.path(), 1);
    let send_shutdown = shutdown.clone();
    let sender = tokio::spawn(async move {
        run_sender(send_r, &mut send_w, &send_settings, None, &send_shutdown).await
    });

    // Everything lands byte-identical, and the delete disposition clears
    // the source directory.
    let dst_path = dst.path().to_path_buf();
    let src_path = src.path().to_path_buf();
    wait_until(|| {
        (0..sizes.len()).all(|i| dst_path.join(format!("file_{i}.dat")).exists())
            && (0..sizes.len()).all(|i| !src_path.join(format!("file_{i}.dat")).exists())
    })
    .await;

    for (i, size) in sizes.iter().enumerate() {
        let body = std::fs::read(dst.path().join(format!("file_{i}.dat"))).unwrap();
        assert_eq!(body.len(), *size, "file_{i} size");
        let expect: Vec<u8> = (0..*size).map(|b| (b % 251) as u8).collect();
        assert_eq!(body, expect, "file_{i} contents");

        let matcher = dcx_core::fmatch::NameMatcher::new(&format!("file_{i}.dat")).unwrap();
        let entry = dcx_core::fsutil::scan_dir(dst.path(), &matcher, false, false)
            .unwrap()
            .remove(0);
        assert_eq!(entry.mtime, "20240519162835", "file_{i} mtime restored");
    }

    shutdown.trigger();
    sender.await.unwrap().unwrap();
    receiver.await.unwrap().unwrap();
}

/// ptype = 2 moves acknowledged sources to the backup root.
#[tokio::test]
async fn success_ack_backs_up_source() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let bak = tempdir().unwrap();
    std::fs::write(src.path().join("keep.xml"), b"payload").unwrap();

    let (a, b) = tokio::io::duplex(64 * 1024);
    let (send_r, mut send_w) = split(a);
    let (mut recv_r, mut recv_w) = split(b);

    let shutdown = Shutdown::new();
    let recv_shutdown = shutdown.clone();
    let dest_root = dst.path().to_path_buf();
    let receiver = tokio::spawn(async move {
        run_receiver(&mut recv_r, &mut recv_w, &dest_root, None, &recv_shutdown).await
    });

    let send_settings = settings(src.path(), bak.path(), 2);
    let send_shutdown = shutdown.clone();
    let sender = tokio::spawn(async move {
        run_sender(send_r, &mut send_w, &send_settings, None, &send_shutdown).await
    });

    let bak_file = bak.path().join("keep.xml");
    wait_until(|| bak_file.exists()).await;
    assert!(!src.path().join("keep.xml").exists());
    assert!(dst.path().join("keep.xml").exists());

    shutdown.trigger();
    sender.await.unwrap().unwrap();
    receiver.await.unwrap().unwrap();
}

/// A file the receiver cannot land is acked `failed`: the source stays
/// put and the session keeps serving subsequent files.
#[tokio::test]
async fn failed_ack_keeps_source_and_session() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let bak = tempdir().unwrap();

    std::fs::write(src.path().join("victim.dat"), b"abc").unwrap();

    let (a, b) = tokio::io::duplex(64 * 1024);
    let (send_r, mut send_w) = split(a);
    let (mut recv_r, mut recv_w) = split(b);

    let shutdown = Shutdown::new();
    // Destination is a *file*, so every create-under-it fails.
    let bogus_root = dst.path().join("not_a_dir");
    std::fs::write(&bogus_root, b"x").unwrap();

    let recv_shutdown = shutdown.clone();
    let dest_root = bogus_root.clone();
    let receiver = tokio::spawn(async move {
        run_receiver(&mut recv_r, &mut recv_w, &dest_root, None, &recv_shutdown).await
    });

    let send_settings = settings(src.path(), bak.path(), 1);
    let send_shutdown = shutdown.clone();
    let sender = tokio::spawn(async move {
        run_sender(send_r, &mut send_w, &send_settings, None, &send_shutdown).await
    });

    // Give the session a few passes: the file is offered repeatedly,
    // acked failed each time, and never deleted.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(src.path().join("victim.dat").exists());

    shutdown.trigger();
    sender.await.unwrap().unwrap();
    receiver.await.unwrap().unwrap();
}

/// An idle sender exchanges keepalives instead of file traffic.
#[tokio::test]
async fn idle_session_stays_alive_on_keepalives() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let bak = tempdir().unwrap();

    let (a, b) = tokio::io::duplex(4096);
    let (send_r, mut send_w) = split(a);
    let (mut recv_r, mut recv_w) = split(b);

    let shutdown = Shutdown::new();
    let recv_shutdown = shutdown.clone();
    let dest_root = dst.path().to_path_buf();
    let receiver = tokio::spawn(async move {
        run_receiver(&mut recv_r, &mut recv_w, &dest_root, None, &recv_shutdown).await
    });

    let send_settings = settings(src.path(), bak.path(), 1);
    let send_shutdown = shutdown.clone();
    let sender = tokio::spawn(async move {
        run_sender(send_r, &mut send_w, &send_settings, None, &send_shutdown).await
    });

    // Long enough for at least one sleep + activetest exchange.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!sender.is_finished(), "sender must survive idle passes");
    assert!(!receiver.is_finished(), "receiver must survive idle passes");

    shutdown.trigger();
    sender.await.unwrap().unwrap();
    receiver.await.unwrap().unwrap();
}

/// A dropped peer ends the sender with a stream-level error.
#[tokio::test]
async fn dropped_peer_is_terminal_for_sender() {
    let src = tempdir().unwrap();
    let bak = tempdir().unwrap();
    std::fs::write(src.path().join("f.dat"), b"data").unwrap();

    let (a, b) = tokio::io::duplex(4096);
    let (send_r, mut send_w) = split(a);
    drop(b);

    let shutdown = Shutdown::new();
    let send_settings = settings(src.path(), bak.path(), 1);
    let result = run_sender(send_r, &mut send_w, &send_settings, None, &shutdown).await;
    assert!(result.is_err(), "write into a dropped peer must fail");
}
