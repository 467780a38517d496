// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;
use tempfile::tempdir;

/// In-memory remote recording every operation.
#[derive(Default)]
struct FakeRemote {
    /// name → (mtime, contents)
    files: std::collections::BTreeMap<String, (String, Vec<u8>)>,
    downloads: Vec<String>,
    uploads: Vec<String>,
    removed: Vec<String>,
    renamed: Vec<(String, String)>,
}

impl FakeRemote {
    fn with_files(entries: &[(&str, &str, &[u8])]) -> Self {
        let mut fake = Self::default();
        for (name, mtime, body) in entries {
            fake.files
                .insert(name.to_string(), (mtime.to_string(), body.to_vec()));
        }
        fake
    }
}

impl RemoteStore for FakeRemote {
    fn list(&mut self) -> Result<Vec<String>, FtpError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn mtime(&mut self, name: &str) -> Result<String, FtpError> {
        self.files
            .get(name)
            .map(|(mtime, _)| mtime.clone())
            .ok_or_else(|| {
                FtpError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    name.to_string(),
                ))
            })
    }

    fn download(&mut self, name: &str, local: &Path) -> Result<(), FtpError> {
        let (_, body) = self.files.get(name).ok_or_else(|| {
            FtpError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                name.to_string(),
            ))
        })?;
        std::fs::write(local, body)?;
        self.downloads.push(name.to_string());
        Ok(())
    }

    fn upload(&mut self, local: &Path, name: &str) -> Result<(), FtpError> {
        let body = std::fs::read(local)?;
        self.files
            .insert(name.to_string(), (String::new(), body));
        self.uploads.push(name.to_string());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), FtpError> {
        self.files.remove(name);
        self.removed.push(name.to_string());
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FtpError> {
        if let Some(entry) = self.files.remove(from) {
            self.files.insert(to.to_string(), entry);
        }
        self.renamed.push((from.to_string(), to.to_string()));
        Ok(())
    }
}

fn get_config(local: &Path, book: &Path, ptype: u64, checkmtime: bool) -> FtpGetConfig {
    FtpGetConfig {
        host: "127.0.0.1:21".to_string(),
        mode: 1,
        username: "u".to_string(),
        password: "p".to_string(),
        remotepath: "/srv/out".to_string(),
        localpath: local.to_path_buf(),
        matchname: "*.TXT".to_string(),
        ptype,
        remotepathbak: "/srv/out_bak".to_string(),
        okfilename: book.to_path_buf(),
        checkmtime,
        timeout: 30,
        pname: "ftpget_test".to_string(),
    }
}

fn put_config(local: &Path, bak: &Path, book: &Path, ptype: u64) -> FtpPutConfig {
    FtpPutConfig {
        host: "127.0.0.1:21".to_string(),
        mode: 1,
        username: "u".to_string(),
        password: "p".to_string(),
        remotepath: "/srv/in".to_string(),
        localpath: local.to_path_buf(),
        matchname: "*.TXT".to_string(),
        ptype,
        localpathbak: bak.to_path_buf(),
        okfilename: book.to_path_buf(),
        timeout: 30,
        pname: "ftpput_test".to_string(),
    }
}

#[test]
fn incremental_download_then_resume() {
    let dir = tempdir().unwrap();
    let local = dir.path().join("in");
    std::fs::create_dir(&local).unwrap();
    let book = dir.path().join("book.xml");

    let mut remote = FakeRemote::with_files(&[
        ("a.txt", "20240519100000", b"aaa"),
        ("b.txt", "20240519110000", b"bbb"),
        ("c.txt", "20240519120000", b"ccc"),
        ("skip.dat", "20240519130000", b"ddd"),
    ]);

    let cfg = get_config(&local, &book, 1, true);
    let report = run_download(&cfg, &mut remote, None).unwrap();

    // Three matches downloaded, the non-matching file untouched.
    assert_eq!(report.transferred.len(), 3);
    assert_eq!(report.kept, 0);
    assert!(local.join("a.txt").exists());
    assert!(!local.join("skip.dat").exists());
    assert_eq!(bookmark::load(&book).unwrap().len(), 3);

    // Second run: nothing new, bookmark intact.
    let report = run_download(&cfg, &mut remote, None).unwrap();
    assert!(report.transferred.is_empty());
    assert_eq!(report.kept, 3);
    assert_eq!(bookmark::load(&book).unwrap().len(), 3);

    // Touch one remote file: exactly one re-download, bookmark still 3.
    if let Some((mtime, _)) = remote.files.get_mut("b.txt") {
        *mtime = "20240520000000".to_string();
    }
    let report = run_download(&cfg, &mut remote, None).unwrap();
    assert_eq!(report.transferred, vec!["b.txt".to_string()]);
    assert_eq!(report.kept, 2);
    let map = bookmark::load(&book).unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map["b.txt"], "20240520000000");
}

#[test]
fn deleted_bookmark_causes_full_redownload() {
    let dir = tempdir().unwrap();
    let local = dir.path().join("in");
    std::fs::create_dir(&local).unwrap();
    let book = dir.path().join("book.xml");

    let mut remote = FakeRemote::with_files(&[
        ("a.txt", "1", b"a"),
        ("b.txt", "2", b"b"),
        ("c.txt", "3", b"c"),
    ]);
    let cfg = get_config(&local, &book, 1, false);

    assert_eq!(run_download(&cfg, &mut remote, None).unwrap().transferred.len(), 3);
    std::fs::remove_file(&book).unwrap();
    assert_eq!(run_download(&cfg, &mut remote, None).unwrap().transferred.len(), 3);
}

#[test]
fn without_mtime_check_presence_is_enough() {
    let dir = tempdir().unwrap();
    let local = dir.path().join("in");
    std::fs::create_dir(&local).unwrap();
    let book = dir.path().join("book.xml");

    let mut remote = FakeRemote::with_files(&[("a.txt", "1", b"a")]);
    let cfg = get_config(&local, &book, 1, false);

    run_download(&cfg, &mut remote, None).unwrap();
    if let Some((mtime, _)) = remote.files.get_mut("a.txt") {
        *mtime = "999".to_string();
    }

    let report = run_download(&cfg, &mut remote, None).unwrap();
    assert!(report.transferred.is_empty(), "mtime ignored when unchecked");
}

#[test]
fn full_download_with_remote_delete() {
    let dir = tempdir().unwrap();
    let local = dir.path().join("in");
    std::fs::create_dir(&local).unwrap();

    let mut remote = FakeRemote::with_files(&[("a.txt", "1", b"a"), ("b.txt", "2", b"b")]);
    let cfg = get_config(&local, &dir.path().join("unused.xml"), 2, false);

    let report = run_download(&cfg, &mut remote, None).unwrap();
    assert_eq!(report.transferred.len(), 2);
    assert_eq!(remote.removed.len(), 2);
    assert!(remote.files.is_empty());
}

#[test]
fn full_download_with_remote_backup() {
    let dir = tempdir().unwrap();
    let local = dir.path().join("in");
    std::fs::create_dir(&local).unwrap();

    let mut remote = FakeRemote::with_files(&[("a.txt", "1", b"a")]);
    let cfg = get_config(&local, &dir.path().join("unused.xml"), 3, false);

    run_download(&cfg, &mut remote, None).unwrap();
    assert_eq!(
        remote.renamed,
        vec![("a.txt".to_string(), "/srv/out_bak/a.txt".to_string())]
    );
}

#[test]
fn failed_download_aborts_the_run() {
    let dir = tempdir().unwrap();
    // Local root does not exist: the first write fails and aborts.
    let local = dir.path().join("missing");
    let book = dir.path().join("book.xml");

    let mut remote = FakeRemote::with_files(&[("a.txt", "1", b"a"), ("b.txt", "2", b"b")]);
    let cfg = get_config(&local, &book, 1, false);

    assert!(run_download(&cfg, &mut remote, None).is_err());
    // Nothing landed, so nothing was appended past the rewrite.
    assert!(bookmark::load(&book).unwrap().is_empty());
}

#[test]
fn incremental_upload_reuploads_modified_files() {
    let dir = tempdir().unwrap();
    let local = dir.path().join("out");
    let bak = dir.path().join("out_bak");
    std::fs::create_dir(&local).unwrap();
    std::fs::create_dir(&bak).unwrap();
    let book = dir.path().join("book.xml");

    std::fs::write(local.join("a.txt"), b"a1").unwrap();
    std::fs::write(local.join("b.txt"), b"b1").unwrap();
    dcx_core::fsutil::set_mtime_compact(&local.join("a.txt"), "20240519100000").unwrap();
    dcx_core::fsutil::set_mtime_compact(&local.join("b.txt"), "20240519100000").unwrap();

    let mut remote = FakeRemote::default();
    let cfg = put_config(&local, &bak, &book, 1);

    let report = run_upload(&cfg, &mut remote, None).unwrap();
    assert_eq!(report.transferred.len(), 2);
    assert_eq!(remote.uploads.len(), 2);

    // Unchanged files stay put on the second run.
    let report = run_upload(&cfg, &mut remote, None).unwrap();
    assert!(report.transferred.is_empty());
    assert_eq!(report.kept, 2);

    // A modified local file goes out again.
    std::fs::write(local.join("a.txt"), b"a2").unwrap();
    dcx_core::fsutil::set_mtime_compact(&local.join("a.txt"), "20240520000000").unwrap();
    let report = run_upload(&cfg, &mut remote, None).unwrap();
    assert_eq!(report.transferred, vec!["a.txt".to_string()]);
    assert_eq!(remote.files["a.txt"].1, b"a2");
}

#[test]
fn upload_dispositions_delete_or_backup_local() {
    let dir = tempdir().unwrap();
    let local = dir.path().join("out");
    let bak = dir.path().join("out_bak");
    std::fs::create_dir(&local).unwrap();
    std::fs::create_dir(&bak).unwrap();

    std::fs::write(local.join("gone.txt"), b"x").unwrap();
    let mut remote = FakeRemote::default();
    let cfg = put_config(&local, &bak, &dir.path().join("u.xml"), 2);
    run_upload(&cfg, &mut remote, None).unwrap();
    assert!(!local.join("gone.txt").exists());

    std::fs::write(local.join("saved.txt"), b"y").unwrap();
    let cfg = put_config(&local, &bak, &dir.path().join("u.xml"), 3);
    run_upload(&cfg, &mut remote, None).unwrap();
    assert!(!local.join("saved.txt").exists());
    assert!(bak.join("saved.txt").exists());
}
