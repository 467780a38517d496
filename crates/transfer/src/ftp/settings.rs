// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FTP replicator parameters.

use std::path::PathBuf;

use dcx_core::config::{require_tag, tag_bool, tag_str, tag_u64, ConfigError};

/// Download run: remote → local.
#[derive(Debug, Clone)]
pub struct FtpGetConfig {
    pub host: String,
    /// 1 = passive (default), 2 = active.
    pub mode: u64,
    pub username: String,
    pub password: String,
    pub remotepath: String,
    pub localpath: PathBuf,
    pub matchname: String,
    /// Remote disposition: 1 none (incremental), 2 delete, 3 backup.
    pub ptype: u64,
    pub remotepathbak: String,
    pub okfilename: PathBuf,
    pub checkmtime: bool,
    pub timeout: u64,
    pub pname: String,
}

impl FtpGetConfig {
    pub fn parse(xml: &str) -> Result<Self, ConfigError> {
        let ptype = tag_u64(xml, "ptype").unwrap_or(0);
        if !(1..=3).contains(&ptype) {
            return Err(ConfigError::Invalid {
                tag: "ptype",
                value: tag_str(xml, "ptype").unwrap_or_default(),
            });
        }

        let cfg = Self {
            host: require_tag(xml, "host")?,
            mode: match tag_u64(xml, "mode") {
                Some(2) => 2,
                _ => 1,
            },
            username: require_tag(xml, "username")?,
            password: require_tag(xml, "password")?,
            remotepath: require_tag(xml, "remotepath")?,
            localpath: PathBuf::from(require_tag(xml, "localpath")?),
            matchname: require_tag(xml, "matchname")?,
            ptype,
            remotepathbak: if ptype == 3 {
                require_tag(xml, "remotepathbak")?
            } else {
                tag_str(xml, "remotepathbak").unwrap_or_default()
            },
            okfilename: if ptype == 1 {
                PathBuf::from(require_tag(xml, "okfilename")?)
            } else {
                PathBuf::from(tag_str(xml, "okfilename").unwrap_or_default())
            },
            checkmtime: tag_bool(xml, "checkmtime"),
            timeout: tag_u64(xml, "timeout").ok_or(ConfigError::Missing("timeout"))?,
            pname: tag_str(xml, "pname").unwrap_or_default(),
        };
        Ok(cfg)
    }
}

/// Upload run: local → remote.
#[derive(Debug, Clone)]
pub struct FtpPutConfig {
    pub host: String,
    pub mode: u64,
    pub username: String,
    pub password: String,
    pub remotepath: String,
    pub localpath: PathBuf,
    pub matchname: String,
    /// Local disposition: 1 none (incremental), 2 delete, 3 backup.
    pub ptype: u64,
    pub localpathbak: PathBuf,
    pub okfilename: PathBuf,
    pub timeout: u64,
    pub pname: String,
}

impl FtpPutConfig {
    pub fn parse(xml: &str) -> Result<Self, ConfigError> {
        let ptype = tag_u64(xml, "ptype").unwrap_or(0);
        if !(1..=3).contains(&ptype) {
            return Err(ConfigError::Invalid {
                tag: "ptype",
                value: tag_str(xml, "ptype").unwrap_or_default(),
            });
        }

        let cfg = Self {
            host: require_tag(xml, "host")?,
            mode: match tag_u64(xml, "mode") {
                Some(2) => 2,
                _ => 1,
            },
            username: require_tag(xml, "username")?,
            password: require_tag(xml, "password")?,
            remotepath: require_tag(xml, "remotepath")?,
            localpath: PathBuf::from(require_tag(xml, "localpath")?),
            matchname: require_tag(xml, "matchname")?,
            ptype,
            localpathbak: if ptype == 3 {
                PathBuf::from(require_tag(xml, "localpathbak")?)
            } else {
                PathBuf::from(tag_str(xml, "localpathbak").unwrap_or_default())
            },
            okfilename: if ptype == 1 {
                PathBuf::from(require_tag(xml, "okfilename")?)
            } else {
                PathBuf::from(tag_str(xml, "okfilename").unwrap_or_default())
            },
            timeout: tag_u64(xml, "timeout").ok_or(ConfigError::Missing("timeout"))?,
            pname: tag_str(xml, "pname").unwrap_or_default(),
        };
        Ok(cfg)
    }
}
