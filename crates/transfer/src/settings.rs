// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer job parameters.
//!
//! Clients validate their own config string, then echo the whole string
//! to the server at login; the server adopts the session parameters from
//! the login payload without re-validating (the client already did).

use std::path::PathBuf;

use dcx_core::config::{require_tag, tag_bool, tag_str, tag_u16, tag_u64, ConfigError};

/// Scan interval ceiling; there is no point polling slower than this.
pub const MAX_TIMETVL: u64 = 30;

/// Pull session: server sends, client receives.
pub const CLIENT_PULL: u64 = 1;

/// Push session: client sends, server receives.
pub const CLIENT_PUSH: u64 = 2;

/// Parameters of one transfer session, from either a client config
/// string or a server-side login payload.
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// The raw config string, echoed verbatim at login.
    pub raw: String,
    /// 1 = pull (server sends), 2 = push (client sends).
    pub clienttype: u64,
    pub ip: String,
    pub port: u16,
    /// Source disposition after a successful ack: 1 delete, 2 backup.
    pub ptype: u64,
    pub srvpath: PathBuf,
    pub srvpathbak: PathBuf,
    pub clientpath: PathBuf,
    pub clientpathbak: PathBuf,
    /// Recurse into subdirectories of the sending root.
    pub andchild: bool,
    pub matchname: String,
    /// Seconds between scan passes when the sender found nothing.
    pub timetvl: u64,
    /// Heartbeat timeout for the daemon.
    pub timeout: u64,
    pub pname: String,
}

impl TransferJob {
    /// Parse and validate a push client (upload) config string.
    pub fn parse_push(xml: &str) -> Result<Self, ConfigError> {
        let mut job = Self::from_login(xml);
        job.clienttype = CLIENT_PUSH;
        job.ip = require_tag(xml, "ip")?;
        job.port = tag_u16(xml, "port").ok_or(ConfigError::Missing("port"))?;
        require_ptype(xml, job.ptype)?;
        require_tag(xml, "srvpath")?;
        require_tag(xml, "clientpath")?;
        require_tag(xml, "matchname")?;
        if job.ptype == 2 {
            require_tag(xml, "clientpathbak")?;
        }
        validate_intervals(&mut job, xml)?;
        Ok(job)
    }

    /// Parse and validate a pull client (download) config string.
    pub fn parse_pull(xml: &str) -> Result<Self, ConfigError> {
        let mut job = Self::from_login(xml);
        job.clienttype = CLIENT_PULL;
        job.ip = require_tag(xml, "ip")?;
        job.port = tag_u16(xml, "port").ok_or(ConfigError::Missing("port"))?;
        require_ptype(xml, job.ptype)?;
        require_tag(xml, "srvpath")?;
        require_tag(xml, "clientpath")?;
        require_tag(xml, "matchname")?;
        if job.ptype == 2 {
            require_tag(xml, "srvpathbak")?;
        }
        validate_intervals(&mut job, xml)?;
        Ok(job)
    }

    /// Lenient parse of a login payload on the server side.
    pub fn from_login(xml: &str) -> Self {
        Self {
            raw: xml.to_string(),
            clienttype: tag_u64(xml, "clienttype").unwrap_or(0),
            ip: tag_str(xml, "ip").unwrap_or_default(),
            port: tag_u16(xml, "port").unwrap_or(0),
            ptype: tag_u64(xml, "ptype").unwrap_or(0),
            srvpath: PathBuf::from(tag_str(xml, "srvpath").unwrap_or_default()),
            srvpathbak: PathBuf::from(tag_str(xml, "srvpathbak").unwrap_or_default()),
            clientpath: PathBuf::from(tag_str(xml, "clientpath").unwrap_or_default()),
            clientpathbak: PathBuf::from(tag_str(xml, "clientpathbak").unwrap_or_default()),
            andchild: tag_bool(xml, "andchild"),
            matchname: tag_str(xml, "matchname").unwrap_or_default(),
            timetvl: tag_u64(xml, "timetvl").unwrap_or(0),
            timeout: tag_u64(xml, "timeout").unwrap_or(0),
            pname: tag_str(xml, "pname").unwrap_or_default(),
        }
    }

    /// The login payload: the whole config string plus the client type.
    pub fn login_payload(&self) -> String {
        format!("{}<clienttype>{}</clienttype>", self.raw, self.clienttype)
    }
}

fn require_ptype(xml: &str, ptype: u64) -> Result<(), ConfigError> {
    if ptype == 1 || ptype == 2 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            tag: "ptype",
            value: tag_str(xml, "ptype").unwrap_or_default(),
        })
    }
}

fn validate_intervals(job: &mut TransferJob, _xml: &str) -> Result<(), ConfigError> {
    if job.timetvl == 0 {
        return Err(ConfigError::Missing("timetvl"));
    }
    job.timetvl = job.timetvl.min(MAX_TIMETVL);
    if job.timeout == 0 {
        return Err(ConfigError::Missing("timeout"));
    }
    if job.timeout <= job.timetvl {
        return Err(ConfigError::TimeoutNotAboveInterval {
            timeout: job.timeout,
            timetvl: job.timetvl,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
