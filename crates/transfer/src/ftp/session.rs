// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real FTP client behind [`RemoteStore`].

use std::io::Write;
use std::path::Path;

use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

use dcx_core::fsutil;

use super::{FtpError, RemoteStore};

/// A logged-in FTP session, positioned in the remote directory.
pub struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    /// Connect, log in, switch to binary, enter `remotepath`.
    ///
    /// `passive` selects the transfer mode; passive is the default and
    /// the right choice through NAT.
    pub fn connect(
        host: &str,
        username: &str,
        password: &str,
        passive: bool,
        remotepath: &str,
    ) -> Result<Self, FtpError> {
        let mut stream = FtpStream::connect(host)?;
        stream.login(username, password)?;
        stream.transfer_type(FileType::Binary)?;
        stream.set_mode(if passive { Mode::Passive } else { Mode::Active });
        stream.cwd(remotepath)?;
        Ok(Self { stream })
    }
}

impl RemoteStore for FtpSession {
    fn list(&mut self) -> Result<Vec<String>, FtpError> {
        // NLST of the working directory; keep bare names only.
        let names = self.stream.nlst(None)?;
        Ok(names
            .into_iter()
            .map(|n| {
                n.rsplit('/')
                    .next()
                    .map(str::to_string)
                    .unwrap_or(n)
            })
            .collect())
    }

    fn mtime(&mut self, name: &str) -> Result<String, FtpError> {
        let when = self.stream.mdtm(name)?;
        Ok(when.format("%Y%m%d%H%M%S").to_string())
    }

    fn download(&mut self, name: &str, local: &Path) -> Result<(), FtpError> {
        let tmp = fsutil::tmp_path(local);
        let mut reader = self.stream.retr_as_stream(name)?;
        let result = (|| -> Result<(), FtpError> {
            let mut out = std::fs::File::create(&tmp)?;
            std::io::copy(&mut reader, &mut out)?;
            out.flush()?;
            Ok(())
        })();
        self.stream.finalize_retr_stream(reader)?;
        result?;
        std::fs::rename(&tmp, local)?;
        Ok(())
    }

    fn upload(&mut self, local: &Path, name: &str) -> Result<(), FtpError> {
        let mut src = std::fs::File::open(local)?;
        self.stream.put_file(name, &mut src)?;
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), FtpError> {
        self.stream.rm(name)?;
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FtpError> {
        self.stream.rename(from, to)?;
        Ok(())
    }
}
