// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dcx - the data-center exchange toolkit.
//!
//! One subcommand per daemon. Every daemon takes a logfile and a single
//! `<tag>value</tag>` config string; the supervisor and the janitor keep
//! their bare argument shapes. Exit code 0 is a normal exit, -1 a
//! startup error (bad arguments, unopenable log, bad config, failed
//! registration); runtime failures are logged and lead to a clean exit
//! so the supervisor restarts the daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use dcx_daemon::{logging, sweep, Heartbeat, Registry, Shutdown, SweepMode};

/// Startup-error exit status (observed as 255 by the shell).
const STARTUP_EXIT: i32 = -1;

#[derive(Parser)]
#[command(
    name = "dcx",
    version,
    about = "Data-center exchange toolkit: mine, ship, ingest, sync"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program under supervision: spawn, wait, cool down, restart
    Supervise {
        /// Seconds between a child exit and the next start
        interval: u64,
        /// Absolute path of the program to run
        program: String,
        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Scan the heartbeat registry and terminate timed-out daemons
    Checkproc { logfile: PathBuf },
    /// Delete aged files under a directory tree
    Sweep {
        root: PathBuf,
        /// Comma-separated filename globs, e.g. "*.log.20*,*.xml"
        patterns: String,
        /// Age cutoff in days; fractions allowed
        age_days: f64,
        /// Compress instead of delete
        #[arg(long)]
        compress: bool,
    },
    /// File transfer server
    Serve { logfile: PathBuf, config: String },
    /// Upload files to a transfer server
    Tcpput { logfile: PathBuf, config: String },
    /// Download files from a transfer server
    Tcpget { logfile: PathBuf, config: String },
    /// Download files from an FTP server
    Ftpget { logfile: PathBuf, config: String },
    /// Upload files to an FTP server
    Ftpput { logfile: PathBuf, config: String },
    /// Mine a source database into XML record files
    Mine { logfile: PathBuf, config: String },
    /// Ingest XML record files into a target database
    Ingest { logfile: PathBuf, config: String },
    /// Synchronize a reference table from a remote database
    Syncref { logfile: PathBuf, config: String },
    /// Migrate aged rows into a history table
    Migrate { logfile: PathBuf, config: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Supervise {
            interval,
            program,
            args,
        } => {
            dcx_daemon::supervise(Duration::from_secs(interval), &program, &args).await?;
            Ok(())
        }
        Commands::Checkproc { logfile } => {
            let _guard = init_logging(&logfile);
            match Registry::from_env().scan() {
                Ok(report) => {
                    tracing::info!(
                        stale = report.stale.len(),
                        terminated = report.terminated.len(),
                        killed = report.killed.len(),
                        "scan complete"
                    );
                    Ok(())
                }
                Err(e) => {
                    error!("scan failed: {e}");
                    Ok(())
                }
            }
        }
        Commands::Sweep {
            root,
            patterns,
            age_days,
            compress,
        } => {
            let mode = if compress {
                SweepMode::Compress
            } else {
                SweepMode::Delete
            };
            let heartbeat = register("sweep", 30);
            match sweep(&root, &patterns, age_days, mode, heartbeat.as_ref()) {
                Ok(report) => {
                    println!(
                        "removed {} compressed {} failed {}",
                        report.removed, report.compressed, report.failed
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("sweep failed: {e}");
                    std::process::exit(STARTUP_EXIT);
                }
            }
        }
        Commands::Serve { logfile, config } => serve(logfile, config).await,
        Commands::Tcpput { logfile, config } => tcp_client(logfile, config, true).await,
        Commands::Tcpget { logfile, config } => tcp_client(logfile, config, false).await,
        Commands::Ftpget { logfile, config } => ftp_get(logfile, config).await,
        Commands::Ftpput { logfile, config } => ftp_put(logfile, config).await,
        Commands::Mine { logfile, config } => mine(logfile, config).await,
        Commands::Ingest { logfile, config } => ingest(logfile, config).await,
        Commands::Syncref { logfile, config } => syncref(logfile, config).await,
        Commands::Migrate { logfile, config } => migrate(logfile, config).await,
    }
}

/// Install file logging or die with the startup exit code.
fn init_logging(logfile: &PathBuf) -> logging::LogGuard {
    match logging::init(logfile) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("logfile.open({}) failed: {e}", logfile.display());
            std::process::exit(STARTUP_EXIT);
        }
    }
}

/// Startup failure: record it synchronously and exit -1.
fn startup_failed(logfile: &PathBuf, error: &dyn std::fmt::Display) -> ! {
    logging::write_startup_error(logfile, error);
    error!("startup failed: {error}");
    std::process::exit(STARTUP_EXIT);
}

/// Claim a heartbeat slot, or die: an unregistered daemon would be
/// invisible to the liveness scanner.
fn register(pname: &str, timeout: u64) -> Option<Heartbeat> {
    match Registry::from_env().register(pname, timeout as i64) {
        Ok(hb) => Some(hb),
        Err(e) => {
            eprintln!("heartbeat registration failed: {e}");
            std::process::exit(STARTUP_EXIT);
        }
    }
}

async fn serve(logfile: PathBuf, config: String) -> Result<()> {
    let _guard = init_logging(&logfile);

    let Some(port) = dcx_core::config::tag_u16(&config, "port") else {
        startup_failed(&logfile, &"port is null");
    };
    let pname = dcx_core::config::tag_str(&config, "pname")
        .unwrap_or_else(|| "fileserver".to_string());
    let timeout = dcx_core::config::tag_u64(&config, "timeout").unwrap_or(60);

    let heartbeat = register(&pname, timeout).map(Arc::new);
    let shutdown = Shutdown::install()?;

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => startup_failed(&logfile, &format!("init listen port {port} failed: {e}")),
    };

    if let Err(e) = dcx_transfer::server::run_server(listener, heartbeat, shutdown).await {
        error!("server stopped: {e}");
    }
    Ok(())
}

async fn tcp_client(logfile: PathBuf, config: String, push: bool) -> Result<()> {
    let _guard = init_logging(&logfile);

    let job = match if push {
        dcx_transfer::TransferJob::parse_push(&config)
    } else {
        dcx_transfer::TransferJob::parse_pull(&config)
    } {
        Ok(job) => job,
        Err(e) => startup_failed(&logfile, &e),
    };

    let heartbeat = register(&job.pname, job.timeout);
    let shutdown = Shutdown::install()?;

    let result = if push {
        dcx_transfer::client::run_push(&job, heartbeat.as_ref(), &shutdown).await
    } else {
        dcx_transfer::client::run_pull(&job, heartbeat.as_ref(), &shutdown).await
    };
    if let Err(e) = result {
        error!("transfer session ended: {e}");
    }
    Ok(())
}

async fn ftp_get(logfile: PathBuf, config: String) -> Result<()> {
    let _guard = init_logging(&logfile);

    let cfg = match dcx_transfer::ftp::FtpGetConfig::parse(&config) {
        Ok(cfg) => cfg,
        Err(e) => startup_failed(&logfile, &e),
    };
    let heartbeat = register(&cfg.pname, cfg.timeout);

    let outcome = tokio::task::spawn_blocking(move || {
        let mut session = dcx_transfer::ftp::FtpSession::connect(
            &cfg.host,
            &cfg.username,
            &cfg.password,
            cfg.mode == 1,
            &cfg.remotepath,
        )?;
        dcx_transfer::ftp::run_download(&cfg, &mut session, heartbeat.as_ref())
    })
    .await?;

    match outcome {
        Ok(report) => {
            tracing::info!(
                downloaded = report.transferred.len(),
                kept = report.kept,
                "download pass complete"
            );
        }
        Err(e) => error!("download pass failed: {e}"),
    }
    Ok(())
}

async fn ftp_put(logfile: PathBuf, config: String) -> Result<()> {
    let _guard = init_logging(&logfile);

    let cfg = match dcx_transfer::ftp::FtpPutConfig::parse(&config) {
        Ok(cfg) => cfg,
        Err(e) => startup_failed(&logfile, &e),
    };
    let heartbeat = register(&cfg.pname, cfg.timeout);

    let outcome = tokio::task::spawn_blocking(move || {
        let mut session = dcx_transfer::ftp::FtpSession::connect(
            &cfg.host,
            &cfg.username,
            &cfg.password,
            cfg.mode == 1,
            &cfg.remotepath,
        )?;
        dcx_transfer::ftp::run_upload(&cfg, &mut session, heartbeat.as_ref())
    })
    .await?;

    match outcome {
        Ok(report) => {
            tracing::info!(
                uploaded = report.transferred.len(),
                kept = report.kept,
                "upload pass complete"
            );
        }
        Err(e) => error!("upload pass failed: {e}"),
    }
    Ok(())
}

async fn mine(logfile: PathBuf, config: String) -> Result<()> {
    let _guard = init_logging(&logfile);

    let cfg = match dcx_db::MineConfig::parse(&config) {
        Ok(cfg) => cfg,
        Err(e) => startup_failed(&logfile, &e),
    };

    // Outside the run window: a scheduler re-invokes us.
    if !dcx_core::timefmt::in_start_hours(&cfg.starttime) {
        return Ok(());
    }

    let heartbeat = register(&cfg.pname, cfg.timeout);
    let outcome =
        tokio::task::spawn_blocking(move || dcx_db::run_mine(&cfg, heartbeat.as_ref())).await?;
    match outcome {
        Ok(report) => {
            tracing::info!(files = report.files.len(), rows = report.rows, "mining complete")
        }
        Err(e) => error!("mining failed: {e}"),
    }
    Ok(())
}

async fn ingest(logfile: PathBuf, config: String) -> Result<()> {
    let _guard = init_logging(&logfile);

    let cfg = match dcx_db::IngestConfig::parse(&config) {
        Ok(cfg) => cfg,
        Err(e) => startup_failed(&logfile, &e),
    };

    let heartbeat = register(&cfg.pname, cfg.timeout);
    let shutdown = Shutdown::install()?;

    let outcome = tokio::task::spawn_blocking(move || {
        dcx_db::run_ingest(&cfg, heartbeat.as_ref(), &shutdown)
    })
    .await?;
    if let Err(e) = outcome {
        error!("ingest stopped: {e}");
    }
    Ok(())
}

async fn syncref(logfile: PathBuf, config: String) -> Result<()> {
    let _guard = init_logging(&logfile);

    let cfg = match dcx_db::SyncConfig::parse(&config) {
        Ok(cfg) => cfg,
        Err(e) => startup_failed(&logfile, &e),
    };

    let heartbeat = register(&cfg.pname, cfg.timeout);
    let outcome =
        tokio::task::spawn_blocking(move || dcx_db::run_sync(&cfg, heartbeat.as_ref())).await?;
    if let Err(e) = outcome {
        error!("sync failed: {e}");
    }
    Ok(())
}

async fn migrate(logfile: PathBuf, config: String) -> Result<()> {
    let _guard = init_logging(&logfile);

    let cfg = match dcx_db::MigrateConfig::parse(&config) {
        Ok(cfg) => cfg,
        Err(e) => startup_failed(&logfile, &e),
    };

    if !dcx_core::timefmt::in_start_hours(&cfg.starttime) {
        return Ok(());
    }

    let heartbeat = register(&cfg.pname, cfg.timeout);
    let outcome =
        tokio::task::spawn_blocking(move || dcx_db::run_migrate(&cfg, heartbeat.as_ref()))
            .await?;
    if let Err(e) = outcome {
        error!("migration failed: {e}");
    }
    Ok(())
}
