// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dcx-db: the database ends of the pipeline.
//!
//! Mining a source database into XML record files, ingesting record
//! files into a target database with synthesized upserts, reference-table
//! synchronization, aged-row migration, and the incremental-max bookmark
//! shared by the miners.

pub mod cols;
pub mod conn;
pub mod incmax;
pub mod ingest;
pub mod migrate;
pub mod mine;
pub mod sqlgen;
pub mod syncref;

pub use cols::{table_columns, ColType, TableColumn};
pub use conn::{connect, is_connection_fatal, is_unique_violation, DbError, DbResult};
pub use ingest::{load_rules, process_file, run_ingest, IngestConfig, IngestRule, Outcome};
pub use migrate::{run_migrate, MigrateConfig};
pub use mine::{run_mine, MineConfig, MineReport};
pub use syncref::{run_sync, SyncConfig};
