//! Database layer for nzbidx-ingest
//!
//! Handles SQLite persistence for per-group ingest cursors and releases.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`cursor`] — Per-group watermark CRUD
//! - [`release`] — Release upsert, prune, and partition-key helpers

use sqlx::sqlite::SqlitePool;

mod migrations;

pub mod cursor;
pub mod release;

/// Database handle for nzbidx-ingest
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// The underlying pool, for submodules and tests.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
