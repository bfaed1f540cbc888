//! Test-time loading of generated scenario snapshots.
//!
//! `load_scenario` always clears before seeding, so it produces the same
//! database content no matter what a previous test left behind. `clear`
//! empties the whole catalog: tests sharing one database must be serialized.

use crate::engine::ResetEngine;
use crate::error::Result;
use crate::snapshot::{Snapshot, SnapshotStore};
use rusqlite::Connection;
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Statistics from loading a scenario
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    /// Tables that received rows
    pub tables: usize,
    /// Rows inserted
    pub rows: usize,
    pub duration_secs: f64,
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tables, {} rows loaded in {:.3}s",
            self.tables, self.rows, self.duration_secs
        )
    }
}

pub struct Loader<'a> {
    engine: &'a ResetEngine,
    store: &'a SnapshotStore,
}

impl<'a> Loader<'a> {
    pub fn new(engine: &'a ResetEngine, store: &'a SnapshotStore) -> Self {
        Self { engine, store }
    }

    /// Reset the database to the snapshot generated for `key`.
    ///
    /// A missing file fails with `ScenarioNotFound` before the database is
    /// touched; an insert that no longer fits the live schema fails with
    /// `Insert`.
    pub fn load_scenario(&self, conn: &mut Connection, key: &str) -> Result<LoadStats> {
        let start = Instant::now();
        let snapshot = self.store.load(key)?;
        let mut stats = self.load_snapshot(conn, &snapshot)?;
        stats.duration_secs = start.elapsed().as_secs_f64();
        info!(scenario = key, %stats, "loaded scenario");
        Ok(stats)
    }

    /// Reset the database to an in-memory snapshot
    pub fn load_snapshot(&self, conn: &mut Connection, snapshot: &Snapshot) -> Result<LoadStats> {
        let start = Instant::now();
        self.engine.clear(conn)?;
        let seeded = self.engine.seed(conn, snapshot)?;
        Ok(LoadStats {
            tables: seeded.tables,
            rows: seeded.rows,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}
