//! Snapshots: the full content of every cataloged table at one point in time.
//!
//! This module provides:
//! - The in-memory [`Snapshot`] record set
//! - Capture from a live database ([`read_from_database`])
//! - Deterministic JSON files ([`load_from_file`], [`write_to_file`])
//! - Key-addressed storage of scenario snapshots ([`SnapshotStore`])
//! - Row-level comparison of two snapshots ([`diff`])

mod diff;
mod file;

pub use diff::{diff, SnapshotDiff, TableDiff};
pub use file::{
    load_from_file, render, write_to_file, SnapshotDocument, FORMAT_VERSION, SNAPSHOT_EXTENSION,
};

use crate::catalog::{quote_ident, Catalog};
use crate::error::{FixtureError, Result};
use crate::value::Value;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One row: column name to value
pub type Row = BTreeMap<String, Value>;

/// Rows per table. Tables without rows are never stored, so a snapshot that
/// omits a table equals one that lists it empty. Equality ignores row order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    tables: BTreeMap<String, Vec<Row>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table
    pub fn extend_rows(&mut self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut rows = rows.into_iter().peekable();
        if rows.peek().is_none() {
            return;
        }
        self.tables.entry(table.to_string()).or_default().extend(rows);
    }

    pub fn push_row(&mut self, table: &str, row: Row) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// Rows of a table (empty if the table has none)
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of tables holding at least one row
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Row counts per table, in catalog order, including empty tables
    pub fn table_counts(&self, catalog: &Catalog) -> Vec<(String, usize)> {
        catalog
            .tables()
            .iter()
            .map(|t| (t.name().to_string(), self.rows(t.name()).len()))
            .collect()
    }

    /// Check every table and row column against the catalog
    pub fn validate(&self, catalog: &Catalog) -> Result<()> {
        for (table, rows) in &self.tables {
            let descriptor = catalog
                .get(table)
                .ok_or_else(|| FixtureError::mismatch(table, "table is not in the catalog"))?;
            for (i, row) in rows.iter().enumerate() {
                if let Some(col) = row.keys().find(|c| !descriptor.has_column(c)) {
                    return Err(FixtureError::mismatch(
                        table,
                        format!("row {} has column {} which is not in the catalog", i, col),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Capture every cataloged table, in catalog order.
///
/// Rows are ordered by all catalog columns so the result does not depend on
/// physical row order. Tables are read independently; foreign keys are not
/// checked here.
pub fn read_from_database(conn: &Connection, catalog: &Catalog) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();

    for table in catalog.tables() {
        let select = format!("SELECT * FROM {}", table.quoted());
        let live_columns: Vec<String> = {
            let stmt = conn
                .prepare(&select)
                .map_err(|e| FixtureError::mismatch(table.name(), e.to_string()))?;
            stmt.column_names().into_iter().map(String::from).collect()
        };

        if let Some(col) = live_columns.iter().find(|c| !table.has_column(c)) {
            return Err(FixtureError::mismatch(
                table.name(),
                format!("database column {} is not in the catalog", col),
            ));
        }
        if let Some(col) = table.columns().iter().find(|c| !live_columns.contains(c)) {
            return Err(FixtureError::mismatch(
                table.name(),
                format!("column {} does not exist in the database", col),
            ));
        }

        let order_by = table
            .columns()
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn.prepare(&format!("{} ORDER BY {}", select, order_by))?;
        let mut rows = stmt.query([])?;

        let mut captured = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, col) in live_columns.iter().enumerate() {
                let value = Value::from_sql_ref(row.get_ref(i)?).map_err(|kind| {
                    FixtureError::UnsupportedValue {
                        table: table.name().to_string(),
                        column: col.clone(),
                        kind,
                    }
                })?;
                record.insert(col.clone(), value);
            }
            captured.push(record);
        }

        debug!(table = table.name(), rows = captured.len(), "captured table");
        snapshot.extend_rows(table.name(), captured);
    }

    Ok(snapshot)
}

/// Where a snapshot was saved and the SHA-256 of its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    pub path: PathBuf,
    pub sha256: String,
}

/// Snapshot files addressed by scenario key: `{dir}/{key}.json`
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    catalog: Catalog,
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(catalog: Catalog, dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            dir: dir.into(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, SNAPSHOT_EXTENSION))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    pub fn read_from_database(&self, conn: &Connection) -> Result<Snapshot> {
        read_from_database(conn, &self.catalog)
    }

    /// Load the snapshot for `key`, failing with `ScenarioNotFound` if no file exists
    pub fn load(&self, key: &str) -> Result<Snapshot> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Err(FixtureError::ScenarioNotFound {
                key: key.to_string(),
                path,
            });
        }
        load_from_file(&path, &self.catalog)
    }

    pub fn save(&self, key: &str, snapshot: &Snapshot) -> Result<StoredSnapshot> {
        let path = self.path_for(key);
        let sha256 = write_to_file(snapshot, &self.catalog, &path)?;
        Ok(StoredSnapshot { path, sha256 })
    }

    /// Delete the file for `key`. Returns whether a file was there.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FixtureError::io(path, e)),
        }
    }
}
