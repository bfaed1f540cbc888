//! Transactional reset and seed of every cataloged table.
//!
//! Both operations follow the same shape inside a single transaction:
//! suspend enforcement on every table, rewrite table content, restore
//! enforcement on every table, commit. Any failure drops the transaction,
//! which rolls everything back.
//!
//! Suspending enforcement for the whole batch means tables can be emptied
//! and filled in plain catalog order, even with circular or deep foreign
//! key chains. Integrity is checked once every table holds its final content.

use crate::backend::{Backend, ConstraintToggle};
use crate::catalog::{quote_ident, Catalog, TableDescriptor};
use crate::error::{FixtureError, Result};
use crate::snapshot::Snapshot;
use rusqlite::{params_from_iter, Connection, Transaction};
use std::fmt;
use tracing::{debug, info};

/// Statistics from a clear or seed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResetStats {
    /// Number of tables touched
    pub tables: usize,
    /// Rows deleted or inserted
    pub rows: usize,
}

impl fmt::Display for ResetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tables, {} rows", self.tables, self.rows)
    }
}

pub struct ResetEngine {
    catalog: Catalog,
    toggle: Box<dyn ConstraintToggle>,
}

impl ResetEngine {
    pub fn new(catalog: Catalog, backend: Backend) -> Self {
        Self::with_toggle(catalog, backend.toggle())
    }

    pub fn with_toggle(catalog: Catalog, toggle: Box<dyn ConstraintToggle>) -> Self {
        Self { catalog, toggle }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Delete every row of every cataloged table
    pub fn clear(&self, conn: &mut Connection) -> Result<ResetStats> {
        let tx = conn.transaction()?;
        self.disable_all(&tx)?;

        let mut stats = ResetStats::default();
        for table in self.catalog.tables() {
            // Only a statement that fails to prepare means the table is not
            // what the catalog says; errors while deleting are database errors.
            let mut stmt = tx
                .prepare(&format!("DELETE FROM {}", table.quoted()))
                .map_err(|e| FixtureError::mismatch(table.name(), e.to_string()))?;
            let deleted = stmt.execute([])?;
            debug!(table = table.name(), rows = deleted, "cleared table");
            stats.tables += 1;
            stats.rows += deleted;
        }

        self.enable_all(&tx)?;
        tx.commit()?;

        info!(%stats, "cleared database");
        Ok(stats)
    }

    /// Insert every row of `snapshot`, one INSERT per row.
    ///
    /// The snapshot is validated against the catalog before anything is
    /// written. Seeding does not clear first; call [`clear`](Self::clear)
    /// for a full reset.
    pub fn seed(&self, conn: &mut Connection, snapshot: &Snapshot) -> Result<ResetStats> {
        snapshot.validate(&self.catalog)?;

        let tx = conn.transaction()?;
        self.disable_all(&tx)?;

        let mut stats = ResetStats::default();
        for table in self.catalog.tables() {
            let inserted = insert_rows(&tx, table, snapshot)?;
            if inserted > 0 {
                debug!(table = table.name(), rows = inserted, "seeded table");
                stats.tables += 1;
                stats.rows += inserted;
            }
        }

        self.enable_all(&tx)?;
        tx.commit()?;

        info!(%stats, "seeded database");
        Ok(stats)
    }

    fn disable_all(&self, tx: &Transaction<'_>) -> Result<()> {
        for table in self.catalog.tables() {
            self.toggle.disable_all(tx, table)?;
        }
        Ok(())
    }

    fn enable_all(&self, tx: &Transaction<'_>) -> Result<()> {
        for table in self.catalog.tables() {
            self.toggle.enable_all(tx, table)?;
        }
        Ok(())
    }
}

/// Build the INSERT for one row; the column list follows the row's keys
fn insert_sql(table: &TableDescriptor, columns: &[&String]) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.quoted(),
        names,
        placeholders
    )
}

fn insert_rows(tx: &Transaction<'_>, table: &TableDescriptor, snapshot: &Snapshot) -> Result<usize> {
    let rows = snapshot.rows(table.name());
    for (i, row) in rows.iter().enumerate() {
        let insert_err = |source| FixtureError::Insert {
            table: table.name().to_string(),
            row: i,
            source,
        };

        let columns: Vec<&String> = row.keys().collect();
        if columns.is_empty() {
            tx.execute(&format!("INSERT INTO {} DEFAULT VALUES", table.quoted()), [])
                .map_err(insert_err)?;
            continue;
        }

        let mut stmt = tx
            .prepare_cached(&insert_sql(table, &columns))
            .map_err(insert_err)?;
        stmt.execute(params_from_iter(row.values()))
            .map_err(insert_err)?;
    }
    Ok(rows.len())
}
