//! Table catalog: the fixed, declared set of tables the fixture engine owns.
//!
//! The catalog is ordered. `clear`, `seed`, snapshot capture and snapshot
//! files all walk tables in catalog order, and snapshot files write columns
//! in catalog column order.
//!
//! Nothing here touches the database except [`Catalog::verify`] and
//! [`introspect`]; a stale entry otherwise surfaces as a `SchemaMismatch`
//! from the engine or the snapshot store.

mod introspect;

pub use introspect::introspect;

use crate::error::{FixtureError, Result};
use ahash::AHashSet;

/// A table name (optionally schema-qualified) and its ordered column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<String>,
}

impl TableDescriptor {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Schema part of a qualified name (`main` for `main.users`)
    pub fn schema(&self) -> Option<&str> {
        self.name.split_once('.').map(|(schema, _)| schema)
    }

    /// Unqualified table name
    pub fn bare_name(&self) -> &str {
        self.name
            .split_once('.')
            .map(|(_, table)| table)
            .unwrap_or(&self.name)
    }

    /// Quoted identifier safe to splice into SQL
    pub fn quoted(&self) -> String {
        quote_qualified(&self.name)
    }
}

/// Ordered registry of table descriptors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tables: Vec<TableDescriptor>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate tables and empty or duplicate column lists
    pub fn new(tables: Vec<TableDescriptor>) -> Result<Self> {
        let mut seen = AHashSet::new();
        for table in &tables {
            if !seen.insert(table.name.as_str()) {
                return Err(FixtureError::Config(format!(
                    "table {} is declared more than once",
                    table.name
                )));
            }
            if table.columns.is_empty() {
                return Err(FixtureError::Config(format!(
                    "table {} declares no columns",
                    table.name
                )));
            }
            let mut cols = AHashSet::new();
            for col in &table.columns {
                if !cols.insert(col.as_str()) {
                    return Err(FixtureError::Config(format!(
                        "column {}.{} is declared more than once",
                        table.name, col
                    )));
                }
            }
        }
        Ok(Self { tables })
    }

    /// Tables in catalog order
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Compare the catalog against the live schema, collecting every drift
    /// instead of stopping at the first one.
    pub fn verify(&self, conn: &rusqlite::Connection) -> Result<Vec<FixtureError>> {
        let mut problems = Vec::new();
        for table in &self.tables {
            let live = introspect::live_columns(conn, table)?;
            if live.is_empty() {
                problems.push(FixtureError::mismatch(
                    table.name(),
                    "table does not exist in the database",
                ));
                continue;
            }
            for col in &table.columns {
                if !live.contains(col) {
                    problems.push(FixtureError::mismatch(
                        table.name(),
                        format!("column {} does not exist in the database", col),
                    ));
                }
            }
            for col in &live {
                if !table.has_column(col) {
                    problems.push(FixtureError::mismatch(
                        table.name(),
                        format!("database column {} is not in the catalog", col),
                    ));
                }
            }
        }
        Ok(problems)
    }
}

/// Quote one identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote each dotted segment of a possibly schema-qualified name
pub fn quote_qualified(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}
