//! Backend-specific suspension of constraint enforcement.
//!
//! `clear` and `seed` stay backend-agnostic; they only call
//! [`ConstraintToggle::disable_all`] for every table before touching data and
//! [`ConstraintToggle::enable_all`] for every table afterwards, all inside
//! one transaction. The backend is picked once at startup from [`Backend`].

use crate::catalog::{quote_ident, TableDescriptor};
use crate::error::{FixtureError, Result};
use ahash::AHashMap;
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Suspends and restores constraint/trigger enforcement for one table
pub trait ConstraintToggle {
    fn disable_all(&self, tx: &Transaction<'_>, table: &TableDescriptor) -> Result<()>;
    fn enable_all(&self, tx: &Transaction<'_>, table: &TableDescriptor) -> Result<()>;
}

/// SQLite: triggers are suspended and foreign keys deferred while the batch runs.
///
/// SQLite has no per-table switch. `disable_all` drops the table's triggers
/// inside the transaction and remembers their definitions, then defers
/// foreign key checks (the pragma resets on commit). `enable_all` re-creates
/// the triggers before commit; a rollback restores them on its own. When the
/// connection enforces foreign keys, `enable_all` also runs
/// `foreign_key_check` on the table so a violation names the table instead
/// of failing the commit with a generic error.
#[derive(Debug, Default)]
pub struct SqliteToggle {
    /// Dropped trigger definitions per table, waiting for `enable_all`
    suspended: RefCell<AHashMap<String, Vec<String>>>,
}

impl SqliteToggle {
    pub fn new() -> Self {
        Self::default()
    }
}

fn table_triggers(tx: &Transaction<'_>, table: &TableDescriptor) -> rusqlite::Result<Vec<(String, String)>> {
    let sql = format!(
        "SELECT name, sql FROM {}.sqlite_master \
         WHERE type = 'trigger' AND tbl_name = ?1 ORDER BY name",
        quote_ident(table.schema().unwrap_or("main"))
    );
    let mut stmt = tx.prepare(&sql)?;
    let triggers = stmt
        .query_map([table.bare_name()], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(triggers)
}

impl ConstraintToggle for SqliteToggle {
    fn disable_all(&self, tx: &Transaction<'_>, table: &TableDescriptor) -> Result<()> {
        let toggle_err = |source| FixtureError::ConstraintToggle {
            table: table.name().to_string(),
            action: "disable",
            source,
        };

        let triggers = table_triggers(tx, table).map_err(toggle_err)?;
        let schema = quote_ident(table.schema().unwrap_or("main"));
        let mut definitions = Vec::with_capacity(triggers.len());
        for (name, sql) in triggers {
            tx.execute_batch(&format!("DROP TRIGGER {}.{}", schema, quote_ident(&name)))
                .map_err(toggle_err)?;
            debug!(table = table.name(), trigger = %name, "suspended trigger");
            definitions.push(sql);
        }
        self.suspended
            .borrow_mut()
            .insert(table.name().to_string(), definitions);

        tx.execute_batch("PRAGMA defer_foreign_keys = ON")
            .map_err(toggle_err)
    }

    fn enable_all(&self, tx: &Transaction<'_>, table: &TableDescriptor) -> Result<()> {
        let toggle_err = |source| FixtureError::ConstraintToggle {
            table: table.name().to_string(),
            action: "enable",
            source,
        };

        let definitions = self
            .suspended
            .borrow_mut()
            .remove(table.name())
            .unwrap_or_default();
        for sql in &definitions {
            tx.execute_batch(sql).map_err(toggle_err)?;
        }

        let enforced: i64 = tx
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .map_err(toggle_err)?;
        if enforced == 0 {
            return Ok(());
        }

        let sql = format!(
            "PRAGMA {}.foreign_key_check({})",
            quote_ident(table.schema().unwrap_or("main")),
            quote_ident(table.bare_name())
        );
        let mut stmt = tx.prepare(&sql).map_err(toggle_err)?;
        let mut rows = stmt.query([]).map_err(toggle_err)?;
        if let Some(row) = rows.next().map_err(toggle_err)? {
            let rowid: Option<i64> = row.get(1).map_err(toggle_err)?;
            let parent: String = row.get(2).map_err(toggle_err)?;
            return Err(FixtureError::ConstraintViolation {
                table: table.name().to_string(),
                detail: match rowid {
                    Some(id) => format!("row {} references a missing row in {}", id, parent),
                    None => format!("a row references a missing row in {}", parent),
                },
            });
        }
        Ok(())
    }
}

/// No enforcement switching. For schemas without foreign keys or
/// connections that do not enforce them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughToggle;

impl ConstraintToggle for PassthroughToggle {
    fn disable_all(&self, _tx: &Transaction<'_>, _table: &TableDescriptor) -> Result<()> {
        Ok(())
    }

    fn enable_all(&self, _tx: &Transaction<'_>, _table: &TableDescriptor) -> Result<()> {
        Ok(())
    }
}

/// Supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Passthrough,
}

impl Backend {
    pub fn toggle(self) -> Box<dyn ConstraintToggle> {
        match self {
            Backend::Sqlite => Box::new(SqliteToggle::new()),
            Backend::Passthrough => Box::new(PassthroughToggle),
        }
    }

    /// Open a connection configured for this backend
    pub fn open(self, path: &Path) -> Result<Connection> {
        let conn = Connection::open(path)?;
        self.configure(&conn)?;
        Ok(conn)
    }

    pub fn open_in_memory(self) -> Result<Connection> {
        let conn = Connection::open_in_memory()?;
        self.configure(&conn)?;
        Ok(conn)
    }

    fn configure(self, conn: &Connection) -> Result<()> {
        if self == Backend::Sqlite {
            conn.execute_batch("PRAGMA foreign_keys = ON")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "passthrough" | "none" => Ok(Backend::Passthrough),
            _ => Err(format!(
                "Unknown backend: {}. Valid options: sqlite, passthrough",
                s
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Passthrough => write!(f, "passthrough"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("sqlite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("SQLite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("none".parse::<Backend>().unwrap(), Backend::Passthrough);
        assert!("oracle".parse::<Backend>().unwrap_err().contains("Unknown backend"));
    }

    #[test]
    fn test_open_enables_foreign_keys() {
        let conn = Backend::Sqlite.open_in_memory().unwrap();
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(on, 1);

        let conn = Backend::Passthrough.open_in_memory().unwrap();
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(on, 0);
    }
}
