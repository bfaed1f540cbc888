//! Plain-SQL unit of work for scenarios that do not go through an ORM.

use super::Domain;
use crate::catalog::{quote_ident, quote_qualified};
use crate::error::ScenarioError;
use crate::value::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Params, Transaction};

/// Opens one transaction per populate run
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlDomain;

impl Domain for SqlDomain {
    type Context<'conn> = SqlContext<'conn>;

    fn begin<'conn>(&self, conn: &'conn mut Connection) -> Result<SqlContext<'conn>, ScenarioError> {
        Ok(SqlContext {
            tx: conn.transaction()?,
        })
    }

    fn commit(&self, ctx: SqlContext<'_>) -> Result<(), ScenarioError> {
        ctx.tx.commit()?;
        Ok(())
    }
}

/// Write access for a populate routine; rolled back unless committed
pub struct SqlContext<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> SqlContext<'conn> {
    /// The underlying transaction, for anything the helpers do not cover
    pub fn transaction(&self) -> &Transaction<'conn> {
        &self.tx
    }

    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, ScenarioError> {
        Ok(self.tx.execute(sql, params)?)
    }

    pub fn execute_batch(&self, sql: &str) -> Result<(), ScenarioError> {
        Ok(self.tx.execute_batch(sql)?)
    }

    /// Insert one row given as (column, value) pairs
    pub fn insert(&self, table: &str, columns: &[(&str, Value)]) -> Result<(), ScenarioError> {
        let names = columns
            .iter()
            .map(|(c, _)| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_qualified(table),
            names,
            placeholders
        );
        self.tx
            .prepare_cached(&sql)?
            .execute(params_from_iter(columns.iter().map(|(_, v)| v)))?;
        Ok(())
    }

    /// First column of the first row, if any row matches
    pub fn find_value<P: Params>(&self, sql: &str, params: P) -> Result<Option<Value>, ScenarioError> {
        let value = self
            .tx
            .query_row(sql, params, |row| row.get::<_, Value>(0))
            .optional()?;
        Ok(value)
    }

    /// Like [`find_value`](Self::find_value), but absence is a missing prerequisite
    pub fn require_value<P: Params>(
        &self,
        sql: &str,
        params: P,
        what: &str,
    ) -> Result<Value, ScenarioError> {
        self.find_value(sql, params)?
            .ok_or_else(|| ScenarioError::missing(what))
    }

    pub fn count(&self, table: &str) -> Result<i64, ScenarioError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_qualified(table));
        Ok(self.tx.query_row(&sql, [], |row| row.get(0))?)
    }
}
