//! Live-schema introspection through SQLite's table-valued pragmas.

use super::{quote_ident, Catalog, TableDescriptor};
use crate::error::Result;
use rusqlite::Connection;

/// Column names of a live table in declaration order (empty if the table is missing)
pub(crate) fn live_columns(conn: &Connection, table: &TableDescriptor) -> Result<Vec<String>> {
    let schema = table.schema().unwrap_or("main");
    let mut stmt =
        conn.prepare("SELECT name FROM pragma_table_info(?1, ?2) ORDER BY cid")?;
    let columns = stmt
        .query_map([table.bare_name(), schema], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Build a catalog from every user table in `schema`, ordered by name.
///
/// Table names are qualified with the schema so generated catalogs stay
/// unambiguous when more databases are attached.
pub fn introspect(conn: &Connection, schema: &str) -> Result<Catalog> {
    let sql = format!(
        "SELECT name FROM {}.sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        quote_ident(schema)
    );
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let descriptor = TableDescriptor::new(format!("{}.{}", schema, name), Vec::<String>::new());
        let columns = live_columns(conn, &descriptor)?;
        tables.push(TableDescriptor::new(descriptor.name().to_string(), columns));
    }

    Catalog::new(tables)
}
