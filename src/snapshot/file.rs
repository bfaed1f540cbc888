//! Snapshot file format.
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "tables": {
//!     "main.roles": [
//!       { "id": "r1", "name": "Admin" }
//!     ]
//!   }
//! }
//! ```
//!
//! Output is byte-for-byte reproducible: tables are written in catalog order,
//! row keys in catalog column order, and rows in snapshot order.

use super::{Row, Snapshot};
use crate::catalog::{Catalog, TableDescriptor};
use crate::error::{FixtureError, Result};
use crate::value::Value;
use schemars::JsonSchema;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

pub const SNAPSHOT_EXTENSION: &str = "json";
pub const FORMAT_VERSION: u32 = 1;

/// On-disk shape of a snapshot file
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SnapshotDocument {
    /// File format version
    pub format_version: u32,
    /// Rows per table name; tables without rows may be omitted
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<BTreeMap<String, Value>>>,
}

/// Serializes a snapshot in catalog order
struct OrderedDocument<'a> {
    snapshot: &'a Snapshot,
    catalog: &'a Catalog,
}

struct OrderedTables<'a>(&'a OrderedDocument<'a>);

struct OrderedRows<'a> {
    table: &'a TableDescriptor,
    rows: &'a [Row],
}

struct OrderedRow<'a> {
    table: &'a TableDescriptor,
    row: &'a Row,
}

impl Serialize for OrderedDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("format_version", &FORMAT_VERSION)?;
        map.serialize_entry("tables", &OrderedTables(self))?;
        map.end()
    }
}

impl Serialize for OrderedTables<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let doc = self.0;
        let occupied: Vec<&TableDescriptor> = doc
            .catalog
            .tables()
            .iter()
            .filter(|t| !doc.snapshot.rows(t.name()).is_empty())
            .collect();

        let mut map = serializer.serialize_map(Some(occupied.len()))?;
        for table in occupied {
            map.serialize_entry(
                table.name(),
                &OrderedRows {
                    table,
                    rows: doc.snapshot.rows(table.name()),
                },
            )?;
        }
        map.end()
    }
}

impl Serialize for OrderedRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows {
            seq.serialize_element(&OrderedRow {
                table: self.table,
                row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for OrderedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.row.len()))?;
        for col in self.table.columns() {
            if let Some(value) = self.row.get(col) {
                map.serialize_entry(col, value)?;
            }
        }
        map.end()
    }
}

/// JSON has no spelling for NaN or infinity; serde_json would write `null`
/// and the value would not survive a reload.
fn check_finite(snapshot: &Snapshot) -> Result<()> {
    for table in snapshot.table_names() {
        for row in snapshot.rows(table) {
            let bad = row
                .iter()
                .find(|(_, v)| matches!(v, Value::Real(r) if !r.is_finite()));
            if let Some((column, _)) = bad {
                return Err(FixtureError::UnsupportedValue {
                    table: table.to_string(),
                    column: column.clone(),
                    kind: "non-finite real",
                });
            }
        }
    }
    Ok(())
}

/// Validate and encode a snapshot exactly as [`write_to_file`] stores it
pub fn render(snapshot: &Snapshot, catalog: &Catalog, path: &Path) -> Result<Vec<u8>> {
    snapshot.validate(catalog)?;
    check_finite(snapshot)?;

    let mut bytes = serde_json::to_vec_pretty(&OrderedDocument { snapshot, catalog }).map_err(
        |e| FixtureError::Format {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    )?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize a snapshot to `path` and return the SHA-256 of the bytes written.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// reader never observes a half-written snapshot. Nothing is written when
/// the snapshot does not validate.
pub fn write_to_file(snapshot: &Snapshot, catalog: &Catalog, path: &Path) -> Result<String> {
    let bytes = render(snapshot, catalog, path)?;
    let digest = hex::encode(Sha256::digest(&bytes));

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| FixtureError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FixtureError::io(dir, e))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| FixtureError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| FixtureError::io(path, e.error))?;

    debug!(path = %path.display(), rows = snapshot.row_count(), sha256 = %digest, "wrote snapshot");
    Ok(digest)
}

/// Deserialize a snapshot file.
///
/// Cataloged tables missing from the file are empty. Tables or columns the
/// catalog does not know are a `SchemaMismatch`.
pub fn load_from_file(path: &Path, catalog: &Catalog) -> Result<Snapshot> {
    let content = fs::read_to_string(path).map_err(|e| FixtureError::io(path, e))?;
    let doc: SnapshotDocument =
        serde_json::from_str(&content).map_err(|e| FixtureError::Format {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    if doc.format_version != FORMAT_VERSION {
        return Err(FixtureError::Format {
            path: path.to_path_buf(),
            detail: format!(
                "unsupported format_version {} (expected {})",
                doc.format_version, FORMAT_VERSION
            ),
        });
    }

    let mut snapshot = Snapshot::new();
    for (table, rows) in doc.tables {
        if !catalog.contains(&table) {
            return Err(FixtureError::mismatch(
                table,
                format!("table in {} is not in the catalog", path.display()),
            ));
        }
        snapshot.extend_rows(&table, rows);
    }
    snapshot.validate(catalog)?;

    debug!(path = %path.display(), rows = snapshot.row_count(), "loaded snapshot");
    Ok(snapshot)
}
