//! Row-level comparison of two snapshots.
//!
//! Rows have no declared primary key here, so they are compared by full
//! content as multisets: a row that appears twice in `old` and once in `new`
//! counts as one removal. A modified row shows up as one removal plus one
//! addition.

use super::{Row, Snapshot};
use ahash::AHashMap;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeSet;

/// Differences for a single table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TableDiff {
    pub table: String,
    pub old_rows: usize,
    pub new_rows: usize,
    pub added: usize,
    pub removed: usize,
}

impl TableDiff {
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Differences between two snapshots, one entry per table present in either
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct SnapshotDiff {
    pub tables: Vec<TableDiff>,
}

impl SnapshotDiff {
    pub fn has_changes(&self) -> bool {
        self.tables.iter().any(TableDiff::has_changes)
    }

    pub fn table(&self, name: &str) -> Option<&TableDiff> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// True when `new` kept every row of `old`
    pub fn is_superset(&self) -> bool {
        self.tables.iter().all(|t| t.removed == 0)
    }
}

fn row_key(row: &Row) -> String {
    // BTreeMap keys are sorted, so equal rows encode identically. The debug
    // form keeps Integer(1) and Real(1.0) apart.
    format!("{:?}", row)
}

fn count_rows(rows: &[Row]) -> AHashMap<String, isize> {
    let mut counts = AHashMap::new();
    for row in rows {
        *counts.entry(row_key(row)).or_insert(0) += 1;
    }
    counts
}

/// Compare `old` against `new`, tables sorted by name
pub fn diff(old: &Snapshot, new: &Snapshot) -> SnapshotDiff {
    let names: BTreeSet<&str> = old.table_names().chain(new.table_names()).collect();

    let tables = names
        .into_iter()
        .map(|name| {
            let old_rows = old.rows(name);
            let new_rows = new.rows(name);

            let mut balance = count_rows(old_rows);
            for (key, n) in count_rows(new_rows) {
                *balance.entry(key).or_insert(0) -= n;
            }

            let removed = balance.values().filter(|&&n| n > 0).sum::<isize>() as usize;
            let added = balance.values().filter(|&&n| n < 0).map(|n| -n).sum::<isize>() as usize;

            TableDiff {
                table: name.to_string(),
                old_rows: old_rows.len(),
                new_rows: new_rows.len(),
                added,
                removed,
            }
        })
        .collect();

    SnapshotDiff { tables }
}

/// Snapshots are equal when every table holds the same rows with the same
/// multiplicity, in any order.
impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        !diff(self, other).has_changes()
    }
}

impl Snapshot {
    /// Every row of `other` is present here (with multiplicity)
    pub fn is_superset_of(&self, other: &Snapshot) -> bool {
        diff(other, self).is_superset()
    }
}
