//! JSON Schema generation for snapshot files and CLI output types.
//!
//! Schemas are generated using the schemars crate and can be exported via the `schema` subcommand.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// Returns every schema by name.
/// Uses BTreeMap for deterministic ordering (important for diffable output).
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    // snapshot files written by generate
    schemas.insert(
        "snapshot",
        schema_for!(crate::snapshot::SnapshotDocument),
    );

    // generate --json
    schemas.insert(
        "generate",
        schema_for!(crate::generator::GenerationSummary),
    );

    // diff --json
    schemas.insert("diff", schema_for!(crate::snapshot::SnapshotDiff));

    // list --json
    schemas.insert("list", schema_for!(Vec<crate::scenario::ScenarioInfo>));

    schemas
}

/// Generate a single schema by name.
pub fn get_schema(name: &str) -> Option<Schema> {
    all_schemas().remove(name)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
