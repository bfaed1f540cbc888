use super::load_config;
use glob::Pattern;
use scenario_fixtures::snapshot::{self, load_from_file, SnapshotDiff};
use std::path::PathBuf;

pub fn run(
    old: PathBuf,
    new: PathBuf,
    config: PathBuf,
    tables: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(&config)?;
    let catalog = config.catalog()?;

    let patterns = tables
        .iter()
        .map(|t| Pattern::new(t))
        .collect::<Result<Vec<_>, _>>()?;

    let old_snapshot = load_from_file(&old, &catalog)?;
    let new_snapshot = load_from_file(&new, &catalog)?;

    let mut result = snapshot::diff(&old_snapshot, &new_snapshot);
    if !patterns.is_empty() {
        result
            .tables
            .retain(|t| patterns.iter().any(|p| p.matches(&t.table)));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text(&result);
    }
    Ok(())
}

fn print_text(result: &SnapshotDiff) {
    if !result.has_changes() {
        println!("No differences.");
        return;
    }

    println!("{:<40} {:>8} {:>8} {:>8} {:>8}", "TABLE", "OLD", "NEW", "ADDED", "REMOVED");
    for t in result.tables.iter().filter(|t| t.has_changes()) {
        println!(
            "{:<40} {:>8} {:>8} {:>8} {:>8}",
            t.table, t.old_rows, t.new_rows, t.added, t.removed
        );
    }
    if result.is_superset() {
        println!();
        println!("New snapshot keeps every row of the old one.");
    }
}
