use super::load_config;
use scenario_fixtures::{Loader, ResetEngine, SnapshotStore};
use std::path::PathBuf;

pub fn run(
    key: String,
    config: PathBuf,
    database: Option<PathBuf>,
    dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(&config)?;
    let db_path = config.database(database)?;
    let catalog = config.catalog()?;

    let engine = ResetEngine::new(catalog.clone(), config.backend);
    let store = SnapshotStore::new(catalog, config.snapshot_dir(dir));

    let mut conn = config.backend.open(&db_path)?;
    let stats = Loader::new(&engine, &store).load_scenario(&mut conn, &key)?;

    eprintln!("Loaded '{}' into {}: {}", key, db_path.display(), stats);
    Ok(())
}
