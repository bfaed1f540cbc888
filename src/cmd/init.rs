use scenario_fixtures::catalog::introspect;
use scenario_fixtures::{Backend, FixtureConfig};
use std::path::PathBuf;

pub fn run(database: PathBuf, schema: String, output: PathBuf, force: bool) -> anyhow::Result<()> {
    if !database.exists() {
        anyhow::bail!("database does not exist: {}", database.display());
    }
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let conn = Backend::Sqlite.open(&database)?;
    let catalog = introspect(&conn, &schema)?;

    let mut config = FixtureConfig::from_catalog(&catalog, Backend::Sqlite);
    config.database = Some(database);
    config.save(&output)?;

    eprintln!(
        "Wrote {} with {} tables. Reorder tables and add scenarios as needed.",
        output.display(),
        catalog.len()
    );
    Ok(())
}
