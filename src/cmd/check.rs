use super::load_config;
use std::path::PathBuf;

pub fn run(config: PathBuf, database: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(&config)?;
    let db_path = config.database(database)?;
    let catalog = config.catalog()?;

    if !db_path.exists() {
        anyhow::bail!("database does not exist: {}", db_path.display());
    }
    let conn = config.backend.open(&db_path)?;

    eprintln!(
        "Checking {} cataloged tables against {}",
        catalog.len(),
        db_path.display()
    );
    eprintln!();

    let problems = catalog.verify(&conn)?;
    for problem in &problems {
        eprintln!("  - {}", problem);
    }

    if problems.is_empty() {
        eprintln!("Result: PASSED");
        Ok(())
    } else {
        eprintln!();
        eprintln!("Result: FAILED ({} problems)", problems.len());
        std::process::exit(1);
    }
}
