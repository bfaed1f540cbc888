use super::load_config;
use indicatif::{ProgressBar, ProgressStyle};
use scenario_fixtures::generator::{error_chain, GenerationEvent, Generator};
use scenario_fixtures::{ResetEngine, SnapshotStore, SqlDomain};
use std::path::PathBuf;
use std::time::Instant;

pub fn run(
    config: PathBuf,
    database: Option<PathBuf>,
    output: Option<PathBuf>,
    only: Vec<String>,
    progress: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(&config)?;
    let db_path = config.database(database)?;
    let out_dir = config.snapshot_dir(output);
    let catalog = config.catalog()?;
    let scenarios = config.scenario_set()?;

    if scenarios.is_empty() {
        anyhow::bail!("no scenarios declared in the configuration");
    }

    if !json {
        eprintln!(
            "Generating {} scenarios against {} [backend: {}] -> {}",
            if only.is_empty() {
                scenarios.len().to_string()
            } else {
                format!("selected ({})", only.join(", "))
            },
            db_path.display(),
            config.backend,
            out_dir.display()
        );
        eprintln!();
    }

    let mut conn = config.backend.open(&db_path)?;
    let engine = ResetEngine::new(catalog.clone(), config.backend);
    let store = SnapshotStore::new(catalog, &out_dir);

    let start_time = Instant::now();

    let pb = if progress && !json {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let report = {
        let pb = pb.as_ref();
        let mut generator = Generator::new(&engine, &store).with_observer(move |event| {
            if json {
                return;
            }
            let line = match event {
                GenerationEvent::Started { key, index, total } => {
                    if let Some(pb) = pb {
                        pb.set_message(format!("[{}/{}] {}", index + 1, total, key));
                    }
                    return;
                }
                GenerationEvent::Generated(done) => format!(
                    "  ok    {} ({} rows, {:.2}s)",
                    done.key, done.total_rows, done.duration_secs
                ),
                GenerationEvent::Failed { key, .. } => format!("  FAIL  {}", key),
            };
            match pb {
                Some(pb) => pb.println(line),
                None => eprintln!("{}", line),
            }
        });

        if only.is_empty() {
            generator.run(&mut conn, &SqlDomain, &scenarios)
        } else {
            generator.run_only(&mut conn, &SqlDomain, &scenarios, &only)?
        }
    };

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        eprintln!();
        eprintln!("Generation summary:");
        eprintln!("  Generated: {}", report.generated.len());
        if !report.skipped.is_empty() {
            eprintln!("  Skipped:   {} ({})", report.skipped.len(), report.skipped.join(", "));
        }
        if !report.removed.is_empty() {
            eprintln!("  Removed:   {} ({})", report.removed.len(), report.removed.join(", "));
        }
        eprintln!("  Time: {:.3?}", start_time.elapsed());
        eprintln!();
    }

    if let Some(err) = &report.failure {
        eprintln!(
            "Scenario '{}' failed: {}",
            err.scenario_key().unwrap_or("?"),
            error_chain(err)
        );
        std::process::exit(1);
    }

    if !json {
        eprintln!("Result: OK");
    }
    Ok(())
}
