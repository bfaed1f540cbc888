use super::load_config;
use std::path::PathBuf;

pub fn run(config: PathBuf, json: bool) -> anyhow::Result<()> {
    let config = load_config(&config)?;
    let scenarios = config.scenario_set()?;
    let info = scenarios.describe();

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    if info.is_empty() {
        eprintln!("No scenarios declared.");
        return Ok(());
    }

    println!("Generation order ({} scenarios):", info.len());
    for (i, scenario) in info.iter().enumerate() {
        let indent = "  ".repeat(scenario.depth);
        match &scenario.parent {
            Some(parent) => println!("  {:>3}. {}{} <- {}", i + 1, indent, scenario.key, parent),
            None => println!("  {:>3}. {}{}", i + 1, indent, scenario.key),
        }
    }
    Ok(())
}
