mod check;
mod diff;
mod generate;
mod init;
mod list;
mod load;
mod schema;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use scenario_fixtures::config::{FixtureConfig, DEFAULT_CONFIG_FILE};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "scenario-fixtures")]
#[command(author = "Helge Sverre <helge.sverre@gmail.com>")]
#[command(version)]
#[command(about = "Generate and load scenario-based database fixtures", long_about = None)]
pub struct Cli {
    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay every scenario and write one snapshot file per scenario
    Generate {
        /// Project configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// SQLite database to generate against (overrides `database:`)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output directory for snapshot files (overrides `snapshot_dir:`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only generate these scenarios and their ancestors (comma-separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Show progress during generation
        #[arg(short, long)]
        progress: bool,

        /// Output results as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Reset the database to a generated scenario snapshot
    Load {
        /// Scenario key
        key: String,

        /// Project configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// SQLite database to load into (overrides `database:`)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Directory holding snapshot files (overrides `snapshot_dir:`)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List scenarios in generation order
    List {
        /// Project configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Output results as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Check the table catalog against the live database schema
    Check {
        /// Project configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// SQLite database to inspect (overrides `database:`)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Compare two snapshot files row by row
    Diff {
        /// Old snapshot file
        old: PathBuf,

        /// New snapshot file
        new: PathBuf,

        /// Project configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Only compare tables matching these glob patterns (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Output results as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Write a starter configuration from an existing database schema
    Init {
        /// SQLite database to introspect
        #[arg(short, long)]
        database: PathBuf,

        /// Schema to catalog
        #[arg(long, default_value = "main")]
        schema: String,

        /// Output configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Print JSON Schemas for snapshot files and --json outputs
    Schema {
        /// Schema name (prints all when omitted)
        name: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            config,
            database,
            output,
            only,
            progress,
            json,
        } => generate::run(config, database, output, only, progress, json),
        Commands::Load {
            key,
            config,
            database,
            dir,
        } => load::run(key, config, database, dir),
        Commands::List { config, json } => list::run(config, json),
        Commands::Check { config, database } => check::run(config, database),
        Commands::Diff {
            old,
            new,
            config,
            tables,
            json,
        } => diff::run(old, new, config, tables, json),
        Commands::Init {
            database,
            schema,
            output,
            force,
        } => init::run(database, schema, output, force),
        Commands::Schema { name } => schema::run(name),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "scenario-fixtures",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<FixtureConfig> {
    if !path.exists() {
        anyhow::bail!("config file does not exist: {}", path.display());
    }
    Ok(FixtureConfig::load(path)?)
}
