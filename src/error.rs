//! Error types shared by every fixture component.
//!
//! Every variant aborts the enclosing `clear`/`seed`/`generate`/`load`
//! operation. Database work runs inside transactions, so a failed operation
//! never leaves partial table content behind.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FixtureError>;

/// Errors raised by a scenario's populate routine or its unit of work.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Data inherited from the parent snapshot could not be found
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    /// Any error raised by domain code (repositories, services, ...)
    #[error(transparent)]
    Domain(#[from] anyhow::Error),
}

impl ScenarioError {
    pub fn missing(what: impl Into<String>) -> Self {
        ScenarioError::MissingPrerequisite(what.into())
    }
}

#[derive(Debug, Error)]
pub enum FixtureError {
    /// Catalog and live schema (or snapshot file) disagree
    #[error("schema mismatch in {table}: {detail}")]
    SchemaMismatch { table: String, detail: String },

    /// A scenario's populate routine failed or its transaction did not commit
    #[error("scenario '{key}' failed: {source}")]
    Generation {
        key: String,
        #[source]
        source: ScenarioError,
    },

    /// A reset/seed/read/write step failed while generating a scenario
    #[error("scenario '{key}' failed during {step}: {source}")]
    ScenarioStep {
        key: String,
        step: &'static str,
        #[source]
        source: Box<FixtureError>,
    },

    /// No snapshot file exists for the requested scenario key
    #[error("no snapshot for scenario '{key}' (expected {})", path.display())]
    ScenarioNotFound { key: String, path: PathBuf },

    /// The backend could not suspend or restore constraint enforcement
    #[error("could not {action} constraints on {table}: {source}")]
    ConstraintToggle {
        table: String,
        action: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Re-enabling enforcement found rows that violate a constraint
    #[error("constraint violation in {table}: {detail}")]
    ConstraintViolation { table: String, detail: String },

    /// A row could not be inserted while seeding
    #[error("insert into {table} failed at row {row}: {source}")]
    Insert {
        table: String,
        row: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("unsupported {kind} value in {table}.{column}")]
    UnsupportedValue {
        table: String,
        column: String,
        kind: &'static str,
    },

    /// Invalid scenario graph: duplicate keys, unknown parents or cycles
    #[error("invalid scenario graph: {0}")]
    ScenarioGraph(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid snapshot file {}: {detail}", path.display())]
    Format { path: PathBuf, detail: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl FixtureError {
    pub(crate) fn mismatch(table: impl Into<String>, detail: impl Into<String>) -> Self {
        FixtureError::SchemaMismatch {
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FixtureError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn step(key: &str, step: &'static str, source: FixtureError) -> Self {
        FixtureError::ScenarioStep {
            key: key.to_string(),
            step,
            source: Box::new(source),
        }
    }

    /// Scenario key attached to a generation error, if any
    pub fn scenario_key(&self) -> Option<&str> {
        match self {
            FixtureError::Generation { key, .. }
            | FixtureError::ScenarioStep { key, .. }
            | FixtureError::ScenarioNotFound { key, .. } => Some(key),
            _ => None,
        }
    }

    /// True when the failure is a populate routine missing inherited data
    pub fn is_missing_prerequisite(&self) -> bool {
        matches!(
            self,
            FixtureError::Generation {
                source: ScenarioError::MissingPrerequisite(_),
                ..
            }
        )
    }
}
