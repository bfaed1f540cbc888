//! Replays scenarios in dependency order and persists their snapshots.
//!
//! For each scenario:
//! 1. clear every cataloged table
//! 2. seed the parent's snapshot file, if the scenario has a parent
//! 3. run `populate` inside the domain's own unit of work
//! 4. capture the database and write `{key}.json`
//!
//! The first failure halts the batch: later scenarios are skipped because
//! they could build on a missing or invalid snapshot. The failed scenario's
//! file is never written, and files left by earlier runs for the failed and
//! skipped scenarios are removed so none of them can be loaded as current.

use crate::engine::ResetEngine;
use crate::error::{FixtureError, Result};
use crate::scenario::{Domain, Scenario, ScenarioSet};
use crate::snapshot::SnapshotStore;
use rusqlite::Connection;
use schemars::JsonSchema;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// A successfully generated scenario
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GeneratedScenario {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub path: PathBuf,
    /// Row count per cataloged table, catalog order
    pub tables: Vec<TableCount>,
    pub total_rows: usize,
    /// SHA-256 of the written file, hex encoded
    pub sha256: String,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TableCount {
    pub table: String,
    pub rows: usize,
}

/// Progress notifications for callers that report as they go
#[derive(Debug)]
pub enum GenerationEvent<'a> {
    Started { key: &'a str, index: usize, total: usize },
    Generated(&'a GeneratedScenario),
    Failed { key: &'a str, error: &'a FixtureError },
}

/// Outcome of a generator run
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub generated: Vec<GeneratedScenario>,
    /// The scenario that halted the batch and why
    pub failure: Option<FixtureError>,
    /// Scenarios not attempted because of the failure
    pub skipped: Vec<String>,
    /// Failed or skipped scenarios whose file from an earlier run was deleted
    pub removed: Vec<String>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn into_result(self) -> Result<Vec<GeneratedScenario>> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.generated),
        }
    }

    pub fn summary(&self) -> GenerationSummary {
        GenerationSummary {
            success: self.is_success(),
            generated: self.generated.clone(),
            failed: self.failure.as_ref().map(|err| FailedScenario {
                key: err.scenario_key().unwrap_or_default().to_string(),
                error: error_chain(err),
            }),
            skipped: self.skipped.clone(),
            removed: self.removed.clone(),
        }
    }
}

/// JSON output of the generate command
#[derive(Debug, Serialize, JsonSchema)]
pub struct GenerationSummary {
    pub success: bool,
    pub generated: Vec<GeneratedScenario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<FailedScenario>,
    pub skipped: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FailedScenario {
    pub key: String,
    /// Full error chain, outermost first
    pub error: String,
}

/// Render an error with every source, separated by `: `
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

pub struct Generator<'a> {
    engine: &'a ResetEngine,
    store: &'a SnapshotStore,
    observer: Option<Box<dyn FnMut(GenerationEvent<'_>) + 'a>>,
}

impl<'a> Generator<'a> {
    pub fn new(engine: &'a ResetEngine, store: &'a SnapshotStore) -> Self {
        Self {
            engine,
            store,
            observer: None,
        }
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(GenerationEvent<'_>) + 'a,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Generate every scenario, failing on the first error
    pub fn generate<D: Domain>(
        &mut self,
        conn: &mut Connection,
        domain: &D,
        scenarios: &ScenarioSet<D>,
    ) -> Result<Vec<GeneratedScenario>> {
        self.run(conn, domain, scenarios).into_result()
    }

    /// Generate every scenario in dependency order
    pub fn run<D: Domain>(
        &mut self,
        conn: &mut Connection,
        domain: &D,
        scenarios: &ScenarioSet<D>,
    ) -> GenerationReport {
        let batch: Vec<&dyn Scenario<D>> = scenarios.ordered().collect();
        self.run_batch(conn, domain, &batch)
    }

    /// Generate the listed scenarios and their ancestors
    pub fn run_only<D: Domain>(
        &mut self,
        conn: &mut Connection,
        domain: &D,
        scenarios: &ScenarioSet<D>,
        keys: &[String],
    ) -> Result<GenerationReport> {
        let batch = scenarios.select(keys)?;
        Ok(self.run_batch(conn, domain, &batch))
    }

    fn run_batch<D: Domain>(
        &mut self,
        conn: &mut Connection,
        domain: &D,
        batch: &[&dyn Scenario<D>],
    ) -> GenerationReport {
        let mut report = GenerationReport::default();
        let total = batch.len();

        for (index, scenario) in batch.iter().enumerate() {
            let key = scenario.key();
            self.notify(GenerationEvent::Started { key, index, total });

            match self.generate_one(conn, domain, *scenario) {
                Ok(generated) => {
                    info!(
                        scenario = key,
                        rows = generated.total_rows,
                        path = %generated.path.display(),
                        "generated scenario"
                    );
                    self.notify(GenerationEvent::Generated(&generated));
                    report.generated.push(generated);
                }
                Err(err) => {
                    error!(scenario = key, error = %err, "scenario generation failed");
                    self.notify(GenerationEvent::Failed { key, error: &err });
                    report.skipped = batch[index + 1..]
                        .iter()
                        .map(|s| s.key().to_string())
                        .collect();
                    report.failure = Some(err);
                    report.removed = self.remove_stale(
                        std::iter::once(key).chain(report.skipped.iter().map(String::as_str)),
                    );
                    break;
                }
            }
        }

        report
    }

    /// Delete snapshot files that no longer match what their scenario produces
    fn remove_stale<'k>(&self, keys: impl Iterator<Item = &'k str>) -> Vec<String> {
        let mut removed = Vec::new();
        for key in keys {
            match self.store.remove(key) {
                Ok(true) => {
                    warn!(scenario = key, "removed stale snapshot");
                    removed.push(key.to_string());
                }
                Ok(false) => {}
                Err(err) => warn!(scenario = key, error = %err, "could not remove stale snapshot"),
            }
        }
        removed
    }

    fn generate_one<D: Domain>(
        &self,
        conn: &mut Connection,
        domain: &D,
        scenario: &dyn Scenario<D>,
    ) -> Result<GeneratedScenario> {
        let start = Instant::now();
        let key = scenario.key();

        self.engine
            .clear(conn)
            .map_err(|e| FixtureError::step(key, "clear", e))?;

        if let Some(parent) = scenario.parent() {
            let inherited = self
                .store
                .load(parent)
                .map_err(|e| FixtureError::step(key, "parent load", e))?;
            self.engine
                .seed(conn, &inherited)
                .map_err(|e| FixtureError::step(key, "parent seed", e))?;
        }

        let populated = domain.begin(conn).and_then(|mut ctx| {
            scenario.populate(&mut ctx)?;
            domain.commit(ctx)
        });
        populated.map_err(|source| FixtureError::Generation {
            key: key.to_string(),
            source,
        })?;

        let snapshot = self
            .store
            .read_from_database(conn)
            .map_err(|e| FixtureError::step(key, "capture", e))?;
        let stored = self
            .store
            .save(key, &snapshot)
            .map_err(|e| FixtureError::step(key, "write", e))?;

        let tables = snapshot
            .table_counts(self.store.catalog())
            .into_iter()
            .map(|(table, rows)| TableCount { table, rows })
            .collect();

        Ok(GeneratedScenario {
            key: key.to_string(),
            parent: scenario.parent().map(String::from),
            path: stored.path,
            tables,
            total_rows: snapshot.row_count(),
            sha256: stored.sha256,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    fn notify(&mut self, event: GenerationEvent<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}
