//! YAML project configuration.
//!
//! ```yaml
//! backend: sqlite
//! database: app.db
//! snapshot_dir: fixtures
//! tables:
//!   - name: main.roles
//!     columns: [id, name]
//!   - name: main.users
//!     columns: [id, email, name, created_at]
//! scenarios:
//!   - key: CreateRoles
//!     statements:
//!       - INSERT INTO roles (id, name) VALUES ('r1', 'Admin')
//! ```

use crate::backend::Backend;
use crate::catalog::{Catalog, TableDescriptor};
use crate::error::{FixtureError, Result};
use crate::scenario::{Scenario, ScenarioSet, ScriptScenario, ScriptScenarioConfig, SqlDomain};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "fixtures.yaml";
pub const DEFAULT_SNAPSHOT_DIR: &str = "fixtures";

/// One cataloged table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub columns: Vec<String>,
}

/// Complete YAML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Constraint-toggling backend
    pub backend: Backend,
    /// Default database path (overridden by --database)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Directory holding snapshot files (overridden by --output/--dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<PathBuf>,
    /// Table catalog, in catalog order
    pub tables: Vec<TableConfig>,
    /// Declarative scenarios
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<ScriptScenarioConfig>,
}

impl FixtureConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| FixtureError::io(path, e))?;
        Self::from_yaml(&content)
            .map_err(|e| FixtureError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).map_err(|e| FixtureError::Config(e.to_string()))
    }

    /// Save configuration to a YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml_ng::to_string(self).map_err(|e| FixtureError::Config(e.to_string()))?;
        fs::write(path, content).map_err(|e| FixtureError::io(path, e))
    }

    pub fn from_catalog(catalog: &Catalog, backend: Backend) -> Self {
        Self {
            backend,
            tables: catalog
                .tables()
                .iter()
                .map(|t| TableConfig {
                    name: t.name().to_string(),
                    columns: t.columns().to_vec(),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::new(
            self.tables
                .iter()
                .map(|t| TableDescriptor::new(t.name.clone(), t.columns.clone()))
                .collect(),
        )
    }

    pub fn scenario_set(&self) -> Result<ScenarioSet<SqlDomain>> {
        ScenarioSet::new(
            self.scenarios
                .iter()
                .cloned()
                .map(|c| Box::new(ScriptScenario::new(c)) as Box<dyn Scenario<SqlDomain>>)
                .collect(),
        )
    }

    /// Snapshot directory: explicit override, then config, then the default
    pub fn snapshot_dir(&self, overridden: Option<PathBuf>) -> PathBuf {
        overridden
            .or_else(|| self.snapshot_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR))
    }

    /// Database path: explicit override, then config
    pub fn database(&self, overridden: Option<PathBuf>) -> Result<PathBuf> {
        overridden.or_else(|| self.database.clone()).ok_or_else(|| {
            FixtureError::Config("no database given (use --database or `database:`)".to_string())
        })
    }
}
