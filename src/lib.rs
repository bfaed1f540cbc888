//! Scenario-based database fixtures.
//!
//! Scenarios populate a database through an application's own write path.
//! The [`generator`] replays them in dependency order and captures each
//! result as a snapshot file; the [`loader`] resets a test database to one of
//! those snapshots.
//!
//! ```ignore
//! use scenario_fixtures::{Backend, Loader, ResetEngine, SnapshotStore};
//!
//! let catalog = config.catalog()?;
//! let engine = ResetEngine::new(catalog.clone(), Backend::Sqlite);
//! let store = SnapshotStore::new(catalog, "fixtures");
//!
//! let mut conn = Backend::Sqlite.open("test.db".as_ref())?;
//! Loader::new(&engine, &store).load_scenario(&mut conn, "CreateAdminUser")?;
//! ```

pub mod backend;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod json_schema;
pub mod loader;
pub mod scenario;
pub mod snapshot;
pub mod value;

pub use backend::{Backend, ConstraintToggle};
pub use catalog::{Catalog, TableDescriptor};
pub use config::FixtureConfig;
pub use engine::{ResetEngine, ResetStats};
pub use error::{FixtureError, Result, ScenarioError};
pub use generator::{GeneratedScenario, GenerationReport, Generator};
pub use loader::{LoadStats, Loader};
pub use scenario::{Domain, Scenario, ScenarioSet, SqlContext, SqlDomain};
pub use snapshot::{Row, Snapshot, SnapshotStore, StoredSnapshot};
pub use value::Value;
