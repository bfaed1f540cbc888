//! Scenarios: named, composable seeding units.
//!
//! A scenario has a unique key (which also names its snapshot file), at most
//! one parent, and a populate routine that writes through an externally
//! supplied unit of work. Scenarios never call each other; a child only
//! depends on the snapshot its parent generated.
//!
//! The fixture engine knows nothing about domain entities. The [`Domain`]
//! trait is the seam where an application plugs in its repositories or
//! unit-of-work; [`SqlDomain`] is a ready-made one for plain SQL.

mod graph;
mod script;
mod sql;

pub use graph::{ScenarioInfo, ScenarioSet};
pub use script::{RequireCheck, ScriptScenario, ScriptScenarioConfig};
pub use sql::{SqlContext, SqlDomain};

use crate::error::ScenarioError;
use rusqlite::Connection;

/// The write capability handed to populate routines.
///
/// `begin` opens a unit of work on the connection (normally a transaction)
/// and `commit` finishes it. Dropping a context without committing must
/// discard its writes.
pub trait Domain {
    type Context<'conn>;

    fn begin<'conn>(&self, conn: &'conn mut Connection) -> Result<Self::Context<'conn>, ScenarioError>;

    fn commit(&self, ctx: Self::Context<'_>) -> Result<(), ScenarioError>;
}

/// A named unit of seeding logic
pub trait Scenario<D: Domain> {
    /// Unique key; also the snapshot file name
    fn key(&self) -> &str;

    /// Key of the scenario whose snapshot this one builds on
    fn parent(&self) -> Option<&str> {
        None
    }

    /// Write this scenario's data.
    ///
    /// Implementations should look up inherited data they rely on and
    /// return [`ScenarioError::MissingPrerequisite`] when it is absent.
    fn populate(&self, ctx: &mut D::Context<'_>) -> Result<(), ScenarioError>;
}
