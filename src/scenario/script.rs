//! Declarative scenarios defined in the project configuration file.
//!
//! ```yaml
//! scenarios:
//!   - key: CreateAdminUser
//!     parent: CreateUsers
//!     require:
//!       - sql: SELECT id FROM users WHERE email = 'u1@example.com'
//!         message: user u1@example.com
//!     statements:
//!       - INSERT INTO user_roles (user_id, role_id)
//!         SELECT u.id, r.id FROM users u, roles r
//!         WHERE u.email = 'u1@example.com' AND r.name = 'Admin'
//! ```

use super::{Scenario, SqlContext, SqlDomain};
use crate::error::ScenarioError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A query that must return at least one row before statements run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequireCheck {
    pub sql: String,
    /// What is missing when the query returns no rows
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptScenarioConfig {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<RequireCheck>,
    #[serde(default)]
    pub statements: Vec<String>,
}

/// Runs the configured checks, then the statements in order
#[derive(Debug, Clone)]
pub struct ScriptScenario {
    config: ScriptScenarioConfig,
}

impl ScriptScenario {
    pub fn new(config: ScriptScenarioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScriptScenarioConfig {
        &self.config
    }
}

impl Scenario<SqlDomain> for ScriptScenario {
    fn key(&self) -> &str {
        &self.config.key
    }

    fn parent(&self) -> Option<&str> {
        self.config.parent.as_deref()
    }

    fn populate(&self, ctx: &mut SqlContext<'_>) -> Result<(), ScenarioError> {
        for check in &self.config.require {
            ctx.require_value(&check.sql, [], &check.message)?;
        }
        for (i, statement) in self.config.statements.iter().enumerate() {
            debug!(scenario = %self.config.key, statement = i, "running statement");
            ctx.execute_batch(statement)?;
        }
        Ok(())
    }
}
