//! Shared fixtures for integration tests: a roles/users/user_roles schema
//! and the scenarios that populate it.

#![allow(dead_code)]

use chrono::NaiveDate;
use rusqlite::Connection;
use scenario_fixtures::{
    Backend, Catalog, ResetEngine, Scenario, ScenarioError, ScenarioSet, SnapshotStore,
    SqlContext, SqlDomain, TableDescriptor, Value,
};
use std::path::Path;

pub const SCHEMA: &str = r#"
CREATE TABLE roles (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    age INTEGER,
    created_at TEXT
);

CREATE TABLE user_roles (
    user_id TEXT NOT NULL REFERENCES users(id),
    role_id TEXT NOT NULL REFERENCES roles(id),
    PRIMARY KEY (user_id, role_id)
);
"#;

pub fn catalog() -> Catalog {
    Catalog::new(vec![
        TableDescriptor::new("main.roles", ["id", "name"]),
        TableDescriptor::new("main.users", ["id", "email", "name", "age", "created_at"]),
        TableDescriptor::new("main.user_roles", ["user_id", "role_id"]),
    ])
    .unwrap()
}

/// In-memory database with foreign keys enforced and the test schema created
pub fn open_db() -> Connection {
    let conn = Backend::Sqlite.open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

pub fn engine() -> ResetEngine {
    ResetEngine::new(catalog(), Backend::Sqlite)
}

pub fn store(dir: &Path) -> SnapshotStore {
    SnapshotStore::new(catalog(), dir)
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

pub fn created_at() -> Value {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
        .into()
}

pub struct CreateRoles;

impl Scenario<SqlDomain> for CreateRoles {
    fn key(&self) -> &str {
        "CreateRoles"
    }

    fn populate(&self, ctx: &mut SqlContext<'_>) -> Result<(), ScenarioError> {
        ctx.insert("main.roles", &[("id", "r1".into()), ("name", "Admin".into())])
    }
}

pub struct CreateUsers;

impl Scenario<SqlDomain> for CreateUsers {
    fn key(&self) -> &str {
        "CreateUsers"
    }

    fn parent(&self) -> Option<&str> {
        Some("CreateRoles")
    }

    fn populate(&self, ctx: &mut SqlContext<'_>) -> Result<(), ScenarioError> {
        ctx.require_value("SELECT id FROM roles WHERE name = 'Admin'", [], "role Admin")?;
        for i in 1..=5 {
            ctx.insert(
                "main.users",
                &[
                    ("id", format!("u{}", i).into()),
                    ("email", format!("u{}@example.com", i).into()),
                    ("name", format!("User {}", i).into()),
                    ("age", (20 + i).into()),
                    ("created_at", created_at()),
                ],
            )?;
        }
        Ok(())
    }
}

pub struct CreateAdminUser {
    pub email: &'static str,
}

impl Scenario<SqlDomain> for CreateAdminUser {
    fn key(&self) -> &str {
        "CreateAdminUser"
    }

    fn parent(&self) -> Option<&str> {
        Some("CreateUsers")
    }

    fn populate(&self, ctx: &mut SqlContext<'_>) -> Result<(), ScenarioError> {
        let user_id = ctx.require_value(
            "SELECT id FROM users WHERE email = ?1",
            [self.email],
            &format!("user {}", self.email),
        )?;
        let role_id =
            ctx.require_value("SELECT id FROM roles WHERE name = ?1", ["Admin"], "role Admin")?;
        ctx.insert("main.user_roles", &[("user_id", user_id), ("role_id", role_id)])
    }
}

pub fn scenarios(admin_email: &'static str) -> ScenarioSet<SqlDomain> {
    ScenarioSet::new(vec![
        Box::new(CreateRoles),
        Box::new(CreateUsers),
        Box::new(CreateAdminUser { email: admin_email }),
    ])
    .unwrap()
}
