//! End-to-end generation tests: scenarios replayed in dependency order and
//! captured as snapshot files.

mod common;

use anyhow::anyhow;
use common::{count, engine, open_db, scenarios, store, CreateAdminUser, CreateRoles, CreateUsers};
use rusqlite::{params, Connection, Transaction};
use scenario_fixtures::generator::GenerationEvent;
use scenario_fixtures::{
    Domain, FixtureError, Generator, Loader, Scenario, ScenarioError, ScenarioSet, SqlContext,
    SqlDomain,
};
use sha2::{Digest, Sha256};
use std::fs;
use tempfile::TempDir;

struct Broken;

impl Scenario<SqlDomain> for Broken {
    fn key(&self) -> &str {
        "Broken"
    }

    fn parent(&self) -> Option<&str> {
        Some("CreateRoles")
    }

    fn populate(&self, ctx: &mut SqlContext<'_>) -> Result<(), ScenarioError> {
        ctx.execute("INSERT INTO roles (id, name) VALUES ('r9', 'Temp')", [])?;
        Err(ScenarioError::Domain(anyhow!("payment gateway unavailable")))
    }
}

struct AuditAdmins;

impl Scenario<SqlDomain> for AuditAdmins {
    fn key(&self) -> &str {
        "AuditAdmins"
    }

    fn parent(&self) -> Option<&str> {
        Some("CreateAdminUser")
    }

    fn populate(&self, _ctx: &mut SqlContext<'_>) -> Result<(), ScenarioError> {
        Ok(())
    }
}

// =============================================================================
// Generation order and content
// =============================================================================

#[test]
fn test_generates_chain_of_three() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();

    let generated = Generator::new(&engine, &store)
        .generate(&mut conn, &SqlDomain, &scenarios("u1@example.com"))
        .unwrap();

    let keys: Vec<&str> = generated.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["CreateRoles", "CreateUsers", "CreateAdminUser"]);
    for key in &keys {
        assert!(store.exists(key), "{} not written", key);
    }

    let admin = &generated[2];
    assert_eq!(admin.parent.as_deref(), Some("CreateUsers"));
    assert_eq!(admin.total_rows, 7);
    let counts: Vec<(&str, usize)> = admin
        .tables
        .iter()
        .map(|t| (t.table.as_str(), t.rows))
        .collect();
    assert_eq!(
        counts,
        vec![("main.roles", 1), ("main.users", 5), ("main.user_roles", 1)]
    );
    assert_eq!(admin.sha256.len(), 64);

    let roles = store.load("CreateRoles").unwrap();
    assert_eq!(roles.rows("main.roles").len(), 1);
    assert!(roles.rows("main.users").is_empty());

    let users = store.load("CreateUsers").unwrap();
    assert_eq!(users.rows("main.roles").len(), 1);
    assert_eq!(users.rows("main.users").len(), 5);
    assert!(users.rows("main.user_roles").is_empty());
}

#[test]
fn test_loaded_admin_links_user_and_role() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();
    Generator::new(&engine, &store)
        .generate(&mut conn, &SqlDomain, &scenarios("u1@example.com"))
        .unwrap();

    // a different database, as a test suite would use
    let mut test_db = open_db();
    Loader::new(&engine, &store)
        .load_scenario(&mut test_db, "CreateAdminUser")
        .unwrap();

    assert_eq!(count(&test_db, "roles"), 1);
    assert_eq!(count(&test_db, "users"), 5);
    let role: String = test_db
        .query_row(
            "SELECT r.name FROM user_roles ur
             JOIN users u ON u.id = ur.user_id
             JOIN roles r ON r.id = ur.role_id
             WHERE u.email = 'u1@example.com'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(role, "Admin");
}

#[test]
fn test_child_snapshot_is_superset_of_parent() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();
    let set = scenarios("u1@example.com");
    Generator::new(&engine, &store)
        .generate(&mut conn, &SqlDomain, &set)
        .unwrap();

    for scenario in set.ordered() {
        if let Some(parent) = scenario.parent() {
            let child = store.load(scenario.key()).unwrap();
            let parent = store.load(parent).unwrap();
            assert!(
                child.is_superset_of(&parent),
                "{} lost rows from its parent",
                scenario.key()
            );
        }
    }
}

#[test]
fn test_generation_is_deterministic() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let engine = engine();
    let (first, second) = (store(first_dir.path()), store(second_dir.path()));

    let mut conn = open_db();
    let a = Generator::new(&engine, &first)
        .generate(&mut conn, &SqlDomain, &scenarios("u1@example.com"))
        .unwrap();
    // reuse the dirty connection: every scenario starts from a clear
    let b = Generator::new(&engine, &second)
        .generate(&mut conn, &SqlDomain, &scenarios("u1@example.com"))
        .unwrap();

    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.sha256, y.sha256, "{} differs between runs", x.key);
        assert_eq!(fs::read(&x.path).unwrap(), fs::read(&y.path).unwrap());
    }
}

#[test]
fn test_reported_hash_is_hash_of_file() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();

    let generated = Generator::new(&engine, &store)
        .generate(&mut conn, &SqlDomain, &scenarios("u1@example.com"))
        .unwrap();

    for scenario in &generated {
        let on_disk = hex::encode(Sha256::digest(fs::read(&scenario.path).unwrap()));
        assert_eq!(scenario.sha256, on_disk, "{} hash differs", scenario.key);
    }
}

// =============================================================================
// Failures
// =============================================================================

fn admin_set(email: &'static str) -> ScenarioSet<SqlDomain> {
    ScenarioSet::new(vec![
        Box::new(CreateRoles) as Box<dyn Scenario<SqlDomain>>,
        Box::new(CreateUsers),
        Box::new(CreateAdminUser { email }),
        Box::new(AuditAdmins),
    ])
    .unwrap()
}

#[test]
fn test_halted_run_removes_files_from_earlier_runs() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();

    Generator::new(&engine, &store)
        .generate(&mut conn, &SqlDomain, &admin_set("u1@example.com"))
        .unwrap();
    assert!(store.exists("CreateAdminUser"));
    assert!(store.exists("AuditAdmins"));

    let report = Generator::new(&engine, &store).run(
        &mut conn,
        &SqlDomain,
        &admin_set("missing@example.com"),
    );
    assert!(!report.is_success());
    assert_eq!(report.removed, vec!["CreateAdminUser", "AuditAdmins"]);
    assert!(!store.exists("CreateAdminUser"));
    assert!(!store.exists("AuditAdmins"));
    // scenarios before the failure were regenerated and kept
    assert!(store.exists("CreateRoles"));
    assert!(store.exists("CreateUsers"));

    let err = Loader::new(&engine, &store)
        .load_scenario(&mut open_db(), "AuditAdmins")
        .unwrap_err();
    assert!(matches!(err, FixtureError::ScenarioNotFound { .. }));
    assert_eq!(report.summary().removed, vec!["CreateAdminUser", "AuditAdmins"]);
}

#[test]
fn test_missing_prerequisite_halts_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();

    let set = ScenarioSet::new(vec![
        Box::new(CreateRoles) as Box<dyn Scenario<SqlDomain>>,
        Box::new(CreateUsers),
        Box::new(CreateAdminUser {
            email: "missing@example.com",
        }),
        Box::new(AuditAdmins),
    ])
    .unwrap();

    let report = Generator::new(&engine, &store).run(&mut conn, &SqlDomain, &set);

    assert!(!report.is_success());
    let err = report.failure.as_ref().unwrap();
    assert!(err.is_missing_prerequisite(), "unexpected error: {}", err);
    assert_eq!(err.scenario_key(), Some("CreateAdminUser"));
    assert!(err.to_string().contains("missing@example.com"));

    assert_eq!(report.generated.len(), 2);
    assert_eq!(report.skipped, vec!["AuditAdmins"]);
    assert!(report.removed.is_empty());
    assert!(store.exists("CreateRoles"));
    assert!(store.exists("CreateUsers"));
    assert!(!store.exists("CreateAdminUser"));
    assert!(!store.exists("AuditAdmins"));

    let summary = report.summary();
    assert!(!summary.success);
    assert_eq!(summary.failed.unwrap().key, "CreateAdminUser");
}

#[test]
fn test_domain_error_rolls_back_populate() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();
    let set = ScenarioSet::new(vec![
        Box::new(CreateRoles) as Box<dyn Scenario<SqlDomain>>,
        Box::new(Broken),
    ])
    .unwrap();

    let err = Generator::new(&engine, &store)
        .generate(&mut conn, &SqlDomain, &set)
        .unwrap_err();

    assert!(matches!(
        &err,
        FixtureError::Generation { key, source: ScenarioError::Domain(_) } if key == "Broken"
    ));
    assert!(err.to_string().contains("payment gateway unavailable"));
    assert!(!store.exists("Broken"));
    // the parent seed is committed; the populate insert is not
    assert_eq!(count(&conn, "roles"), 1);
}

#[test]
fn test_reset_failure_names_scenario_and_step() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();
    conn.execute_batch("DROP TABLE user_roles").unwrap();

    let err = Generator::new(&engine, &store)
        .generate(&mut conn, &SqlDomain, &scenarios("u1@example.com"))
        .unwrap_err();

    match &err {
        FixtureError::ScenarioStep { key, step, source } => {
            assert_eq!(key, "CreateRoles");
            assert_eq!(*step, "clear");
            assert!(matches!(**source, FixtureError::SchemaMismatch { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
}

// =============================================================================
// Partial runs and progress
// =============================================================================

#[test]
fn test_run_only_includes_ancestors() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();
    let set = ScenarioSet::new(vec![
        Box::new(CreateRoles) as Box<dyn Scenario<SqlDomain>>,
        Box::new(CreateUsers),
        Box::new(CreateAdminUser {
            email: "u2@example.com",
        }),
        Box::new(AuditAdmins),
    ])
    .unwrap();

    let report = Generator::new(&engine, &store)
        .run_only(&mut conn, &SqlDomain, &set, &["CreateUsers".to_string()])
        .unwrap();

    assert!(report.is_success());
    let keys: Vec<&str> = report.generated.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["CreateRoles", "CreateUsers"]);
    assert!(!store.exists("CreateAdminUser"));

    let err = Generator::new(&engine, &store)
        .run_only(&mut conn, &SqlDomain, &set, &["Nope".to_string()])
        .unwrap_err();
    assert!(matches!(err, FixtureError::ScenarioGraph(_)));
}

#[test]
fn test_observer_sees_every_step() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();

    let mut events = Vec::new();
    let report = Generator::new(&engine, &store)
        .with_observer(|event| {
            events.push(match event {
                GenerationEvent::Started { key, index, total } => {
                    format!("start {} {}/{}", key, index, total)
                }
                GenerationEvent::Generated(done) => format!("done {}", done.key),
                GenerationEvent::Failed { key, .. } => format!("fail {}", key),
            })
        })
        .run(&mut conn, &SqlDomain, &scenarios("missing@example.com"));
    assert!(!report.is_success());

    assert_eq!(
        events,
        vec![
            "start CreateRoles 0/3",
            "done CreateRoles",
            "start CreateUsers 1/3",
            "done CreateUsers",
            "start CreateAdminUser 2/3",
            "fail CreateAdminUser",
        ]
    );
}

// =============================================================================
// Custom domain
// =============================================================================

/// Repository-style unit of work, the way an application would plug in
struct Accounts;

struct AccountsTx<'conn> {
    tx: Transaction<'conn>,
}

impl AccountsTx<'_> {
    fn add_user(&self, id: &str, email: &str) -> Result<(), ScenarioError> {
        self.tx.execute(
            "INSERT INTO users (id, email, name) VALUES (?1, ?2, ?1)",
            params![id, email],
        )?;
        Ok(())
    }

    fn role_id(&self, name: &str) -> Result<String, ScenarioError> {
        self.tx
            .query_row("SELECT id FROM roles WHERE name = ?1", [name], |r| r.get(0))
            .map_err(|_| ScenarioError::missing(format!("role {}", name)))
    }

    fn grant(&self, user: &str, role: &str) -> Result<(), ScenarioError> {
        self.tx.execute(
            "INSERT INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            [user, role],
        )?;
        Ok(())
    }
}

impl Domain for Accounts {
    type Context<'conn> = AccountsTx<'conn>;

    fn begin<'conn>(&self, conn: &'conn mut Connection) -> Result<AccountsTx<'conn>, ScenarioError> {
        Ok(AccountsTx {
            tx: conn.transaction()?,
        })
    }

    fn commit(&self, ctx: AccountsTx<'_>) -> Result<(), ScenarioError> {
        ctx.tx.commit()?;
        Ok(())
    }
}

struct SeedRoles;

impl Scenario<Accounts> for SeedRoles {
    fn key(&self) -> &str {
        "SeedRoles"
    }

    fn populate(&self, ctx: &mut AccountsTx<'_>) -> Result<(), ScenarioError> {
        ctx.tx
            .execute_batch("INSERT INTO roles (id, name) VALUES ('r1', 'Admin')")?;
        Ok(())
    }
}

struct Operator;

impl Scenario<Accounts> for Operator {
    fn key(&self) -> &str {
        "Operator"
    }

    fn parent(&self) -> Option<&str> {
        Some("SeedRoles")
    }

    fn populate(&self, ctx: &mut AccountsTx<'_>) -> Result<(), ScenarioError> {
        ctx.add_user("op", "op@example.com")?;
        let role = ctx.role_id("Admin")?;
        ctx.grant("op", &role)
    }
}

#[test]
fn test_custom_domain_context() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();
    let set = ScenarioSet::new(vec![
        Box::new(SeedRoles) as Box<dyn Scenario<Accounts>>,
        Box::new(Operator),
    ])
    .unwrap();

    let generated = Generator::new(&engine, &store)
        .generate(&mut conn, &Accounts, &set)
        .unwrap();
    assert_eq!(generated.len(), 2);

    let operator = store.load("Operator").unwrap();
    assert_eq!(operator.rows("main.user_roles").len(), 1);
    assert_eq!(operator.rows("main.users")[0]["email"].as_text(), Some("op@example.com"));
}
