//! Tests for resetting a database to a generated scenario.

mod common;

use common::{count, engine, open_db, scenarios, store};
use scenario_fixtures::snapshot::read_from_database;
use scenario_fixtures::{FixtureError, Generator, Loader, ResetEngine, SnapshotStore, SqlDomain};
use tempfile::TempDir;

fn generated(temp_dir: &TempDir) -> (ResetEngine, SnapshotStore) {
    let (engine, store) = (engine(), store(temp_dir.path()));
    let mut conn = open_db();
    Generator::new(&engine, &store)
        .generate(&mut conn, &SqlDomain, &scenarios("u1@example.com"))
        .unwrap();
    (engine, store)
}

#[test]
fn test_load_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = generated(&temp_dir);
    let loader = Loader::new(&engine, &store);
    let mut conn = open_db();

    let first = loader.load_scenario(&mut conn, "CreateAdminUser").unwrap();
    let after_first = read_from_database(&conn, engine.catalog()).unwrap();
    let second = loader.load_scenario(&mut conn, "CreateAdminUser").unwrap();
    let after_second = read_from_database(&conn, engine.catalog()).unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(after_first, store.load("CreateAdminUser").unwrap());
    assert_eq!(first.rows, 7);
    assert_eq!(second.rows, 7);
    assert_eq!(first.tables, 3);
}

#[test]
fn test_load_discards_previous_state() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = generated(&temp_dir);
    let loader = Loader::new(&engine, &store);
    let mut conn = open_db();

    loader.load_scenario(&mut conn, "CreateAdminUser").unwrap();
    conn.execute(
        "INSERT INTO roles (id, name) VALUES ('r-test', 'Leftover')",
        [],
    )
    .unwrap();

    loader.load_scenario(&mut conn, "CreateRoles").unwrap();
    assert_eq!(count(&conn, "roles"), 1);
    assert_eq!(count(&conn, "users"), 0);
    assert_eq!(count(&conn, "user_roles"), 0);
}

#[test]
fn test_missing_scenario_leaves_database_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = generated(&temp_dir);
    let loader = Loader::new(&engine, &store);
    let mut conn = open_db();
    loader.load_scenario(&mut conn, "CreateUsers").unwrap();

    let err = loader.load_scenario(&mut conn, "CreateSuperAdmin").unwrap_err();
    assert!(
        matches!(&err, FixtureError::ScenarioNotFound { key, .. } if key == "CreateSuperAdmin"),
        "unexpected error: {}",
        err
    );
    assert_eq!(count(&conn, "users"), 5);
}

#[test]
fn test_schema_drift_is_insert_error_not_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = generated(&temp_dir);
    let loader = Loader::new(&engine, &store);
    let mut conn = open_db();
    conn.execute_batch(
        "DROP TABLE user_roles;
         CREATE TABLE user_roles (user_id TEXT NOT NULL REFERENCES users(id));",
    )
    .unwrap();

    let err = loader.load_scenario(&mut conn, "CreateAdminUser").unwrap_err();
    assert!(
        matches!(&err, FixtureError::Insert { table, row: 0, .. } if table == "main.user_roles"),
        "unexpected error: {}",
        err
    );
    // the failed seed left nothing behind
    assert_eq!(count(&conn, "users"), 0);
}

#[test]
fn test_load_snapshot_from_memory() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, store) = generated(&temp_dir);
    let loader = Loader::new(&engine, &store);
    let mut conn = open_db();

    let snapshot = store.load("CreateUsers").unwrap();
    let stats = loader.load_snapshot(&mut conn, &snapshot).unwrap();
    assert_eq!(stats.tables, 2);
    assert_eq!(stats.rows, 6);
    assert!(stats.to_string().starts_with("2 tables, 6 rows loaded in"));
}
