// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface smoke tests against the built `cb` binary.

use assert_cmd::Command;
use tempfile::TempDir;

fn cb() -> Command {
    Command::cargo_bin("cb").expect("cb binary built")
}

fn init_db(db: &std::path::Path) {
    cb_storage::Store::open(db).unwrap();
}

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

#[test]
fn status_without_a_database_exits_2() {
    let dir = TempDir::new().unwrap();
    cb().args([
        "status",
        "--no-color",
        "--jobs-db-path",
        dir.path().join("absent.db").to_str().unwrap(),
    ])
    .assert()
    .code(2);
}

#[test]
fn status_on_a_fresh_database_is_healthy() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");
    init_db(&db);

    let assert = cb()
        .args([
            "status",
            "--no-color",
            "--format",
            "compact",
            "--jobs-db-path",
            db.to_str().unwrap(),
        ])
        .assert()
        .code(0);
    assert!(stdout_of(assert).contains("healthy"));
}

#[test]
fn jobs_list_on_an_empty_queue_prints_nothing_to_do() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");
    init_db(&db);

    let assert = cb()
        .args(["jobs", "--jobs-db-path", db.to_str().unwrap(), "list"])
        .assert()
        .code(0);
    assert!(stdout_of(assert).contains("no jobs"));
}

#[test]
fn db_stats_emits_json() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");
    init_db(&db);

    let assert = cb()
        .args(["db", "--jobs-db-path", db.to_str().unwrap(), "stats"])
        .assert()
        .code(0);
    assert!(stdout_of(assert).contains("jobs_by_status"));
}

#[test]
fn jobs_cancel_requires_force() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");
    let store = cb_storage::Store::open(&db).unwrap();
    let queue = cb_storage::JobQueue::open(&store).unwrap();
    queue
        .enqueue(&cb_core::JobSpec::new(
            cb_core::JobKind::Notebook,
            "a.py".into(),
            "a.html".into(),
            "h".into(),
            serde_json::json!({}),
        ))
        .unwrap();

    cb().args(["jobs", "--jobs-db-path", db.to_str().unwrap(), "cancel"])
        .assert()
        .failure();

    let assert = cb()
        .args([
            "jobs",
            "--jobs-db-path",
            db.to_str().unwrap(),
            "cancel",
            "--force",
        ])
        .assert()
        .code(0);
    assert!(stdout_of(assert).contains("cancelled 1"));
}

#[test]
fn delete_database_removes_the_files() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");
    init_db(&db);
    assert!(db.exists());

    cb().args([
        "delete-database",
        "--jobs-db-path",
        db.to_str().unwrap(),
        "--which",
        "jobs",
    ])
    .assert()
    .code(0);
    assert!(!db.exists());
}
