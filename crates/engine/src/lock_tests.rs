// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn lock_is_exclusive_within_a_process_family() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");

    let first = BuildLock::acquire(&db).unwrap();
    assert!(first.path().ends_with("jobs.lock"));

    let second = BuildLock::acquire(&db);
    assert!(matches!(second, Err(EngineError::BuildLocked(_))));
}

#[test]
fn lock_is_released_on_drop() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");

    drop(BuildLock::acquire(&db).unwrap());
    BuildLock::acquire(&db).unwrap();
}

#[test]
fn lock_file_records_the_pid() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("jobs.db");
    let lock = BuildLock::acquire(&db).unwrap();

    let contents = std::fs::read_to_string(lock.path()).unwrap();
    assert_eq!(contents.trim(), std::process::id().to_string());
}
