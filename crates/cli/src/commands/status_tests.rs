// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cb_core::{JobKind, JobSpec};
use cb_storage::ExecutionMode;
use tempfile::TempDir;

fn stats_for(setup: impl FnOnce(&Store)) -> DbStats {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("jobs.db")).unwrap();
    setup(&store);
    collect_stats(&store).unwrap()
}

fn spec(input: &str) -> JobSpec {
    JobSpec::new(
        JobKind::Notebook,
        input.into(),
        format!("{input}.html").into(),
        "h".into(),
        serde_json::json!({}),
    )
}

#[test]
fn empty_database_is_healthy() {
    let stats = stats_for(|_| {});
    assert_eq!(assess(&stats), Health::Healthy);
    assert_eq!(Health::Healthy.exit_code(), 0);
}

#[test]
fn idle_workers_and_completed_jobs_are_healthy() {
    let stats = stats_for(|store| {
        let registry = WorkerRegistry::open(store).unwrap();
        let worker = registry
            .register(JobKind::Notebook, "direct-a", ExecutionMode::Direct, None)
            .unwrap();
        let mut queue = JobQueue::open(store).unwrap();
        let id = queue.enqueue(&spec("a.py")).unwrap();
        queue.claim(JobKind::Notebook, worker).unwrap().unwrap();
        queue
            .update_status(id, JobStatus::Completed, None, None)
            .unwrap();
    });
    assert_eq!(assess(&stats), Health::Healthy);
}

#[test]
fn failed_jobs_warn() {
    let stats = stats_for(|store| {
        let registry = WorkerRegistry::open(store).unwrap();
        let worker = registry
            .register(JobKind::Notebook, "direct-a", ExecutionMode::Direct, None)
            .unwrap();
        let mut queue = JobQueue::open(store).unwrap();
        let id = queue.enqueue(&spec("a.py")).unwrap();
        queue.claim(JobKind::Notebook, worker).unwrap().unwrap();
        queue
            .update_status(id, JobStatus::Failed, Some("{}"), None)
            .unwrap();
    });
    assert_eq!(assess(&stats), Health::Warning);
    assert_eq!(Health::Warning.exit_code(), 1);
}

#[test]
fn pending_work_without_workers_warns() {
    let stats = stats_for(|store| {
        let queue = JobQueue::open(store).unwrap();
        queue.enqueue(&spec("a.py")).unwrap();
    });
    assert_eq!(assess(&stats), Health::Warning);
}

#[test]
fn hung_workers_warn() {
    let stats = stats_for(|store| {
        let registry = WorkerRegistry::open(store).unwrap();
        let worker = registry
            .register(JobKind::Notebook, "direct-a", ExecutionMode::Direct, None)
            .unwrap();
        registry.set_status(worker, WorkerStatus::Hung).unwrap();
    });
    assert_eq!(assess(&stats), Health::Warning);
}

#[test]
fn missing_database_is_an_error() {
    let dir = TempDir::new().unwrap();
    let args = StatusArgs {
        workers: false,
        jobs: false,
        format: StatusFormat::Compact,
        no_color: true,
        jobs_db_path: dir.path().join("absent.db"),
    };
    assert_eq!(run(args).unwrap(), 2);
}
