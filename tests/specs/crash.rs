// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-crash recovery: hung jobs return to the queue and another worker
//! finishes them.

use crate::prelude::*;
use cb_core::{JobKind, JobSpec, JobStatus};
use cb_storage::WorkerRegistry;

fn job_spec(course: &Course, input: &str) -> JobSpec {
    JobSpec::new(
        JobKind::Notebook,
        course.dir.path().join(input),
        course.dir.path().join(format!("out/{input}.html")),
        "hash-crash".to_string(),
        serde_json::json!({"data": "x"}),
    )
}

#[tokio::test]
async fn crashed_worker_job_is_reassigned_and_completed() {
    let course = Course::empty();
    let crasher = course.register_worker(JobKind::Notebook);

    let mut queue = course.queue();
    let job_id = queue.enqueue(&job_spec(&course, "a.py")).unwrap();

    // The worker claims the job, then dies silently.
    let claimed = queue.claim(JobKind::Notebook, crasher).unwrap().unwrap();
    assert_eq!(claimed.id, job_id);
    assert_eq!(claimed.attempts, 1);

    // Time passes: heartbeat and job start age beyond the thresholds.
    let conn = course.ctx.store.connect().unwrap();
    conn.execute(
        "UPDATE workers SET last_heartbeat = datetime('now', '-120 seconds') WHERE id = ?1",
        [crasher],
    )
    .unwrap();
    conn.execute(
        "UPDATE jobs SET started_at = datetime('now', '-120 seconds') WHERE id = ?1",
        [job_id],
    )
    .unwrap();

    // The reapers run: worker goes hung -> dead, job returns to pending.
    let registry = WorkerRegistry::open(&course.ctx.store).unwrap();
    registry.reap_stale(30).unwrap();
    registry.reap_stale(30).unwrap();
    assert_eq!(queue.reset_hung(60).unwrap(), 1);

    let job = queue.get(job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.worker_id.is_none());

    // A replacement worker claims and completes it on the second attempt.
    let replacement = course.register_worker(JobKind::Plantuml); // wrong kind
    assert!(queue.claim(JobKind::Plantuml, replacement).unwrap().is_none());

    let registry = WorkerRegistry::open(&course.ctx.store).unwrap();
    let replacement = registry
        .register(
            JobKind::Notebook,
            "direct-replacement",
            cb_storage::ExecutionMode::Direct,
            None,
        )
        .unwrap();
    let reclaimed = queue.claim(JobKind::Notebook, replacement).unwrap().unwrap();
    assert_eq!(reclaimed.id, job_id);
    assert_eq!(reclaimed.attempts, 2);
    assert_eq!(reclaimed.worker_id, Some(replacement));

    queue
        .update_status(job_id, JobStatus::Completed, None, Some("{}"))
        .unwrap();
    let done = queue.get(job_id).unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.attempts, 2);
}

#[tokio::test]
async fn fresh_jobs_survive_the_reaper_untouched() {
    let course = Course::empty();
    let worker = course.register_worker(JobKind::Notebook);
    let mut queue = course.queue();
    let job_id = queue.enqueue(&job_spec(&course, "b.py")).unwrap();
    queue.claim(JobKind::Notebook, worker).unwrap().unwrap();

    assert_eq!(queue.reset_hung(60).unwrap(), 0);
    assert_eq!(
        queue.get(job_id).unwrap().unwrap().status,
        JobStatus::Processing
    );
}
