// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue round-trips and durability invariants at the workspace level.

use crate::prelude::*;
use cb_core::{JobKind, JobSpec, JobStatus};
use cb_storage::{Store, DATABASE_VERSION};

fn spec(course: &Course, input: &str) -> JobSpec {
    JobSpec::new(
        JobKind::Plantuml,
        course.dir.path().join(input),
        course.dir.path().join(format!("{input}.png")),
        format!("hash-{input}"),
        serde_json::json!({"data": "@startuml\n@enduml", "output_format": "png"}),
    )
}

#[tokio::test]
async fn enqueue_claim_complete_claim_round_trip() {
    let course = Course::empty();
    let worker = course.register_worker(JobKind::Plantuml);
    let mut queue = course.queue();

    let id = queue.enqueue(&spec(&course, "d.pu")).unwrap();
    let job = queue.claim(JobKind::Plantuml, worker).unwrap().unwrap();
    assert_eq!(job.id, id);
    queue
        .update_status(id, JobStatus::Completed, None, None)
        .unwrap();

    assert!(queue.claim(JobKind::Plantuml, worker).unwrap().is_none());
}

#[tokio::test]
async fn queue_state_survives_reopening_the_database() {
    let course = Course::empty();
    let mut queue = course.queue();
    let id = queue.enqueue(&spec(&course, "d.pu")).unwrap();
    drop(queue);

    // A different process would reopen the same file.
    let store = Store::open(&course.ctx.config.jobs_db_path).unwrap();
    assert_eq!(store.version().unwrap(), Some(DATABASE_VERSION));
    let queue = cb_storage::JobQueue::open(&store).unwrap();
    let job = queue.get(id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.payload["output_format"], "png");
}

#[tokio::test]
async fn concurrent_claimants_split_the_queue_without_overlap() {
    let course = Course::empty();
    let worker = course.register_worker(JobKind::Plantuml);

    let mut ids = Vec::new();
    {
        let queue = course.queue();
        for i in 0..20 {
            ids.push(queue.enqueue(&spec(&course, &format!("d{i}.pu"))).unwrap());
        }
    }

    // Two tasks race over their own connections.
    let store_a = course.ctx.store.clone();
    let store_b = course.ctx.store.clone();
    let claim_all = |store: Store| async move {
        let mut queue = cb_storage::JobQueue::open(&store).unwrap();
        let mut claimed = Vec::new();
        loop {
            match queue.claim(JobKind::Plantuml, worker).unwrap() {
                Some(job) => {
                    claimed.push(job.id);
                    queue
                        .update_status(job.id, JobStatus::Completed, None, None)
                        .unwrap();
                }
                None => break claimed,
            }
        }
    };
    let (a, b) = tokio::join!(
        tokio::spawn(claim_all(store_a)),
        tokio::spawn(claim_all(store_b))
    );
    let (mut a, b) = (a.unwrap(), b.unwrap());

    a.extend(b);
    a.sort_unstable();
    let total = a.len();
    a.dedup();
    assert_eq!(a.len(), total, "no job may be claimed twice");
    ids.sort_unstable();
    assert_eq!(a, ids, "every job is claimed exactly once");
}

#[tokio::test]
async fn attempts_never_exceed_max_attempts() {
    let course = Course::empty();
    let worker = course.register_worker(JobKind::Plantuml);
    let mut queue = course.queue();

    let mut s = spec(&course, "d.pu");
    s.max_attempts = 2;
    let id = queue.enqueue(&s).unwrap();

    for _ in 0..2 {
        let job = queue.claim(JobKind::Plantuml, worker).unwrap().unwrap();
        assert!(job.attempts <= job.max_attempts);
        queue
            .update_status(id, JobStatus::Pending, None, None)
            .unwrap();
    }
    // Attempts exhausted: the job is no longer claimable.
    assert!(queue.claim(JobKind::Plantuml, worker).unwrap().is_none());
    let job = queue.get(id).unwrap().unwrap();
    assert_eq!(job.attempts, job.max_attempts);
}
