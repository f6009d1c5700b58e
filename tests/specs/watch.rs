// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch-mode semantics: debounce coalescing and job supersession.

use crate::prelude::*;
use cb_core::{JobStatus, TargetFilter};
use cb_engine::{Debouncer, Planner};
use std::path::Path;
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(60);

#[tokio::test]
async fn three_rapid_saves_coalesce_into_one_cycle() {
    let (mut debouncer, mut ready) = Debouncer::new(DEBOUNCE);

    // The user saves the same file three times within a few milliseconds.
    for _ in 0..3 {
        debouncer.on_event("slides/topic/slides_intro.py".into());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let settled = ready.recv().await.unwrap();
    assert_eq!(settled, Path::new("slides/topic/slides_intro.py"));
    let extra = tokio::time::timeout(DEBOUNCE * 3, ready.recv()).await;
    assert!(extra.is_err(), "exactly one planning call per burst");
}

#[tokio::test]
async fn saves_farther_apart_than_the_delay_cycle_twice() {
    let (mut debouncer, mut ready) = Debouncer::new(DEBOUNCE);

    debouncer.on_event("a.py".into());
    let first = ready.recv().await.unwrap();
    debouncer.mark_settled(&first);

    tokio::time::sleep(DEBOUNCE * 2).await;
    debouncer.on_event("a.py".into());
    ready.recv().await.unwrap();
}

#[tokio::test]
async fn new_save_supersedes_pending_jobs_under_a_fresh_correlation() {
    let mut course = Course::empty();
    course.add_notebook("slides/topic/slides_intro.py", "# %%\n1\n");

    let mut queue = course.queue();

    // First save: plan and enqueue under correlation A.
    let cid_a = course.ctx.correlations.new_correlation_id();
    let planner = Planner::new(&course.model, &TargetFilter::default(), course.dir.path())
        .with_correlation_id(cid_a.clone());
    let file = course.model.files_in_order().next().unwrap();
    let first_jobs = planner.plan_file(file).unwrap();
    for job in &first_jobs {
        queue.enqueue(job).unwrap();
    }

    // Second save before any worker claims: cancel then re-enqueue under B.
    let cid_b = course.ctx.correlations.new_correlation_id();
    let input = course.dir.path().join("slides/topic/slides_intro.py");
    let cancelled = queue.cancel_for_input(&input, Some(&cid_b)).unwrap();
    assert_eq!(cancelled.len(), first_jobs.len());

    let planner = Planner::new(&course.model, &TargetFilter::default(), course.dir.path())
        .with_correlation_id(cid_b.clone());
    for job in planner.plan_file(file).unwrap() {
        queue.enqueue(&job).unwrap();
    }

    // Every cancelled row names the superseding correlation id; every
    // pending row belongs to it.
    for row in queue.list(&Default::default()).unwrap() {
        match row.status {
            JobStatus::Cancelled => {
                assert_eq!(row.correlation_id.as_deref(), Some(cid_a.as_str()));
                assert_eq!(row.cancelled_by.as_deref(), Some(cid_b.as_str()));
                assert!(row.cancelled_at.is_some());
            }
            JobStatus::Pending => {
                assert_eq!(row.correlation_id.as_deref(), Some(cid_b.as_str()));
            }
            other => panic!("unexpected status {other}"),
        }
    }
}
