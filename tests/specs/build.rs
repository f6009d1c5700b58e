// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build scenarios: empty plans, implicit execution, missing workers, and
//! warm-cache rebuilds.

use crate::prelude::*;
use cb_core::{JobKind, Language, OutputFormat, OutputKind, TargetFilter};
use cb_engine::{BuildDriver, DriverConfig, OutputFormatter, Planner, QuietFormatter};
use cb_storage::ResultCache;
use std::time::Duration;

fn fast_driver_config() -> DriverConfig {
    DriverConfig {
        poll_interval: Duration::from_millis(20),
        max_wait_for_completion: Duration::from_secs(10),
        ignore_cache: false,
    }
}

struct CountingFormatter {
    cache_hits: usize,
}

impl OutputFormatter for CountingFormatter {
    fn on_build_start(&mut self, _total_jobs: usize) {}
    fn on_progress(&mut self, _progress: &cb_core::BuildProgress) {}
    fn on_cache_hit(&mut self, _output_path: &std::path::Path) {
        self.cache_hits += 1;
    }
    fn on_job_error(&mut self, _error: &cb_core::BuildError) {}
    fn on_summary(&mut self, _report: &cb_engine::BuildReport) {}
}

#[tokio::test]
async fn empty_course_builds_cleanly() {
    let course = Course::empty();
    let planner = Planner::new(&course.model, &TargetFilter::default(), course.dir.path());
    let plan = planner.plan().unwrap();
    assert_eq!(plan.total_jobs(), 0);

    let mut formatter = QuietFormatter::new();
    let mut driver = BuildDriver::new(fast_driver_config(), &mut formatter);
    let report = driver.execute(&course.ctx, &plan).await.unwrap();

    assert_eq!(report.total, 0);
    assert_eq!(report.completed, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn implicit_speaker_execution_feeds_the_completed_output() {
    // Only completed HTML requested; speaker HTML must run implicitly to
    // seed the executed-notebook cache without leaving an artifact.
    let course = Course::single_notebook(&[OutputKind::Completed], &[OutputFormat::Html]);
    let worker = course.register_worker(JobKind::Notebook);
    spawn_notebook_worker(&course, worker);

    let planner = Planner::new(&course.model, &TargetFilter::default(), course.dir.path());
    let plan = planner.plan().unwrap();
    assert_eq!(plan.total_jobs(), 2);
    assert_eq!(
        plan.implicit,
        [(Language::En, OutputFormat::Html, OutputKind::Speaker)]
            .into_iter()
            .collect()
    );

    let mut formatter = QuietFormatter::new();
    let mut driver = BuildDriver::new(fast_driver_config(), &mut formatter);
    let report = driver.execute(&course.ctx, &plan).await.unwrap();
    assert_eq!(report.completed, 2);
    assert_eq!(report.failed, 0);

    // The speaker artifact was suppressed, the completed one written.
    let speaker_job = plan.stages[0]
        .jobs
        .iter()
        .find(|j| j.payload["kind"] == "speaker")
        .unwrap();
    assert!(!speaker_job.output_path.exists());
    let completed_job = plan.stages[0]
        .jobs
        .iter()
        .find(|j| j.payload["kind"] == "completed")
        .unwrap();
    assert!(completed_job.output_path.exists());

    // The executed-notebook cache was populated and consumed.
    let cache = cb_storage::ExecutedNotebookCache::open(course.cache_db_path()).unwrap();
    assert_eq!(cache.len().unwrap(), 1);
    let queue = course.queue();
    let consumer = queue
        .list(&Default::default())
        .unwrap()
        .into_iter()
        .find(|row| row.payload["kind"] == "completed")
        .unwrap();
    let result: serde_json::Value =
        serde_json::from_str(consumer.result.as_deref().unwrap()).unwrap();
    assert_eq!(result["consumed_cache"], true);
}

#[tokio::test]
async fn build_without_workers_is_fatal_and_marks_nothing_failed() {
    let course = Course::single_notebook(
        &[OutputKind::Completed, OutputKind::Speaker],
        &[OutputFormat::Html],
    );
    // No workers registered, auto_start never ran.

    let planner = Planner::new(&course.model, &TargetFilter::default(), course.dir.path());
    let plan = planner.plan().unwrap();

    let mut formatter = QuietFormatter::new();
    let mut driver = BuildDriver::new(fast_driver_config(), &mut formatter);
    let report = driver.execute(&course.ctx, &plan).await.unwrap();

    assert!(report.fatal);
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].category, "no_workers");

    let queue = course.queue();
    assert!(queue.list(&Default::default()).unwrap().is_empty());
}

#[tokio::test]
async fn warm_cache_rebuild_plans_jobs_but_runs_none() {
    let course = Course::single_notebook(
        &[OutputKind::Completed, OutputKind::Speaker],
        &[OutputFormat::Html],
    );
    let worker = course.register_worker(JobKind::Notebook);
    spawn_notebook_worker(&course, worker);

    let planner = Planner::new(&course.model, &TargetFilter::default(), course.dir.path());
    let plan = planner.plan().unwrap();
    let first_total = plan.total_jobs();
    assert!(first_total > 0);

    let mut formatter = QuietFormatter::new();
    let mut driver = BuildDriver::new(fast_driver_config(), &mut formatter);
    let first = driver.execute(&course.ctx, &plan).await.unwrap();
    assert_eq!(first.completed, first_total);

    // Snapshot access counts before the second run.
    let cache = ResultCache::open(&course.ctx.store).unwrap();
    let entries_before = cache.len().unwrap();
    assert_eq!(entries_before, first_total);

    // Second build with unchanged inputs: all cache hits, zero jobs run.
    let plan2 = Planner::new(&course.model, &TargetFilter::default(), course.dir.path())
        .plan()
        .unwrap();
    let mut counting = CountingFormatter { cache_hits: 0 };
    let mut driver2 = BuildDriver::new(fast_driver_config(), &mut counting);
    let second = driver2.execute(&course.ctx, &plan2).await.unwrap();

    assert_eq!(second.total, 0);
    assert_eq!(second.completed, 0);
    assert_eq!(second.failed, 0);
    assert_eq!(second.cache_hits, first_total);
    assert_eq!(counting.cache_hits, first_total);

    // Exactly one access-count bump per entry.
    let conn = course.ctx.store.connect().unwrap();
    let min_access: i64 = conn
        .query_row("SELECT MIN(access_count) FROM results_cache", [], |r| r.get(0))
        .unwrap();
    let max_access: i64 = conn
        .query_row("SELECT MAX(access_count) FROM results_cache", [], |r| r.get(0))
        .unwrap();
    assert_eq!(min_access, 1);
    assert_eq!(max_access, 1);
}
