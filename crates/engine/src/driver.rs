// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The build driver: executes a staged plan against the queue.
//!
//! For each stage the driver enqueues every job that misses the artifact
//! cache, then polls until none of the submitted ids is pending or
//! processing. Stage N+1 is not submitted before stage N has fully settled.
//! Exceeding the completion timeout reports the outstanding set and stops
//! submitting, but never force-kills workers; the hung-job reaper owns that.

use crate::context::BuildContext;
use crate::error::EngineError;
use crate::formatter::OutputFormatter;
use crate::git_guard::GitDirGuard;
use crate::planner::BuildPlan;
use cb_adapters::env as progress_env;
use cb_core::{BuildError, BuildProgress, ErrorClassifier, JobKind, JobStatus};
use cb_storage::{JobQueue, ResultCache, WorkerRegistry};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub poll_interval: Duration,
    pub max_wait_for_completion: Duration,
    /// Skip artifact-cache lookups entirely (`--ignore-db`).
    pub ignore_cache: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_wait_for_completion: Duration::from_secs(1200),
            ignore_cache: false,
        }
    }
}

/// Outcome of one build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub cache_hits: usize,
    pub errors: Vec<BuildError>,
    pub fatal: bool,
    pub timed_out: bool,
}

impl BuildReport {
    pub fn exit_code(&self) -> i32 {
        if self.fatal {
            2
        } else if self.failed > 0 || self.timed_out {
            1
        } else {
            0
        }
    }
}

pub struct BuildDriver<'f> {
    config: DriverConfig,
    formatter: &'f mut dyn OutputFormatter,
}

impl<'f> BuildDriver<'f> {
    pub fn new(config: DriverConfig, formatter: &'f mut dyn OutputFormatter) -> Self {
        Self { config, formatter }
    }

    /// Execute the plan to completion (or fatal abort / timeout).
    pub async fn execute(
        &mut self,
        ctx: &BuildContext,
        plan: &BuildPlan,
    ) -> Result<BuildReport, EngineError> {
        let mut report = BuildReport::default();
        self.formatter.on_build_start(plan.total_jobs());

        if let Err(error) = self.preflight_workers(ctx, plan) {
            self.formatter.on_job_error(&error);
            report.fatal = true;
            report.errors.push(error);
            self.formatter.on_summary(&report);
            return Ok(report);
        }

        let mut queue = JobQueue::open(&ctx.store)?;
        let cache = ResultCache::open(&ctx.store)?;
        let registry = WorkerRegistry::open(&ctx.store)?;

        'stages: for stage in &plan.stages {
            debug!(stage = stage.number, jobs = stage.jobs.len(), "submitting stage");
            let mut submitted = Vec::new();

            for job in &stage.jobs {
                if !self.config.ignore_cache && self.cache_hit(&cache, job)? {
                    report.cache_hits += 1;
                    self.formatter.on_cache_hit(&job.output_path);
                    continue;
                }
                let job_id = queue.enqueue(job)?;
                if let Some(cid) = &job.correlation_id {
                    ctx.correlations.note_dependency(cid, job_id.to_string());
                }
                submitted.push(job_id);
            }
            report.total += submitted.len();

            let settled = self
                .wait_for_stage(ctx, &mut queue, &registry, &submitted, &mut report)
                .await?;

            for row in settled.failed_rows {
                let error = ErrorClassifier::classify_job_error(
                    row.kind,
                    &row.input_file.to_string_lossy(),
                    row.error.as_deref().unwrap_or("unknown worker error"),
                );
                self.formatter.on_job_error(&error);
                let fatal = error.is_fatal();
                report.errors.push(error);
                if fatal {
                    report.fatal = true;
                    warn!(stage = stage.number, "fatal error; aborting build");
                    break 'stages;
                }
            }

            if settled.timed_out {
                report.timed_out = true;
                break 'stages;
            }
        }

        if !report.fatal && !report.timed_out {
            self.copy_dir_groups(ctx, plan, &mut report)?;
        }

        self.formatter.on_summary(&report);
        Ok(report)
    }

    /// Every job kind in the plan needs at least one live worker, unless the
    /// lifecycle manager is about to start some.
    fn preflight_workers(&self, ctx: &BuildContext, plan: &BuildPlan) -> Result<(), BuildError> {
        let kinds: BTreeSet<JobKind> = plan
            .stages
            .iter()
            .flat_map(|s| &s.jobs)
            .map(|j| j.kind)
            .collect();
        if kinds.is_empty() {
            return Ok(());
        }

        let registry = WorkerRegistry::open(&ctx.store).map_err(|e| {
            ErrorClassifier::classify_infrastructure("queue_unavailable", e.to_string())
        })?;
        for kind in kinds {
            let workers = registry.discover(Some(kind)).map_err(|e| {
                ErrorClassifier::classify_infrastructure("queue_unavailable", e.to_string())
            })?;
            let healthy = workers
                .iter()
                .any(|w| w.status.is_healthy() && w.heartbeat_age_secs < 30);
            if !healthy {
                return Err(ErrorClassifier::classify_infrastructure(
                    "no_workers",
                    format!("no workers registered for kind {kind}"),
                ));
            }
        }
        Ok(())
    }

    /// Advisory cache check: a hit only counts if the artifact still exists.
    fn cache_hit(
        &self,
        cache: &ResultCache,
        job: &cb_core::JobSpec,
    ) -> Result<bool, EngineError> {
        let Some(_entry) = cache.lookup(&job.output_path, &job.content_hash)? else {
            return Ok(false);
        };
        // Suppressed outputs leave no artifact; trust the entry itself.
        let suppressed = job.payload.get("suppress_output").and_then(|v| v.as_bool())
            == Some(true);
        if suppressed || job.output_path.exists() {
            debug!(output = %job.output_path.display(), "cache hit; skipping job");
            return Ok(true);
        }
        warn!(
            output = %job.output_path.display(),
            "cache entry present but artifact missing; invalidating"
        );
        cache.invalidate(&job.output_path, &job.content_hash)?;
        Ok(false)
    }

    async fn wait_for_stage(
        &mut self,
        ctx: &BuildContext,
        queue: &mut JobQueue,
        registry: &WorkerRegistry,
        submitted: &[i64],
        report: &mut BuildReport,
    ) -> Result<StageOutcome, EngineError> {
        let mut outcome = StageOutcome::default();
        if submitted.is_empty() {
            return Ok(outcome);
        }

        let deadline = Instant::now() + self.config.max_wait_for_completion;
        let progress_interval = progress_env::progress_interval();
        let mut last_progress = Instant::now();

        loop {
            let counts = queue.status_counts(submitted)?;
            let outstanding: Vec<i64> = counts
                .iter()
                .filter(|(_, s)| matches!(s, JobStatus::Pending | JobStatus::Processing))
                .map(|(id, _)| *id)
                .collect();

            if last_progress.elapsed() >= progress_interval || outstanding.is_empty() {
                last_progress = Instant::now();
                let workers = registry.discover(None)?;
                let active_workers = workers
                    .iter()
                    .filter(|w| w.status == cb_storage::WorkerStatus::Busy)
                    .count();
                let progress = BuildProgress {
                    total: report.total,
                    completed: report.completed
                        + count(&counts, JobStatus::Completed),
                    failed: report.failed + count(&counts, JobStatus::Failed),
                    cancelled: report.cancelled + count(&counts, JobStatus::Cancelled),
                    active_workers,
                };
                self.formatter.on_progress(&progress);

                if progress_env::show_worker_details() {
                    for worker in workers.iter().filter(|w| w.status.is_healthy()) {
                        info!(
                            worker_id = worker.id,
                            kind = %worker.kind,
                            status = %worker.status,
                            processed = worker.jobs_processed,
                            "worker detail"
                        );
                    }
                }
                self.call_out_long_jobs(queue, &outstanding)?;
            }

            if outstanding.is_empty() {
                break;
            }
            if ctx.is_shutting_down() {
                info!("shutdown requested; leaving outstanding jobs to the queue");
                outcome.timed_out = true;
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    outstanding = outstanding.len(),
                    timeout_secs = self.config.max_wait_for_completion.as_secs(),
                    "stage did not settle within the completion timeout"
                );
                for id in &outstanding {
                    warn!(job_id = id, "job still outstanding at timeout");
                }
                outcome.timed_out = true;
                break;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        let counts = queue.status_counts(submitted)?;
        report.completed += count(&counts, JobStatus::Completed);
        report.cancelled += count(&counts, JobStatus::Cancelled);
        let failed_ids: Vec<i64> = counts
            .iter()
            .filter(|(_, s)| *s == JobStatus::Failed)
            .map(|(id, _)| *id)
            .collect();
        report.failed += failed_ids.len();
        for id in failed_ids {
            if let Some(row) = queue.get(id)? {
                outcome.failed_rows.push(row);
            }
        }
        Ok(outcome)
    }

    /// Call out processing jobs that have been running longer than the
    /// configured threshold, once per progress tick.
    fn call_out_long_jobs(
        &mut self,
        queue: &JobQueue,
        outstanding: &[i64],
    ) -> Result<(), EngineError> {
        let threshold = progress_env::long_job_threshold();
        for &id in outstanding {
            let Some(row) = queue.get(id)? else { continue };
            if row.status != JobStatus::Processing {
                continue;
            }
            let Some(started_at) = row.started_at else { continue };
            let age = chrono_age_secs(started_at);
            if age >= threshold.as_secs() as i64 {
                info!(
                    job_id = id,
                    input = %row.input_file.display(),
                    running_secs = age,
                    "long-running job"
                );
            }
        }
        Ok(())
    }

    /// Final phase: copy directory groups into every target root, with any
    /// `.git` directories moved aside for the duration of the writes.
    fn copy_dir_groups(
        &mut self,
        ctx: &BuildContext,
        plan: &BuildPlan,
        report: &mut BuildReport,
    ) -> Result<(), EngineError> {
        if plan.dir_groups.is_empty() {
            return Ok(());
        }

        let roots: Vec<_> = plan
            .dir_groups
            .iter()
            .flat_map(|(_, roots)| roots.iter().cloned())
            .collect();
        let guard = GitDirGuard::move_aside(&roots)?;

        for (group, roots) in &plan.dir_groups {
            let source = ctx.config.data_dir.join(&group.path);
            if !source.is_dir() {
                warn!(group = %group.name, path = %source.display(), "dir group missing; skipping");
                continue;
            }
            for root in roots {
                let dest = root.join(&group.name);
                if let Err(e) = copy_tree(&source, &dest) {
                    let error = ErrorClassifier::classify_infrastructure(
                        "dir_copy_failed",
                        format!("copying {} to {}: {e}", source.display(), dest.display()),
                    );
                    self.formatter.on_job_error(&error);
                    report.errors.push(error);
                } else {
                    info!(group = %group.name, dest = %dest.display(), "copied dir group");
                }
            }
        }

        guard.restore()?;
        Ok(())
    }
}

#[derive(Default)]
struct StageOutcome {
    failed_rows: Vec<cb_storage::JobRow>,
    timed_out: bool,
}

fn count(counts: &[(i64, JobStatus)], status: JobStatus) -> usize {
    counts.iter().filter(|(_, s)| *s == status).count()
}

fn chrono_age_secs(started_at: chrono::DateTime<chrono::Utc>) -> i64 {
    (chrono::Utc::now() - started_at).num_seconds()
}

fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if from.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
