// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch mode: reprocess changed files in a long-running pool.
//!
//! Filesystem events are filtered for course relevance, debounced per path,
//! and then turned into a supersession cycle: cancel still-pending jobs for
//! the path, plan that one file under a fresh correlation id, and enqueue
//! the result into the already-running pool.

use crate::context::BuildContext;
use crate::debounce::Debouncer;
use crate::planner::{course_file_for_path, Planner};
use cb_core::CourseModel;
use cb_storage::JobQueue;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub debounce_delay: Duration,
    /// File-name suffixes never considered course-relevant.
    pub ignore_suffixes: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(300),
            ignore_suffixes: vec![
                ".tmp".to_string(),
                ".swp".to_string(),
                ".part".to_string(),
                "~".to_string(),
            ],
        }
    }
}

/// Directories whose contents never trigger rebuilds.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".idea",
    ".vscode",
    "__pycache__",
    ".ipynb_checkpoints",
    "node_modules",
    "target",
];

/// Editor lock/backup prefixes.
const IGNORED_PREFIXES: &[&str] = &[".#", "#", ".~lock"];

pub struct Watcher {
    options: WatchOptions,
}

impl Watcher {
    pub fn new(options: WatchOptions) -> Self {
        Self { options }
    }

    /// Whether a changed path should trigger a rebuild cycle.
    pub fn is_course_relevant(&self, model: &CourseModel, data_dir: &Path, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(data_dir) else {
            return false;
        };
        for component in relative.components() {
            let name = component.as_os_str().to_string_lossy();
            if IGNORED_DIRS.contains(&name.as_ref()) {
                return false;
            }
        }
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };
        if IGNORED_PREFIXES.iter().any(|p| file_name.starts_with(p)) {
            return false;
        }
        if self
            .options
            .ignore_suffixes
            .iter()
            .any(|s| file_name.ends_with(s.as_str()))
        {
            return false;
        }
        // Only files the course model knows can produce jobs.
        course_file_for_path(model, data_dir, path).is_some()
    }

    /// Run the watch loop until the context's shutdown flag is set.
    ///
    /// Returns the number of rebuild cycles that ran (useful for tests).
    pub async fn run(
        &self,
        ctx: &BuildContext,
        model: &CourseModel,
    ) -> Result<usize, crate::error::EngineError> {
        let (event_tx, mut event_rx) = mpsc::channel::<PathBuf>(256);

        // notify delivers on its own thread; forward into the async world.
        let forward_tx = event_tx.clone();
        let mut fs_watcher: RecommendedWatcher = notify::recommended_watcher(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    for path in event.paths {
                        let _ = forward_tx.blocking_send(path);
                    }
                }
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )
        .map_err(|e| {
            crate::error::EngineError::Watch(format!("cannot start filesystem watcher: {e}"))
        })?;
        fs_watcher
            .watch(&ctx.config.data_dir, RecursiveMode::Recursive)
            .map_err(|e| {
                crate::error::EngineError::Watch(format!(
                    "cannot watch {}: {e}",
                    ctx.config.data_dir.display()
                ))
            })?;

        info!(dir = %ctx.config.data_dir.display(), "watching for changes");
        let (mut debouncer, mut ready_rx) = Debouncer::new(self.options.debounce_delay);
        let mut cycles = 0usize;

        loop {
            if ctx.is_shutting_down() {
                break;
            }
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(path) = event else { break };
                    if self.is_course_relevant(model, &ctx.config.data_dir, &path) {
                        debug!(path = %path.display(), "relevant change detected");
                        debouncer.on_event(path);
                    }
                }
                settled = ready_rx.recv() => {
                    let Some(path) = settled else { break };
                    debouncer.mark_settled(&path);
                    match self.rebuild_file(ctx, model, &path) {
                        Ok(jobs) => {
                            cycles += 1;
                            info!(path = %path.display(), jobs, "rebuild cycle enqueued");
                        }
                        Err(e) => warn!(path = %path.display(), error = %e, "rebuild cycle failed"),
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(200)) => {
                    // Shutdown poll point.
                }
            }
        }

        Ok(cycles)
    }

    /// One supersession cycle for a settled path.
    fn rebuild_file(
        &self,
        ctx: &BuildContext,
        model: &CourseModel,
        path: &Path,
    ) -> Result<usize, crate::error::EngineError> {
        let Some(file) = course_file_for_path(model, &ctx.config.data_dir, path) else {
            return Ok(0);
        };

        let correlation_id = ctx.correlations.new_correlation_id();
        let mut queue = JobQueue::open(&ctx.store)?;

        let cancelled = queue.cancel_for_input(
            &ctx.config.data_dir.join(&file.path),
            Some(&correlation_id),
        )?;
        if !cancelled.is_empty() {
            info!(
                path = %file.path.display(),
                cancelled = cancelled.len(),
                "cancelled superseded jobs"
            );
        }

        let planner = Planner::new(model, &ctx.config.filter, &ctx.config.data_dir)
            .with_correlation_id(correlation_id.clone());
        let jobs = planner.plan_file(file)?;
        for job in &jobs {
            let job_id = queue.enqueue(job)?;
            ctx.correlations
                .note_dependency(&correlation_id, job_id.to_string());
        }
        Ok(jobs.len())
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
