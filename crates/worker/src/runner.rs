// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker loop.
//!
//! Claim a job of our kind; if none, heartbeat and sleep one poll interval;
//! otherwise process it and report the terminal status. A shutdown flag set
//! by signal handlers (or the parent-pid watchdog) is observed once per
//! iteration, so the loop exits within a poll interval of the signal.

use crate::backend::QueueBackend;
use crate::error::WorkerError;
use crate::process::{process_job, ProcessContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pre-assigned worker row id from the lifecycle manager, if any.
    pub pre_assigned_id: Option<i64>,
    pub poll_interval: Duration,
    /// Heartbeat at least this often even while processing back-to-back jobs.
    pub heartbeat_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pre_assigned_id: None,
            poll_interval: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(10),
        }
    }
}

/// Drives one worker process until shutdown.
pub struct Runner<B: QueueBackend> {
    backend: B,
    ctx: ProcessContext,
    config: RunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl<B: QueueBackend> Runner<B> {
    pub fn new(
        backend: B,
        ctx: ProcessContext,
        config: RunnerConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            backend,
            ctx,
            config,
            shutdown,
        }
    }

    /// Register/activate, loop until the shutdown flag is set, unregister.
    pub async fn run(mut self) -> Result<(), WorkerError> {
        let worker_id = self.backend.init(self.config.pre_assigned_id).await?;
        let mut last_heartbeat = Instant::now();

        while !self.shutdown.load(Ordering::SeqCst) {
            let job = match self.backend.claim().await {
                Ok(job) => job,
                Err(e) => {
                    warn!(worker_id, error = %e, "claim failed; backing off");
                    tokio::time::sleep(self.config.poll_interval).await;
                    continue;
                }
            };

            let Some(job) = job else {
                self.backend.heartbeat().await?;
                last_heartbeat = Instant::now();
                tokio::time::sleep(self.config.poll_interval).await;
                continue;
            };

            // Checkpoint: the job may have been superseded between enqueue
            // and claim.
            if self.backend.is_cancelled(job.id).await.unwrap_or(false) {
                info!(worker_id, job_id = job.id, "job cancelled before processing");
                continue;
            }

            self.backend.set_busy(true).await?;
            let started = Instant::now();
            let outcome = process_job(&job, &self.ctx).await;
            let elapsed = started.elapsed().as_secs_f64();

            // Checkpoint: abandon superseded work instead of reporting it.
            if self.backend.is_cancelled(job.id).await.unwrap_or(false) {
                info!(worker_id, job_id = job.id, "job cancelled during processing");
                self.backend.set_busy(false).await?;
                continue;
            }

            match outcome {
                Ok(result) => {
                    self.backend
                        .add_to_cache(
                            &job.output_file,
                            &job.content_hash,
                            Some(result.clone()),
                        )
                        .await
                        .unwrap_or_else(|e| {
                            warn!(worker_id, job_id = job.id, error = %e, "cache add failed")
                        });
                    self.backend.complete(job.id, result).await?;
                    self.backend.record_outcome(true, elapsed).await?;
                    info!(worker_id, job_id = job.id, elapsed_secs = elapsed, "job completed");
                }
                Err(error_json) => {
                    let value = serde_json::to_value(&error_json)
                        .unwrap_or_else(|_| serde_json::json!({
                            "error_class": "SerializationError",
                            "error_message": error_json.error_message,
                        }));
                    self.backend.fail(job.id, value).await?;
                    self.backend.record_outcome(false, elapsed).await?;
                    warn!(
                        worker_id,
                        job_id = job.id,
                        error_class = %error_json.error_class,
                        "job failed"
                    );
                }
            }

            self.backend.set_busy(false).await?;
            if last_heartbeat.elapsed() >= self.config.heartbeat_interval {
                self.backend.heartbeat().await?;
                last_heartbeat = Instant::now();
            }
        }

        info!(worker_id, "worker shutting down");
        self.backend.unregister("shutdown signal").await?;
        Ok(())
    }
}

/// Watch the parent process and set the shutdown flag when it disappears.
///
/// A worker orphaned by a crashed host must not keep claiming jobs against
/// a queue nobody is driving.
pub fn spawn_parent_watchdog(parent_pid: u32, shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let proc_path = std::path::PathBuf::from(format!("/proc/{parent_pid}"));
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            if !proc_path.exists() {
                warn!(parent_pid, "parent process gone; shutting down");
                shutdown.store(true, Ordering::SeqCst);
                return;
            }
        }
    });
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
