// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background reapers.
//!
//! Two slow periodic loops keep long-running sessions healthy: the hung-job
//! reaper resets `processing` jobs whose worker stopped heartbeating, and
//! the correlation reaper evicts stale request entries. Both observe the
//! shared shutdown flag once per tick.

use cb_core::{CorrelationRegistry, STALE_CID_MAX_LIFETIME};
use cb_storage::{JobQueue, Store, WorkerRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often the reapers wake up.
    pub interval: Duration,
    /// Age after which a processing job is considered hung.
    pub job_timeout: Duration,
    /// Heartbeat age after which a worker is marked hung/dead.
    pub worker_timeout: Duration,
    pub correlation_max_lifetime: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            job_timeout: Duration::from_secs(300),
            worker_timeout: Duration::from_secs(30),
            correlation_max_lifetime: STALE_CID_MAX_LIFETIME,
        }
    }
}

/// Periodically reset hung jobs and reap stale workers.
pub fn spawn_hung_job_reaper(
    store: Store,
    config: ReaperConfig,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(config.interval).await;
            if shutdown.load(Ordering::SeqCst) {
                return;
            }

            match WorkerRegistry::open(&store) {
                Ok(registry) => {
                    match registry.reap_stale(config.worker_timeout.as_secs() as i64) {
                        Ok(0) => {}
                        Ok(count) => debug!(count, "reaped stale workers"),
                        Err(e) => warn!(error = %e, "worker reap failed"),
                    }
                }
                Err(e) => warn!(error = %e, "worker reap could not open registry"),
            }

            match JobQueue::open(&store) {
                Ok(mut queue) => {
                    match queue.reset_hung(config.job_timeout.as_secs() as i64) {
                        Ok(0) => {}
                        Ok(count) => warn!(count, "reset hung jobs"),
                        Err(e) => warn!(error = %e, "hung-job reset failed"),
                    }
                }
                Err(e) => warn!(error = %e, "hung-job reset could not open queue"),
            }
        }
    })
}

/// Periodically evict stale correlation entries.
pub fn spawn_correlation_reaper(
    correlations: Arc<CorrelationRegistry>,
    config: ReaperConfig,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(config.interval).await;
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            let reaped = correlations.reap_stale(config.correlation_max_lifetime);
            if !reaped.is_empty() {
                warn!(count = reaped.len(), "reaped stale correlation ids");
            }
        }
    })
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
