// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! Worker processes receive their identity and paths through the `CLM_*`
//! contract; end-to-end progress reporting is tuned through `CLX_E2E_*`.

use std::path::PathBuf;
use std::time::Duration;

/// Pre-assigned worker id handed down by the lifecycle manager.
pub const WORKER_ID: &str = "CLM_WORKER_ID";
/// Pid of the coordinating host process; workers self-exit when it dies.
pub const PARENT_PID: &str = "CLM_PARENT_PID";
/// Path to the jobs database.
pub const DB_PATH: &str = "DB_PATH";
/// Root of the authoring workspace mounted into workers.
pub const WORKSPACE_PATH: &str = "WORKSPACE_PATH";
/// Log filter for spawned workers.
pub const LOG_LEVEL: &str = "LOG_LEVEL";

pub fn worker_id() -> Option<i64> {
    std::env::var(WORKER_ID).ok().and_then(|s| s.parse().ok())
}

pub fn parent_pid() -> Option<u32> {
    std::env::var(PARENT_PID).ok().and_then(|s| s.parse().ok())
}

pub fn db_path() -> Option<PathBuf> {
    std::env::var(DB_PATH).ok().map(PathBuf::from)
}

pub fn workspace_path() -> Option<PathBuf> {
    std::env::var(WORKSPACE_PATH).ok().map(PathBuf::from)
}

fn parse_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|s| *s >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Interval between progress lines (default: 10s).
pub fn progress_interval() -> Duration {
    parse_secs("CLX_E2E_PROGRESS_INTERVAL").unwrap_or(Duration::from_secs(10))
}

/// Age past which a running job is called out as long-running (default: 60s).
pub fn long_job_threshold() -> Duration {
    parse_secs("CLX_E2E_LONG_JOB_THRESHOLD").unwrap_or(Duration::from_secs(60))
}

/// Whether progress lines include per-worker detail.
pub fn show_worker_details() -> bool {
    std::env::var("CLX_E2E_SHOW_WORKER_DETAILS")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}
