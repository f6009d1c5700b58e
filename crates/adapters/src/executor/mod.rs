// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker executor backends.
//!
//! One contract over two very different launch mechanisms: a direct child
//! process of the host, or a docker container with the workspace and
//! database mounted in. Neither backend assumes the other is available.

mod direct;
mod docker;

pub use direct::DirectExecutor;
pub use docker::DockerExecutor;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeExecutor;

use async_trait::async_trait;
use cb_core::JobKind;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from executor operations
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to start worker: {0}")]
    StartFailed(String),
    #[error("failed to stop worker {id}: {message}")]
    StopFailed { id: String, message: String },
    #[error("docker unavailable: {0}")]
    DockerUnavailable(String),
}

/// Everything needed to launch one worker.
#[derive(Debug, Clone)]
pub struct WorkerLaunchConfig {
    pub kind: JobKind,
    /// Pre-assigned worker row id; the child activates instead of
    /// self-registering when present.
    pub worker_id: Option<i64>,
    pub db_path: PathBuf,
    pub workspace_path: PathBuf,
    /// Base URL of the worker API bridge, for backends that cannot reach
    /// the database file directly.
    pub api_base_url: Option<String>,
    /// Container image (docker backend only).
    pub image: Option<String>,
    /// Extra environment for the worker process.
    pub env: HashMap<String, String>,
    /// Memory limit such as "512m" (docker backend only).
    pub memory_limit: Option<String>,
    pub log_level: String,
}

/// Start/stop/probe for one worker, independent of backend.
#[async_trait]
pub trait WorkerExecutor: Send + Sync + 'static {
    /// Launch a worker; returns the executor id (`direct-<uuid>` or the
    /// container id) that also serves as the worker's `container_id`.
    async fn start(&self, config: &WorkerLaunchConfig) -> Result<String, ExecutorError>;

    /// Stop a worker this executor started.
    async fn stop(&self, executor_id: &str) -> Result<(), ExecutorError>;

    /// Whether the process/container behind `executor_id` is still alive.
    async fn is_running(&self, executor_id: &str) -> bool;
}
