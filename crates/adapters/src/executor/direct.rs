// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct subprocess executor.
//!
//! Spawns `cbworker` as a child of the host process. Identity is
//! `direct-<uuid>`; the worker receives its pre-assigned row id and the
//! database path through the environment, and self-exits if the parent pid
//! disappears.

use super::{ExecutorError, WorkerExecutor, WorkerLaunchConfig};
use crate::env;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{info, warn};
use uuid::Uuid;

/// Launches workers as local child processes.
pub struct DirectExecutor {
    /// Binary to spawn; defaults to `cbworker` on PATH.
    worker_binary: String,
    children: Mutex<HashMap<String, Child>>,
}

impl DirectExecutor {
    pub fn new() -> Self {
        Self::with_binary("cbworker")
    }

    pub fn with_binary(worker_binary: impl Into<String>) -> Self {
        Self {
            worker_binary: worker_binary.into(),
            children: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for DirectExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerExecutor for DirectExecutor {
    async fn start(&self, config: &WorkerLaunchConfig) -> Result<String, ExecutorError> {
        let executor_id = format!("direct-{}", Uuid::new_v4());

        let mut cmd = Command::new(&self.worker_binary);
        cmd.arg("--kind")
            .arg(config.kind.as_str())
            .arg("--container-id")
            .arg(&executor_id)
            .env(env::DB_PATH, &config.db_path)
            .env(env::WORKSPACE_PATH, &config.workspace_path)
            .env(env::PARENT_PID, std::process::id().to_string())
            .env(env::LOG_LEVEL, &config.log_level)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        if let Some(worker_id) = config.worker_id {
            cmd.env(env::WORKER_ID, worker_id.to_string());
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let child = cmd
            .spawn()
            .map_err(|e| ExecutorError::StartFailed(format!("{}: {e}", self.worker_binary)))?;

        info!(
            executor_id,
            kind = %config.kind,
            pid = child.id(),
            "started direct worker"
        );
        self.children.lock().insert(executor_id.clone(), child);
        Ok(executor_id)
    }

    async fn stop(&self, executor_id: &str) -> Result<(), ExecutorError> {
        let child = self.children.lock().remove(executor_id);
        let Some(mut child) = child else {
            // Not ours (e.g. adopted from a previous session); nothing to do.
            return Ok(());
        };

        if let Err(e) = child.start_kill() {
            warn!(executor_id, error = %e, "failed to signal worker");
        }
        child.wait().await.map_err(|e| ExecutorError::StopFailed {
            id: executor_id.to_string(),
            message: e.to_string(),
        })?;
        info!(executor_id, "stopped direct worker");
        Ok(())
    }

    async fn is_running(&self, executor_id: &str) -> bool {
        let mut children = self.children.lock();
        match children.get_mut(executor_id) {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "direct_tests.rs"]
mod tests;
