// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake executor for lifecycle tests.

use super::{ExecutorError, WorkerExecutor, WorkerLaunchConfig};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Records starts/stops and lets tests flip liveness per executor id.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    running: HashSet<String>,
    started: Vec<WorkerLaunchConfig>,
    stopped: Vec<String>,
    fail_next_start: bool,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<WorkerLaunchConfig> {
        self.inner.lock().started.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.inner.lock().stopped.clone()
    }

    /// Make the next `start` call fail.
    pub fn fail_next_start(&self) {
        self.inner.lock().fail_next_start = true;
    }

    /// Simulate a worker dying outside the executor's control.
    pub fn mark_dead(&self, executor_id: &str) {
        self.inner.lock().running.remove(executor_id);
    }

    /// Pretend a worker with this id is alive (e.g. adopted, not started).
    pub fn mark_alive(&self, executor_id: &str) {
        self.inner.lock().running.insert(executor_id.to_string());
    }
}

#[async_trait]
impl WorkerExecutor for FakeExecutor {
    async fn start(&self, config: &WorkerLaunchConfig) -> Result<String, ExecutorError> {
        let mut state = self.inner.lock();
        if state.fail_next_start {
            state.fail_next_start = false;
            return Err(ExecutorError::StartFailed("fake start failure".to_string()));
        }
        state.next_id += 1;
        let id = format!("direct-fake-{}", state.next_id);
        state.running.insert(id.clone());
        state.started.push(config.clone());
        Ok(id)
    }

    async fn stop(&self, executor_id: &str) -> Result<(), ExecutorError> {
        let mut state = self.inner.lock();
        state.running.remove(executor_id);
        state.stopped.push(executor_id.to_string());
        Ok(())
    }

    async fn is_running(&self, executor_id: &str) -> bool {
        self.inner.lock().running.contains(executor_id)
    }
}
