// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess retry policy.
//!
//! Timeouts retry with an exponentially growing budget. Crashes retry only
//! when the caller opts in. Spawn failures (missing executable, permission
//! denied) never retry; waiting will not install the binary.

use cb_adapters::{run_with_timeout, CommandOutcome};
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_timeout: Duration,
    pub retry_on_crash: bool,
}

impl RetryPolicy {
    pub fn new(base_timeout: Duration) -> Self {
        Self {
            max_retries: 2,
            base_timeout,
            retry_on_crash: false,
        }
    }

    pub fn with_retry_on_crash(mut self, retry_on_crash: bool) -> Self {
        self.retry_on_crash = retry_on_crash;
        self
    }

    fn timeout_for_attempt(&self, attempt: u32) -> Duration {
        // Exponential backoff on the timeout budget: 1x, 2x, 4x, ...
        self.base_timeout * 2u32.saturating_pow(attempt)
    }
}

/// Run the command produced by `make_cmd`, retrying per the policy.
///
/// `make_cmd` is called once per attempt because a `Command` cannot be
/// reused after `output()`.
pub async fn run_with_retry(
    mut make_cmd: impl FnMut() -> Command,
    policy: &RetryPolicy,
    description: &str,
) -> CommandOutcome {
    let mut attempt = 0;
    loop {
        let timeout = policy.timeout_for_attempt(attempt);
        let outcome = run_with_timeout(make_cmd(), timeout, description).await;

        let retriable = match &outcome {
            CommandOutcome::TimedOut { .. } => true,
            CommandOutcome::Crashed { .. } => policy.retry_on_crash,
            CommandOutcome::Completed(_) | CommandOutcome::SpawnFailed { .. } => false,
        };

        if !retriable || attempt >= policy.max_retries {
            return outcome;
        }
        attempt += 1;
        warn!(
            description,
            attempt,
            next_timeout_secs = policy.timeout_for_attempt(attempt).as_secs(),
            "retrying subprocess"
        );
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
