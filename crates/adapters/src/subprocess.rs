// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for diagram converter invocations.
pub const DIAGRAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for notebook processor invocations.
/// Set to 10 minutes as a safety net for long-running execution cells.
pub const NOTEBOOK_TIMEOUT: Duration = Duration::from_secs(600);

/// Default timeout for docker run/stop/inspect commands.
pub const DOCKER_TIMEOUT: Duration = Duration::from_secs(60);

/// What happened to a subprocess, with enough detail for retry decisions.
///
/// Timeouts and crashes are distinct outcomes rather than error strings:
/// timeouts retry with a longer budget, crashes retry only when the caller
/// opts in, and spawn failures (missing executable, permission denied) never
/// retry.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Process ran to completion (inspect `status` for the exit code).
    Completed(Output),
    /// Process exceeded its timeout and was killed.
    TimedOut { timeout: Duration },
    /// Process terminated by a signal (crash).
    Crashed { output: Output },
    /// Process could not be spawned at all.
    SpawnFailed { error: std::io::Error },
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Completed(output) if output.status.success())
    }
}

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`. The child process
/// is killed automatically if the timeout elapses (via `kill_on_drop`).
/// A process killed by a signal is reported as `Crashed`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> CommandOutcome {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                if output.status.signal().is_some() {
                    tracing::warn!(
                        description,
                        signal = output.status.signal(),
                        "subprocess crashed"
                    );
                    return CommandOutcome::Crashed { output };
                }
            }
            CommandOutcome::Completed(output)
        }
        Ok(Err(io_err)) => {
            tracing::warn!(description, error = %io_err, "subprocess spawn failed");
            CommandOutcome::SpawnFailed { error: io_err }
        }
        Err(_elapsed) => {
            tracing::warn!(description, timeout_secs = timeout.as_secs(), "subprocess timed out");
            CommandOutcome::TimedOut { timeout }
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
