// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker container executor.
//!
//! Starts one container per worker, mounting the workspace and the database
//! directory. Containerized workers cannot open the host's SQLite file
//! safely, so they talk to the worker API bridge instead; the base URL is
//! passed through the environment.

use super::{ExecutorError, WorkerExecutor, WorkerLaunchConfig};
use crate::env;
use crate::subprocess::{run_with_timeout, CommandOutcome, DOCKER_TIMEOUT};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

/// Launches workers as docker containers via the docker CLI.
pub struct DockerExecutor {
    docker_binary: String,
}

impl DockerExecutor {
    pub fn new() -> Self {
        Self {
            docker_binary: "docker".to_string(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.docker_binary)
    }
}

impl Default for DockerExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerExecutor for DockerExecutor {
    async fn start(&self, config: &WorkerLaunchConfig) -> Result<String, ExecutorError> {
        let image = config.image.as_deref().ok_or_else(|| {
            ExecutorError::StartFailed(format!(
                "no image configured for {} docker workers",
                config.kind
            ))
        })?;

        let mut cmd = self.command();
        cmd.arg("run").arg("--detach").arg("--rm");

        cmd.arg("--volume").arg(format!(
            "{}:/workspace",
            config.workspace_path.display()
        ));

        if let Some(base_url) = &config.api_base_url {
            cmd.arg("--env").arg(format!("CB_API_BASE_URL={base_url}"));
            // Containers reach the host's API bridge, not the database file.
            cmd.arg("--add-host").arg("host.docker.internal:host-gateway");
        }
        if let Some(worker_id) = config.worker_id {
            cmd.arg("--env").arg(format!("{}={worker_id}", env::WORKER_ID));
        }
        cmd.arg("--env")
            .arg(format!("{}=/workspace", env::WORKSPACE_PATH));
        cmd.arg("--env")
            .arg(format!("{}={}", env::LOG_LEVEL, config.log_level));
        for (key, value) in &config.env {
            cmd.arg("--env").arg(format!("{key}={value}"));
        }
        if let Some(limit) = &config.memory_limit {
            cmd.arg("--memory").arg(limit);
        }

        cmd.arg(image).arg("--kind").arg(config.kind.as_str());

        match run_with_timeout(cmd, DOCKER_TIMEOUT, "docker run").await {
            CommandOutcome::Completed(output) if output.status.success() => {
                let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
                info!(container_id, kind = %config.kind, image, "started docker worker");
                Ok(container_id)
            }
            CommandOutcome::Completed(output) => Err(ExecutorError::StartFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            CommandOutcome::TimedOut { timeout } => Err(ExecutorError::StartFailed(format!(
                "docker run timed out after {}s",
                timeout.as_secs()
            ))),
            CommandOutcome::Crashed { .. } => {
                Err(ExecutorError::StartFailed("docker run crashed".to_string()))
            }
            CommandOutcome::SpawnFailed { error } => {
                Err(ExecutorError::DockerUnavailable(error.to_string()))
            }
        }
    }

    async fn stop(&self, executor_id: &str) -> Result<(), ExecutorError> {
        let mut cmd = self.command();
        cmd.arg("stop").arg(executor_id);

        match run_with_timeout(cmd, DOCKER_TIMEOUT, "docker stop").await {
            CommandOutcome::Completed(output) if output.status.success() => {
                info!(container_id = executor_id, "stopped docker worker");
                Ok(())
            }
            CommandOutcome::Completed(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                // Stopping an already-gone container is fine.
                if stderr.contains("No such container") {
                    return Ok(());
                }
                Err(ExecutorError::StopFailed {
                    id: executor_id.to_string(),
                    message: stderr.trim().to_string(),
                })
            }
            outcome => Err(ExecutorError::StopFailed {
                id: executor_id.to_string(),
                message: format!("{outcome:?}"),
            }),
        }
    }

    async fn is_running(&self, executor_id: &str) -> bool {
        let mut cmd = self.command();
        cmd.arg("inspect")
            .arg("--format")
            .arg("{{.State.Running}}")
            .arg(executor_id);

        match run_with_timeout(cmd, DOCKER_TIMEOUT, "docker inspect").await {
            CommandOutcome::Completed(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim() == "true"
            }
            _ => {
                warn!(container_id = executor_id, "docker inspect failed; assuming dead");
                false
            }
        }
    }
}
