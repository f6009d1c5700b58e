// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-pool lifecycle management.
//!
//! One reconciliation pass per build (and again per watch cycle when
//! needed): load the desired pool shape, discover live workers, adopt the
//! healthy ones when reuse is enabled, start the deficit through the
//! backend-appropriate executor, and record an audit event at every
//! transition. Shutdown stops only workers this session started.

use crate::context::BuildContext;
use crate::error::EngineError;
use cb_adapters::{DirectExecutor, DockerExecutor, WorkerExecutor, WorkerLaunchConfig};
use cb_core::JobKind;
use cb_storage::{
    DiscoveredWorker, ExecutionMode, WorkerEventType, WorkerRegistry, WorkerStatus,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Heartbeats older than this disqualify a worker from adoption.
const HEALTHY_HEARTBEAT_SECS: i64 = 30;

/// Desired shape for one kind of worker.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerKindConfig {
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_mode")]
    pub execution_mode: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub memory_limit: Option<String>,
    #[serde(default = "default_true")]
    pub auto_start: bool,
    #[serde(default = "default_true")]
    pub auto_stop: bool,
    #[serde(default = "default_true")]
    pub reuse_workers: bool,
}

fn default_count() -> usize {
    1
}

fn default_mode() -> String {
    "direct".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for WorkerKindConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            execution_mode: default_mode(),
            image: None,
            env: HashMap::new(),
            memory_limit: None,
            auto_start: true,
            auto_stop: true,
            reuse_workers: true,
        }
    }
}

impl WorkerKindConfig {
    pub fn mode(&self) -> ExecutionMode {
        match self.execution_mode.as_str() {
            "docker" => ExecutionMode::Docker,
            _ => ExecutionMode::Direct,
        }
    }
}

/// Pool shape per job kind, loaded from `workers.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerPoolConfig {
    #[serde(default)]
    pub notebook: Option<WorkerKindConfig>,
    #[serde(default)]
    pub plantuml: Option<WorkerKindConfig>,
    #[serde(default)]
    pub drawio: Option<WorkerKindConfig>,
}

impl WorkerPoolConfig {
    /// Read `workers.toml`; a missing file means all defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| EngineError::SpecInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn for_kind(&self, kind: JobKind) -> WorkerKindConfig {
        let config = match kind {
            JobKind::Notebook => &self.notebook,
            JobKind::Plantuml => &self.plantuml,
            JobKind::Drawio => &self.drawio,
        };
        config.clone().unwrap_or_default()
    }
}

/// Reconciles the desired pool shape against discovered live workers.
pub struct LifecycleManager {
    pool: WorkerPoolConfig,
    direct: Box<dyn WorkerExecutor>,
    docker: Box<dyn WorkerExecutor>,
    /// Base URL of the API bridge handed to container workers.
    api_base_url: Option<String>,
    /// Executor ids this manager started, for teardown.
    started: Vec<(JobKind, String, ExecutionMode)>,
}

impl LifecycleManager {
    pub fn new(pool: WorkerPoolConfig) -> Self {
        Self {
            pool,
            direct: Box::new(DirectExecutor::new()),
            docker: Box::new(DockerExecutor::new()),
            api_base_url: None,
            started: Vec::new(),
        }
    }

    /// Swap executors (tests use fakes).
    pub fn with_executors(
        mut self,
        direct: Box<dyn WorkerExecutor>,
        docker: Box<dyn WorkerExecutor>,
    ) -> Self {
        self.direct = direct;
        self.docker = docker;
        self
    }

    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = Some(base_url.into());
        self
    }

    fn executor(&self, mode: ExecutionMode) -> &dyn WorkerExecutor {
        match mode {
            ExecutionMode::Direct => self.direct.as_ref(),
            ExecutionMode::Docker => self.docker.as_ref(),
        }
    }

    /// Bring the pool for every kind up to its configured shape.
    ///
    /// Returns the number of workers started (not adopted).
    pub async fn ensure_pool(
        &mut self,
        ctx: &BuildContext,
        kinds: &[JobKind],
    ) -> Result<usize, EngineError> {
        let registry = WorkerRegistry::open(&ctx.store)?;
        let mut started_total = 0;

        for &kind in kinds {
            let config = self.pool.for_kind(kind);
            if !config.auto_start {
                info!(kind = %kind, "auto_start disabled; not managing this pool");
                continue;
            }
            registry.record_event(
                WorkerEventType::PoolStarting,
                None,
                kind,
                Some(config.mode()),
                &format!("ensuring {} {kind} worker(s)", config.count),
                None,
                Some(&ctx.session_id),
            )?;

            let healthy = self.healthy_workers(&registry, kind).await?;
            let adopted = if config.reuse_workers {
                healthy.len().min(config.count)
            } else {
                0
            };
            if adopted > 0 {
                info!(kind = %kind, adopted, "adopting existing workers");
            }

            let deficit = config.count.saturating_sub(adopted);
            for _ in 0..deficit {
                started_total += 1;
                self.start_worker(ctx, &registry, kind, &config).await?;
            }

            registry.record_event(
                WorkerEventType::PoolStarted,
                None,
                kind,
                Some(config.mode()),
                &format!("pool ready ({adopted} adopted, {deficit} started)"),
                None,
                Some(&ctx.session_id),
            )?;
        }

        Ok(started_total)
    }

    /// Healthy means: status idle/busy, fresh heartbeat, and (when the
    /// backend can tell) the process/container actually alive.
    async fn healthy_workers(
        &self,
        registry: &WorkerRegistry,
        kind: JobKind,
    ) -> Result<Vec<DiscoveredWorker>, EngineError> {
        let mut healthy = Vec::new();
        for worker in registry.discover(Some(kind))? {
            if !worker.status.is_healthy() {
                continue;
            }
            if worker.heartbeat_age_secs >= HEALTHY_HEARTBEAT_SECS {
                continue;
            }
            // Containers can be probed by id; adopted direct workers from
            // another process cannot, so their heartbeat has to carry them.
            if worker.execution_mode == Some(ExecutionMode::Docker)
                && !self
                    .executor(ExecutionMode::Docker)
                    .is_running(&worker.container_id)
                    .await
            {
                continue;
            }
            healthy.push(worker);
        }
        Ok(healthy)
    }

    async fn start_worker(
        &mut self,
        ctx: &BuildContext,
        registry: &WorkerRegistry,
        kind: JobKind,
        config: &WorkerKindConfig,
    ) -> Result<(), EngineError> {
        let mode = config.mode();
        // Pre-register so the child activates a known id instead of racing
        // to self-register.
        let placeholder = format!("pending-{}", uuid::Uuid::new_v4());
        let worker_id = registry.pre_register(kind, &placeholder, mode, &ctx.session_id)?;

        registry.record_event(
            WorkerEventType::WorkerStarting,
            Some(worker_id),
            kind,
            Some(mode),
            "starting worker",
            None,
            Some(&ctx.session_id),
        )?;

        let launch = WorkerLaunchConfig {
            kind,
            worker_id: Some(worker_id),
            db_path: ctx.config.jobs_db_path.clone(),
            workspace_path: ctx.config.data_dir.clone(),
            api_base_url: match mode {
                ExecutionMode::Docker => self.api_base_url.clone(),
                ExecutionMode::Direct => None,
            },
            image: config.image.clone(),
            env: config.env.clone(),
            memory_limit: config.memory_limit.clone(),
            log_level: ctx.config.log_level.clone(),
        };

        match self.executor(mode).start(&launch).await {
            Ok(executor_id) => {
                // The placeholder becomes the real identity.
                registry.set_container_id(worker_id, &executor_id)?;
                registry.record_event(
                    WorkerEventType::WorkerRegistered,
                    Some(worker_id),
                    kind,
                    Some(mode),
                    &format!("worker launched as {executor_id}"),
                    None,
                    Some(&ctx.session_id),
                )?;
                self.started.push((kind, executor_id, mode));
                Ok(())
            }
            Err(e) => {
                registry.set_status(worker_id, WorkerStatus::Dead)?;
                registry.record_event(
                    WorkerEventType::WorkerFailed,
                    Some(worker_id),
                    kind,
                    Some(mode),
                    &format!("worker failed to start: {e}"),
                    None,
                    Some(&ctx.session_id),
                )?;
                Err(e.into())
            }
        }
    }

    /// Stop the workers this manager started (per-kind `auto_stop`), leaving
    /// adopted and foreign workers alone.
    pub async fn shutdown_pool(&mut self, ctx: &BuildContext) -> Result<(), EngineError> {
        let registry = WorkerRegistry::open(&ctx.store)?;

        for (kind, executor_id, mode) in std::mem::take(&mut self.started) {
            let config = self.pool.for_kind(kind);
            if !config.auto_stop {
                info!(kind = %kind, executor_id, "auto_stop disabled; leaving worker running");
                continue;
            }
            registry.record_event(
                WorkerEventType::PoolStopping,
                None,
                kind,
                Some(mode),
                &format!("stopping worker {executor_id}"),
                None,
                Some(&ctx.session_id),
            )?;
            if let Err(e) = self.executor(mode).stop(&executor_id).await {
                warn!(executor_id, error = %e, "failed to stop worker");
            }
            // The worker unregisters itself on a clean signal; make sure the
            // row does not linger as healthy if it died hard.
            for worker in registry.discover(Some(kind))? {
                if worker.container_id == executor_id && worker.status.is_healthy() {
                    registry.set_status(worker.id, WorkerStatus::Dead)?;
                }
            }
            registry.record_event(
                WorkerEventType::PoolStopped,
                None,
                kind,
                Some(mode),
                &format!("stopped worker {executor_id}"),
                None,
                Some(&ctx.session_id),
            )?;
        }
        Ok(())
    }

    /// Executor ids started by this manager (visible for tests).
    pub fn started_ids(&self) -> Vec<String> {
        self.started.iter().map(|(_, id, _)| id.clone()).collect()
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
