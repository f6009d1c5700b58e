// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue backends: the same worker loop runs against the SQLite file
//! directly (direct workers) or against the API bridge (container workers).

use crate::error::WorkerError;
use async_trait::async_trait;
use cb_api::WorkerApiClient;
use cb_core::JobKind;
use cb_storage::{
    ExecutionMode, JobQueue, ResultCache, Store, WorkerEventType, WorkerRegistry, WorkerStatus,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// The slice of a job a processor needs.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: i64,
    pub kind: JobKind,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub content_hash: String,
    pub payload: serde_json::Value,
    pub correlation_id: Option<String>,
}

/// Queue operations as seen from one worker process.
#[async_trait]
pub trait QueueBackend: Send {
    /// Activate the pre-assigned identity, or self-register a fresh one.
    /// Returns the worker id.
    async fn init(&mut self, pre_assigned: Option<i64>) -> Result<i64, WorkerError>;

    async fn claim(&mut self) -> Result<Option<ClaimedJob>, WorkerError>;

    async fn complete(&mut self, job_id: i64, result: serde_json::Value)
        -> Result<(), WorkerError>;

    async fn fail(&mut self, job_id: i64, error: serde_json::Value) -> Result<(), WorkerError>;

    async fn heartbeat(&mut self) -> Result<(), WorkerError>;

    async fn is_cancelled(&mut self, job_id: i64) -> Result<bool, WorkerError>;

    /// Flip idle/busy. Backends without a status channel treat this as a
    /// no-op.
    async fn set_busy(&mut self, busy: bool) -> Result<(), WorkerError>;

    async fn record_outcome(&mut self, success: bool, secs: f64) -> Result<(), WorkerError>;

    async fn add_to_cache(
        &mut self,
        output_file: &Path,
        content_hash: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), WorkerError>;

    async fn unregister(&mut self, reason: &str) -> Result<(), WorkerError>;
}

/// Direct SQLite access for workers on the host.
pub struct SqliteBackend {
    kind: JobKind,
    container_id: String,
    parent_pid: Option<i64>,
    queue: JobQueue,
    registry: WorkerRegistry,
    cache: ResultCache,
    worker_id: Option<i64>,
}

impl SqliteBackend {
    pub fn open(
        store: &Store,
        kind: JobKind,
        container_id: impl Into<String>,
        parent_pid: Option<i64>,
    ) -> Result<Self, WorkerError> {
        Ok(Self {
            kind,
            container_id: container_id.into(),
            parent_pid,
            queue: JobQueue::open(store)?,
            registry: WorkerRegistry::open(store)?,
            cache: ResultCache::open(store)?,
            worker_id: None,
        })
    }

    fn require_id(&self) -> Result<i64, WorkerError> {
        self.worker_id.ok_or(WorkerError::NotInitialized)
    }
}

#[async_trait]
impl QueueBackend for SqliteBackend {
    async fn init(&mut self, pre_assigned: Option<i64>) -> Result<i64, WorkerError> {
        let worker_id = match pre_assigned {
            Some(id) => {
                self.registry.activate(id, self.parent_pid)?;
                id
            }
            None => self.registry.register(
                self.kind,
                &self.container_id,
                ExecutionMode::Direct,
                self.parent_pid,
            )?,
        };
        self.worker_id = Some(worker_id);
        self.registry.record_event(
            WorkerEventType::WorkerReady,
            Some(worker_id),
            self.kind,
            Some(ExecutionMode::Direct),
            "worker ready to process jobs",
            None,
            None,
        )?;
        info!(worker_id, kind = %self.kind, "worker initialized (direct)");
        Ok(worker_id)
    }

    async fn claim(&mut self) -> Result<Option<ClaimedJob>, WorkerError> {
        let worker_id = self.require_id()?;
        let job = self.queue.claim(self.kind, worker_id)?;
        Ok(job.map(|row| ClaimedJob {
            id: row.id,
            kind: row.kind,
            input_file: row.input_file,
            output_file: row.output_file,
            content_hash: row.content_hash,
            payload: row.payload,
            correlation_id: row.correlation_id,
        }))
    }

    async fn complete(
        &mut self,
        job_id: i64,
        result: serde_json::Value,
    ) -> Result<(), WorkerError> {
        self.queue.update_status(
            job_id,
            cb_core::JobStatus::Completed,
            None,
            Some(&result.to_string()),
        )?;
        Ok(())
    }

    async fn fail(&mut self, job_id: i64, error: serde_json::Value) -> Result<(), WorkerError> {
        self.queue.update_status(
            job_id,
            cb_core::JobStatus::Failed,
            Some(&error.to_string()),
            None,
        )?;
        Ok(())
    }

    async fn heartbeat(&mut self) -> Result<(), WorkerError> {
        let worker_id = self.require_id()?;
        self.registry.heartbeat(worker_id)?;
        Ok(())
    }

    async fn is_cancelled(&mut self, job_id: i64) -> Result<bool, WorkerError> {
        Ok(self.queue.is_cancelled(job_id)?)
    }

    async fn set_busy(&mut self, busy: bool) -> Result<(), WorkerError> {
        let worker_id = self.require_id()?;
        let status = if busy {
            WorkerStatus::Busy
        } else {
            WorkerStatus::Idle
        };
        self.registry.set_status(worker_id, status)?;
        Ok(())
    }

    async fn record_outcome(&mut self, success: bool, secs: f64) -> Result<(), WorkerError> {
        let worker_id = self.require_id()?;
        self.registry.record_job_outcome(worker_id, success, secs)?;
        Ok(())
    }

    async fn add_to_cache(
        &mut self,
        output_file: &Path,
        content_hash: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), WorkerError> {
        self.cache
            .insert(output_file, content_hash, metadata.as_ref())?;
        Ok(())
    }

    async fn unregister(&mut self, reason: &str) -> Result<(), WorkerError> {
        let worker_id = self.require_id()?;
        self.registry.unregister(worker_id, Some(reason))?;
        Ok(())
    }
}

/// REST access for container workers.
pub struct RestBackend {
    kind: JobKind,
    container_id: String,
    parent_pid: Option<i64>,
    client: WorkerApiClient,
    worker_id: Option<i64>,
}

impl RestBackend {
    pub fn new(
        client: WorkerApiClient,
        kind: JobKind,
        container_id: impl Into<String>,
        parent_pid: Option<i64>,
    ) -> Self {
        Self {
            kind,
            container_id: container_id.into(),
            parent_pid,
            client,
            worker_id: None,
        }
    }

    fn require_id(&self) -> Result<i64, WorkerError> {
        self.worker_id.ok_or(WorkerError::NotInitialized)
    }
}

#[async_trait]
impl QueueBackend for RestBackend {
    async fn init(&mut self, pre_assigned: Option<i64>) -> Result<i64, WorkerError> {
        let worker_id = match pre_assigned {
            Some(id) => {
                self.client.activate(id, self.parent_pid).await?;
                id
            }
            None => {
                self.client
                    .register(self.kind, &self.container_id, self.parent_pid)
                    .await?
                    .worker_id
            }
        };
        self.worker_id = Some(worker_id);
        info!(worker_id, kind = %self.kind, "worker initialized (rest)");
        Ok(worker_id)
    }

    async fn claim(&mut self) -> Result<Option<ClaimedJob>, WorkerError> {
        let worker_id = self.require_id()?;
        let job = self.client.claim(self.kind, worker_id).await?;
        Ok(job.map(|data| ClaimedJob {
            id: data.id,
            kind: data.kind,
            input_file: PathBuf::from(data.input_file),
            output_file: PathBuf::from(data.output_file),
            content_hash: data.content_hash,
            payload: data.payload,
            correlation_id: data.correlation_id,
        }))
    }

    async fn complete(
        &mut self,
        job_id: i64,
        result: serde_json::Value,
    ) -> Result<(), WorkerError> {
        let worker_id = self.require_id()?;
        self.client
            .update_status(job_id, worker_id, "completed", None, Some(result))
            .await?;
        Ok(())
    }

    async fn fail(&mut self, job_id: i64, error: serde_json::Value) -> Result<(), WorkerError> {
        let worker_id = self.require_id()?;
        self.client
            .update_status(job_id, worker_id, "failed", Some(error), None)
            .await?;
        Ok(())
    }

    async fn heartbeat(&mut self) -> Result<(), WorkerError> {
        let worker_id = self.require_id()?;
        self.client.heartbeat(worker_id).await?;
        Ok(())
    }

    async fn is_cancelled(&mut self, job_id: i64) -> Result<bool, WorkerError> {
        Ok(self.client.is_cancelled(job_id).await?)
    }

    async fn set_busy(&mut self, _busy: bool) -> Result<(), WorkerError> {
        // The bridge exposes no status endpoint; heartbeats carry liveness.
        Ok(())
    }

    async fn record_outcome(&mut self, _success: bool, _secs: f64) -> Result<(), WorkerError> {
        // Per-worker statistics stay host-side for container workers.
        Ok(())
    }

    async fn add_to_cache(
        &mut self,
        output_file: &Path,
        content_hash: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), WorkerError> {
        self.client
            .cache_add(&output_file.to_string_lossy(), content_hash, metadata)
            .await?;
        Ok(())
    }

    async fn unregister(&mut self, reason: &str) -> Result<(), WorkerError> {
        let worker_id = self.require_id()?;
        self.client.unregister(worker_id, Some(reason)).await?;
        Ok(())
    }
}
