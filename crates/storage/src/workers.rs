// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker registry and lifecycle event log.
//!
//! Workers are rows keyed by a unique `container_id` (a container identifier
//! or `direct-<uuid>`). The lifecycle manager may pre-register a row in
//! `created` so a child process activates a known identity instead of racing
//! to self-register. Every transition leaves a row in `worker_events`.

use crate::error::StorageError;
use crate::queue::parse_ts;
use crate::store::Store;
use cb_core::JobKind;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Status of a registered worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Pre-registered by the lifecycle manager; not yet alive.
    Created,
    Idle,
    Busy,
    /// Heartbeat stale; a candidate for reaping.
    Hung,
    Dead,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Created => "created",
            WorkerStatus::Idle => "idle",
            WorkerStatus::Busy => "busy",
            WorkerStatus::Hung => "hung",
            WorkerStatus::Dead => "dead",
        }
    }

    /// A worker counts toward pool demand only while idle or busy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, WorkerStatus::Idle | WorkerStatus::Busy)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(WorkerStatus::Created),
            "idle" => Ok(WorkerStatus::Idle),
            "busy" => Ok(WorkerStatus::Busy),
            "hung" => Ok(WorkerStatus::Hung),
            "dead" => Ok(WorkerStatus::Dead),
            other => Err(format!("unknown worker status: {other}")),
        }
    }
}

/// How the worker process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Docker,
    Direct,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Docker => "docker",
            ExecutionMode::Direct => "direct",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" => Ok(ExecutionMode::Docker),
            "direct" => Ok(ExecutionMode::Direct),
            other => Err(format!("unknown execution mode: {other}")),
        }
    }
}

/// Lifecycle event types recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEventType {
    WorkerStarting,
    WorkerRegistered,
    WorkerReady,
    WorkerStopping,
    WorkerStopped,
    WorkerFailed,
    PoolStarting,
    PoolStarted,
    PoolStopping,
    PoolStopped,
}

impl WorkerEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerEventType::WorkerStarting => "worker_starting",
            WorkerEventType::WorkerRegistered => "worker_registered",
            WorkerEventType::WorkerReady => "worker_ready",
            WorkerEventType::WorkerStopping => "worker_stopping",
            WorkerEventType::WorkerStopped => "worker_stopped",
            WorkerEventType::WorkerFailed => "worker_failed",
            WorkerEventType::PoolStarting => "pool_starting",
            WorkerEventType::PoolStarted => "pool_started",
            WorkerEventType::PoolStopping => "pool_stopping",
            WorkerEventType::PoolStopped => "pool_stopped",
        }
    }
}

impl fmt::Display for WorkerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the worker_events audit table.
#[derive(Debug, Clone)]
pub struct WorkerEventRow {
    pub id: i64,
    pub event_type: String,
    pub worker_id: Option<i64>,
    pub kind: String,
    pub execution_mode: Option<String>,
    pub message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A worker row as seen during pool reconciliation.
#[derive(Debug, Clone)]
pub struct DiscoveredWorker {
    pub id: i64,
    pub kind: JobKind,
    pub container_id: String,
    pub status: WorkerStatus,
    pub execution_mode: Option<ExecutionMode>,
    pub parent_pid: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub heartbeat_age_secs: i64,
    pub jobs_processed: i64,
    pub jobs_failed: i64,
    pub avg_processing_time: Option<f64>,
    pub session_id: Option<String>,
    pub managed_by: Option<String>,
}

impl DiscoveredWorker {
    pub fn is_direct(&self) -> bool {
        self.container_id.starts_with("direct-")
    }
}

/// Registry handle; owns its own connection.
pub struct WorkerRegistry {
    conn: Connection,
}

impl WorkerRegistry {
    pub fn open(store: &Store) -> Result<Self, StorageError> {
        Ok(Self {
            conn: store.connect()?,
        })
    }

    /// Self-registration: create a worker row directly in `idle`.
    pub fn register(
        &self,
        kind: JobKind,
        container_id: &str,
        mode: ExecutionMode,
        parent_pid: Option<i64>,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO workers (worker_type, container_id, status, execution_mode, parent_pid)
             VALUES (?1, ?2, 'idle', ?3, ?4)",
            params![kind.as_str(), container_id, mode.as_str(), parent_pid],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(worker_id = id, kind = %kind, container_id, "registered worker");
        Ok(id)
    }

    /// Pre-registration by the lifecycle manager: row starts in `created`
    /// and the id is handed to the child process for activation.
    pub fn pre_register(
        &self,
        kind: JobKind,
        container_id: &str,
        mode: ExecutionMode,
        session_id: &str,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO workers (worker_type, container_id, status, execution_mode,
                                  session_id, managed_by)
             VALUES (?1, ?2, 'created', ?3, ?4, ?4)",
            params![kind.as_str(), container_id, mode.as_str(), session_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Flip a pre-registered `created` row to `idle`. Rejects any other
    /// starting status so a stale id cannot resurrect a dead worker.
    pub fn activate(&self, worker_id: i64, parent_pid: Option<i64>) -> Result<(), StorageError> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM workers WHERE id = ?1",
                [worker_id],
                |r| r.get(0),
            )
            .optional()?;
        let status = status.ok_or(StorageError::WorkerNotFound { worker_id })?;
        if status != "created" {
            return Err(StorageError::InvalidActivation { worker_id, status });
        }
        self.conn.execute(
            "UPDATE workers
             SET status = 'idle', parent_pid = COALESCE(?2, parent_pid),
                 last_heartbeat = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![worker_id, parent_pid],
        )?;
        info!(worker_id, "activated pre-registered worker");
        Ok(())
    }

    /// Replace a placeholder identity once the executor reports the real
    /// container id / direct uuid.
    pub fn set_container_id(&self, worker_id: i64, container_id: &str) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE workers SET container_id = ?1 WHERE id = ?2",
            params![container_id, worker_id],
        )?;
        if updated == 0 {
            return Err(StorageError::WorkerNotFound { worker_id });
        }
        Ok(())
    }

    pub fn heartbeat(&self, worker_id: i64) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE workers SET last_heartbeat = CURRENT_TIMESTAMP WHERE id = ?1",
            [worker_id],
        )?;
        if updated == 0 {
            return Err(StorageError::WorkerNotFound { worker_id });
        }
        Ok(())
    }

    pub fn set_status(&self, worker_id: i64, status: WorkerStatus) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE workers SET status = ?1 WHERE id = ?2",
            params![status.as_str(), worker_id],
        )?;
        if updated == 0 {
            return Err(StorageError::WorkerNotFound { worker_id });
        }
        debug!(worker_id, status = %status, "worker status updated");
        Ok(())
    }

    /// Update per-worker statistics after one job.
    pub fn record_job_outcome(
        &self,
        worker_id: i64,
        success: bool,
        processing_secs: f64,
    ) -> Result<(), StorageError> {
        if success {
            self.conn.execute(
                "UPDATE workers
                 SET jobs_processed = jobs_processed + 1,
                     avg_processing_time = CASE
                         WHEN avg_processing_time IS NULL THEN ?1
                         ELSE (avg_processing_time * jobs_processed + ?1) / (jobs_processed + 1)
                     END
                 WHERE id = ?2",
                params![processing_secs, worker_id],
            )?;
        } else {
            self.conn.execute(
                "UPDATE workers SET jobs_failed = jobs_failed + 1 WHERE id = ?1",
                [worker_id],
            )?;
        }
        Ok(())
    }

    /// Graceful unregister: mark the worker dead.
    pub fn unregister(&self, worker_id: i64, reason: Option<&str>) -> Result<(), StorageError> {
        self.set_status(worker_id, WorkerStatus::Dead)?;
        self.record_event(
            WorkerEventType::WorkerStopped,
            Some(worker_id),
            self.kind_of(worker_id)?.unwrap_or(JobKind::Notebook),
            None,
            reason.unwrap_or("worker unregistered"),
            None,
            None,
        )?;
        Ok(())
    }

    /// Mark workers whose heartbeat is older than `timeout_secs`.
    ///
    /// `hung` workers go to `dead`; healthy workers go to `hung` first, so a
    /// worker gets one grace period before it is written off.
    pub fn reap_stale(&self, timeout_secs: i64) -> Result<usize, StorageError> {
        let cutoff = format!("-{timeout_secs} seconds");
        let died = self.conn.execute(
            "UPDATE workers SET status = 'dead'
             WHERE status = 'hung' AND last_heartbeat < datetime('now', ?1)",
            [&cutoff],
        )?;
        let hung = self.conn.execute(
            "UPDATE workers SET status = 'hung'
             WHERE status IN ('idle', 'busy') AND last_heartbeat < datetime('now', ?1)",
            [&cutoff],
        )?;
        Ok(died + hung)
    }

    pub fn get(&self, worker_id: i64) -> Result<Option<DiscoveredWorker>, StorageError> {
        let mut workers = self.query_workers(Some("id = ?1"), params![worker_id])?;
        Ok(workers.pop())
    }

    /// All workers of a kind (or all kinds), for pool reconciliation.
    pub fn discover(&self, kind: Option<JobKind>) -> Result<Vec<DiscoveredWorker>, StorageError> {
        match kind {
            Some(kind) => {
                self.query_workers(Some("worker_type = ?1"), params![kind.as_str()])
            }
            None => self.query_workers(None, params![]),
        }
    }

    fn query_workers(
        &self,
        where_clause: Option<&str>,
        params: impl rusqlite::Params,
    ) -> Result<Vec<DiscoveredWorker>, StorageError> {
        let mut sql = String::from(
            "SELECT id, worker_type, container_id, status, execution_mode, parent_pid,
                    started_at, last_heartbeat,
                    CAST(strftime('%s','now') AS INTEGER) - CAST(strftime('%s', last_heartbeat) AS INTEGER),
                    jobs_processed, jobs_failed, avg_processing_time, session_id, managed_by
             FROM workers",
        );
        if let Some(clause) = where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        sql.push_str(" ORDER BY worker_type, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| {
            let kind: String = row.get(1)?;
            let status: String = row.get(3)?;
            let mode: Option<String> = row.get(4)?;
            Ok(DiscoveredWorker {
                id: row.get(0)?,
                kind: JobKind::from_str(&kind).unwrap_or(JobKind::Notebook),
                container_id: row.get(2)?,
                status: WorkerStatus::from_str(&status).unwrap_or(WorkerStatus::Dead),
                execution_mode: mode.and_then(|m| ExecutionMode::from_str(&m).ok()),
                parent_pid: row.get(5)?,
                started_at: parse_ts(row.get::<_, String>(6)?),
                last_heartbeat: parse_ts(row.get::<_, String>(7)?),
                heartbeat_age_secs: row.get(8)?,
                jobs_processed: row.get(9)?,
                jobs_failed: row.get(10)?,
                avg_processing_time: row.get(11)?,
                session_id: row.get(12)?,
                managed_by: row.get(13)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn kind_of(&self, worker_id: i64) -> Result<Option<JobKind>, StorageError> {
        let kind: Option<String> = self
            .conn
            .query_row(
                "SELECT worker_type FROM workers WHERE id = ?1",
                [worker_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(kind.and_then(|k| JobKind::from_str(&k).ok()))
    }

    /// Append one row to the audit trail.
    #[allow(clippy::too_many_arguments)]
    pub fn record_event(
        &self,
        event_type: WorkerEventType,
        worker_id: Option<i64>,
        kind: JobKind,
        mode: Option<ExecutionMode>,
        message: &str,
        metadata: Option<&serde_json::Value>,
        session_id: Option<&str>,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO worker_events
                 (event_type, worker_id, worker_type, execution_mode, message, metadata, session_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event_type.as_str(),
                worker_id,
                kind.as_str(),
                mode.map(|m| m.as_str()),
                message,
                metadata.map(|m| m.to_string()),
                session_id,
            ],
        )?;
        Ok(())
    }

    /// Recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<WorkerEventRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_type, worker_id, worker_type, execution_mode,
                    message, metadata, session_id, created_at
             FROM worker_events ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            let metadata: Option<String> = row.get(6)?;
            Ok(WorkerEventRow {
                id: row.get(0)?,
                event_type: row.get(1)?,
                worker_id: row.get(2)?,
                kind: row.get(3)?,
                execution_mode: row.get(4)?,
                message: row.get(5)?,
                metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
                session_id: row.get(7)?,
                created_at: parse_ts(row.get::<_, String>(8)?),
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
#[path = "workers_tests.rs"]
mod tests;
