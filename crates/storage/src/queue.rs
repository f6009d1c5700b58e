// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue operations on the jobs table.
//!
//! Every mutation runs in one short write transaction. `claim` uses an
//! immediate-mode transaction around a single UPDATE-with-subselect so that
//! concurrent workers never receive the same job.

use crate::error::StorageError;
use crate::store::Store;
use cb_core::{JobKind, JobSpec, JobStatus};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

const JOB_COLUMNS: &str = "id, job_type, status, priority, input_file, output_file, \
     content_hash, payload, correlation_id, created_at, started_at, completed_at, \
     cancelled_at, cancelled_by, worker_id, attempts, max_attempts, error, result";

/// One row of the jobs table.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub kind: JobKind,
    pub status: JobStatus,
    pub priority: i64,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub content_hash: String,
    pub payload: serde_json::Value,
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub worker_id: Option<i64>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub error: Option<String>,
    pub result: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let kind_str: String = row.get("job_type")?;
        let status_str: String = row.get("status")?;
        let payload_str: String = row.get("payload")?;
        let input: String = row.get("input_file")?;
        let output: String = row.get("output_file")?;
        Ok(Self {
            id: row.get("id")?,
            kind: JobKind::from_str(&kind_str).unwrap_or(JobKind::Notebook),
            status: JobStatus::from_str(&status_str).unwrap_or(JobStatus::Failed),
            priority: row.get("priority")?,
            input_file: PathBuf::from(input),
            output_file: PathBuf::from(output),
            content_hash: row.get("content_hash")?,
            payload: serde_json::from_str(&payload_str).unwrap_or(serde_json::Value::Null),
            correlation_id: row.get("correlation_id")?,
            created_at: parse_ts(row.get::<_, String>("created_at")?),
            started_at: row
                .get::<_, Option<String>>("started_at")?
                .map(parse_ts),
            completed_at: row
                .get::<_, Option<String>>("completed_at")?
                .map(parse_ts),
            cancelled_at: row
                .get::<_, Option<String>>("cancelled_at")?
                .map(parse_ts),
            cancelled_by: row.get("cancelled_by")?,
            worker_id: row.get("worker_id")?,
            attempts: row.get::<_, i64>("attempts")? as u32,
            max_attempts: row.get::<_, i64>("max_attempts")? as u32,
            error: row.get("error")?,
            result: row.get("result")?,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// SQLite `CURRENT_TIMESTAMP` is UTC in `YYYY-MM-DD HH:MM:SS` form.
pub(crate) fn parse_ts(s: String) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Filter for [`JobQueue::list`].
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub kind: Option<JobKind>,
    pub limit: Option<usize>,
    /// Only jobs created more than this many seconds ago.
    pub older_than_secs: Option<i64>,
}

/// Handle to the queue. Each instance owns its own connection; create one
/// per thread or task.
pub struct JobQueue {
    conn: Connection,
}

impl JobQueue {
    pub fn open(store: &Store) -> Result<Self, StorageError> {
        Ok(Self {
            conn: store.connect()?,
        })
    }

    /// Enqueue a new job in `pending`. Always creates a new row.
    pub fn enqueue(&self, spec: &JobSpec) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO jobs (job_type, status, priority, input_file, output_file,
                               content_hash, payload, correlation_id, max_attempts)
             VALUES (?1, 'pending', ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                spec.kind.as_str(),
                spec.priority,
                spec.input_path.to_string_lossy(),
                spec.output_path.to_string_lossy(),
                spec.content_hash,
                spec.payload.to_string(),
                spec.correlation_id,
                spec.max_attempts,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(job_id = id, kind = %spec.kind, input = %spec.input_path.display(), "enqueued job");
        Ok(id)
    }

    /// Atomically claim the highest-priority oldest pending job of `kind`.
    ///
    /// Returns `None` when no eligible job exists. Safe under concurrent
    /// callers: the immediate transaction takes the write lock up front, and
    /// the `status='pending'` guard on the outer UPDATE makes the claim a
    /// no-op if another worker won the race between subselect and update.
    pub fn claim(&mut self, kind: JobKind, worker_id: i64) -> Result<Option<JobRow>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let sql = format!(
            "UPDATE jobs
             SET status = 'processing',
                 worker_id = ?1,
                 attempts = attempts + 1,
                 started_at = CURRENT_TIMESTAMP
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = 'pending' AND job_type = ?2 AND attempts < max_attempts
                 ORDER BY priority DESC, created_at ASC, id ASC
                 LIMIT 1
             )
             AND status = 'pending'
             RETURNING {JOB_COLUMNS}"
        );
        let job = tx
            .query_row(&sql, params![worker_id, kind.as_str()], JobRow::from_row)
            .optional()?;

        tx.commit()?;

        if let Some(ref job) = job {
            debug!(job_id = job.id, worker_id, kind = %kind, "claimed job");
        }
        Ok(job)
    }

    /// Transition a job's status, stamping terminal timestamps.
    ///
    /// Re-asserting the current terminal state is a no-op; any other
    /// transition out of a terminal state is rejected.
    pub fn update_status(
        &mut self,
        job_id: i64,
        new_status: JobStatus,
        error_json: Option<&str>,
        result_json: Option<&str>,
    ) -> Result<(), StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row("SELECT status FROM jobs WHERE id = ?1", [job_id], |r| r.get(0))
            .optional()?;
        let current = current.ok_or(StorageError::JobNotFound { job_id })?;
        let current = JobStatus::from_str(&current)
            .map_err(|e| StorageError::corrupt("jobs", e))?;

        if current.is_terminal() && current == new_status {
            // Idempotent termination: the first write won.
            tx.commit()?;
            return Ok(());
        }
        if !current.can_transition_to(new_status) {
            return Err(StorageError::InvalidTransition {
                job_id,
                from: current,
                to: new_status,
            });
        }

        match new_status {
            JobStatus::Completed | JobStatus::Failed => {
                tx.execute(
                    "UPDATE jobs
                     SET status = ?1, completed_at = CURRENT_TIMESTAMP,
                         error = COALESCE(?2, error), result = COALESCE(?3, result)
                     WHERE id = ?4",
                    params![new_status.as_str(), error_json, result_json, job_id],
                )?;
            }
            JobStatus::Cancelled => {
                tx.execute(
                    "UPDATE jobs SET status = 'cancelled', cancelled_at = CURRENT_TIMESTAMP
                     WHERE id = ?1",
                    [job_id],
                )?;
            }
            JobStatus::Pending => {
                tx.execute(
                    "UPDATE jobs SET status = 'pending', worker_id = NULL, started_at = NULL
                     WHERE id = ?1",
                    [job_id],
                )?;
            }
            JobStatus::Processing => {
                tx.execute(
                    "UPDATE jobs SET status = 'processing' WHERE id = ?1",
                    [job_id],
                )?;
            }
        }

        tx.commit()?;
        debug!(job_id, status = %new_status, "job status updated");
        Ok(())
    }

    /// Cancel all still-pending jobs for an input path. Claimed jobs are left
    /// alone; cooperative cancellation handles those.
    pub fn cancel_for_input(
        &mut self,
        input_path: &std::path::Path,
        cancelled_by: Option<&str>,
    ) -> Result<Vec<i64>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let ids: Vec<i64> = {
            let mut stmt = tx.prepare(
                "UPDATE jobs
                 SET status = 'cancelled', cancelled_at = CURRENT_TIMESTAMP, cancelled_by = ?1
                 WHERE input_file = ?2 AND status = 'pending'
                 RETURNING id",
            )?;
            let rows = stmt.query_map(
                params![cancelled_by, input_path.to_string_lossy()],
                |row| row.get(0),
            )?;
            rows.collect::<Result<_, _>>()?
        };

        tx.commit()?;
        if !ids.is_empty() {
            debug!(input = %input_path.display(), count = ids.len(), "cancelled superseded jobs");
        }
        Ok(ids)
    }

    /// Reset hung `processing` jobs whose `started_at` is older than the
    /// timeout. Jobs with attempts remaining go back to `pending`; exhausted
    /// jobs are failed with a synthesized error. Returns the reset count.
    pub fn reset_hung(&mut self, timeout_secs: i64) -> Result<usize, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let cutoff = format!("-{timeout_secs} seconds");

        let reset = tx.execute(
            "UPDATE jobs
             SET status = 'pending', worker_id = NULL, started_at = NULL
             WHERE status = 'processing'
               AND started_at < datetime('now', ?1)
               AND attempts < max_attempts",
            [&cutoff],
        )?;

        let exhausted = tx.execute(
            "UPDATE jobs
             SET status = 'failed', completed_at = CURRENT_TIMESTAMP,
                 error = json_object('error_class', 'HungJob',
                                     'error_message', 'job exceeded processing timeout with no attempts remaining')
             WHERE status = 'processing'
               AND started_at < datetime('now', ?1)
               AND attempts >= max_attempts",
            [&cutoff],
        )?;

        tx.commit()?;
        if reset + exhausted > 0 {
            warn!(reset, exhausted, timeout_secs, "reset hung jobs");
        }
        Ok(reset)
    }

    /// Whether the job is in `cancelled`. Workers poll this at checkpoints.
    pub fn is_cancelled(&self, job_id: i64) -> Result<bool, StorageError> {
        let status: Option<String> = self
            .conn
            .query_row("SELECT status FROM jobs WHERE id = ?1", [job_id], |r| r.get(0))
            .optional()?;
        match status {
            Some(s) => Ok(s == "cancelled"),
            None => Err(StorageError::JobNotFound { job_id }),
        }
    }

    pub fn get(&self, job_id: i64) -> Result<Option<JobRow>, StorageError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [job_id], JobRow::from_row)
            .optional()?)
    }

    /// List jobs matching the filter, newest first.
    pub fn list(&self, filter: &JobFilter) -> Result<Vec<JobRow>, StorageError> {
        let mut sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            params_vec.push(Box::new(status.as_str().to_string()));
        }
        if let Some(kind) = filter.kind {
            sql.push_str(" AND job_type = ?");
            params_vec.push(Box::new(kind.as_str().to_string()));
        }
        if let Some(secs) = filter.older_than_secs {
            sql.push_str(" AND created_at < datetime('now', ?)");
            params_vec.push(Box::new(format!("-{secs} seconds")));
        }
        sql.push_str(" ORDER BY id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params_vec.push(Box::new(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
            JobRow::from_row,
        )?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Count of jobs per status among the given ids. Used by the driver's
    /// wait loop.
    pub fn status_counts(
        &self,
        job_ids: &[i64],
    ) -> Result<Vec<(i64, JobStatus)>, StorageError> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; job_ids.len()].join(",");
        let sql = format!("SELECT id, status FROM jobs WHERE id IN ({placeholders})");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(job_ids.iter()), |row| {
            let id: i64 = row.get(0)?;
            let status: String = row.get(1)?;
            Ok((id, status))
        })?;
        let mut out = Vec::with_capacity(job_ids.len());
        for row in rows {
            let (id, status) = row?;
            let status = JobStatus::from_str(&status)
                .map_err(|e| StorageError::corrupt("jobs", e))?;
            out.push((id, status));
        }
        Ok(out)
    }

}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
