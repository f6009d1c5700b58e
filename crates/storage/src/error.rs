// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the storage layer.

use cb_core::JobStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("job {job_id} not found")]
    JobNotFound { job_id: i64 },

    #[error("invalid status transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: i64,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("worker {worker_id} not found")]
    WorkerNotFound { worker_id: i64 },

    #[error("worker {worker_id} cannot activate from status {status}")]
    InvalidActivation { worker_id: i64, status: String },

    #[error("corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },
}

impl StorageError {
    pub(crate) fn corrupt(table: &'static str, message: impl Into<String>) -> Self {
        StorageError::CorruptRow {
            table,
            message: message.into(),
        }
    }
}
