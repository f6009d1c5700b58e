// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the worker runtime.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("storage error: {0}")]
    Storage(#[from] cb_storage::StorageError),

    #[error("api error: {0}")]
    Api(#[from] cb_api::ClientError),

    #[error("invalid payload for job {job_id}: {message}")]
    InvalidPayload { job_id: i64, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker has no id yet; call init first")]
    NotInitialized,
}
