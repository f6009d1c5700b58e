// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint handlers.
//!
//! Each handler opens its own short-lived queue/registry handle; the store
//! enforces the connection policy. Handlers are as idempotent as the
//! underlying operations allow (a duplicate terminal status update is a
//! no-op, a duplicate cache add refreshes the entry).

use crate::server::ApiState;
use crate::types::*;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cb_core::JobStatus;
use cb_storage::{ExecutionMode, JobQueue, ResultCache, StorageError, WorkerRegistry};
use std::sync::Arc;
use tracing::{debug, error};

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::JobNotFound { .. } | StorageError::WorkerNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            StorageError::InvalidTransition { .. } | StorageError::InvalidActivation { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            other => {
                error!(error = %other, "storage error in worker api");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d),
            ApiError::NotFound(d) => (StatusCode::NOT_FOUND, d),
            ApiError::Internal(d) => (StatusCode::INTERNAL_SERVER_ERROR, d),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

pub(crate) async fn register(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let registry = WorkerRegistry::open(&state.store)?;
    let worker_id = registry.register(
        body.kind,
        &body.container_id,
        ExecutionMode::Docker,
        body.parent_pid,
    )?;
    debug!(worker_id, kind = %body.kind, "api: registered worker");
    Ok(Json(RegisterResponse {
        worker_id,
        registered_at: now_iso(),
    }))
}

pub(crate) async fn activate(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>, ApiError> {
    let registry = WorkerRegistry::open(&state.store)?;
    registry.activate(body.worker_id, body.parent_pid)?;
    Ok(Json(ActivateResponse { activated: true }))
}

pub(crate) async fn claim(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let mut queue = JobQueue::open(&state.store)?;
    let job = queue.claim(body.kind, body.worker_id)?;
    let job = job.map(|row| JobData {
        id: row.id,
        kind: row.kind,
        input_file: row.input_file.to_string_lossy().into_owned(),
        output_file: row.output_file.to_string_lossy().into_owned(),
        content_hash: row.content_hash,
        payload: row.payload,
        correlation_id: row.correlation_id,
    });
    if let Some(ref job) = job {
        debug!(job_id = job.id, worker_id = body.worker_id, "api: claimed job");
    }
    Ok(Json(ClaimResponse { job }))
}

pub(crate) async fn update_status(
    State(state): State<Arc<ApiState>>,
    Path(job_id): Path<i64>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    let status = match body.status.as_str() {
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        other => {
            return Err(ApiError::BadRequest(format!(
                "invalid status: {other}. Must be 'completed' or 'failed'"
            )))
        }
    };

    let error_json = body.error.map(|e| e.to_string());
    let result_json = body.result.map(|r| r.to_string());

    let mut queue = JobQueue::open(&state.store)?;
    queue.update_status(job_id, status, error_json.as_deref(), result_json.as_deref())?;
    debug!(job_id, worker_id = body.worker_id, status = %status, "api: status updated");
    Ok(Json(StatusUpdateResponse { acknowledged: true }))
}

pub(crate) async fn heartbeat(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<HeartbeatRequest>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let registry = WorkerRegistry::open(&state.store)?;
    registry.heartbeat(body.worker_id)?;
    Ok(Json(HeartbeatResponse {
        acknowledged: true,
        timestamp: now_iso(),
    }))
}

pub(crate) async fn job_cancelled(
    State(state): State<Arc<ApiState>>,
    Path(job_id): Path<i64>,
) -> Result<Json<CancelledResponse>, ApiError> {
    let queue = JobQueue::open(&state.store)?;
    let cancelled = queue.is_cancelled(job_id)?;
    Ok(Json(CancelledResponse { job_id, cancelled }))
}

pub(crate) async fn unregister(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<UnregisterRequest>,
) -> Result<Json<UnregisterResponse>, ApiError> {
    let registry = WorkerRegistry::open(&state.store)?;
    registry.unregister(body.worker_id, body.reason.as_deref())?;
    Ok(Json(UnregisterResponse { acknowledged: true }))
}

pub(crate) async fn cache_add(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CacheAddRequest>,
) -> Result<Json<CacheAddResponse>, ApiError> {
    let cache = ResultCache::open(&state.store)?;
    cache.insert(
        std::path::Path::new(&body.output_file),
        &body.content_hash,
        body.metadata.as_ref(),
    )?;
    Ok(Json(CacheAddResponse { added: true }))
}
