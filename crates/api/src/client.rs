// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client used by container workers to drive the queue.

use crate::types::*;
use cb_core::JobKind;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error ({status}): {detail}")]
    Api { status: StatusCode, detail: String },
}

/// Client for the worker API bridge.
#[derive(Clone)]
pub struct WorkerApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl WorkerApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let detail = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.detail)
            .unwrap_or_else(|_| format!("http status {status}"));
        Err(ClientError::Api { status, detail })
    }

    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(response.status().is_success())
    }

    pub async fn register(
        &self,
        kind: JobKind,
        container_id: &str,
        parent_pid: Option<i64>,
    ) -> Result<RegisterResponse, ClientError> {
        let body = RegisterRequest {
            kind,
            container_id: container_id.to_string(),
            parent_pid,
        };
        let response = self
            .http
            .post(self.url("/api/worker/register"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    pub async fn activate(
        &self,
        worker_id: i64,
        parent_pid: Option<i64>,
    ) -> Result<ActivateResponse, ClientError> {
        let body = ActivateRequest {
            worker_id,
            parent_pid,
        };
        let response = self
            .http
            .post(self.url("/api/worker/activate"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    pub async fn claim(
        &self,
        kind: JobKind,
        worker_id: i64,
    ) -> Result<Option<JobData>, ClientError> {
        let body = ClaimRequest { kind, worker_id };
        let response = self
            .http
            .post(self.url("/api/worker/jobs/claim"))
            .json(&body)
            .send()
            .await?;
        let claim: ClaimResponse = Self::check(response).await?;
        Ok(claim.job)
    }

    pub async fn update_status(
        &self,
        job_id: i64,
        worker_id: i64,
        status: &str,
        error: Option<serde_json::Value>,
        result: Option<serde_json::Value>,
    ) -> Result<StatusUpdateResponse, ClientError> {
        let body = StatusUpdateRequest {
            worker_id,
            status: status.to_string(),
            error,
            result,
        };
        let response = self
            .http
            .post(self.url(&format!("/api/worker/jobs/{job_id}/status")))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    pub async fn heartbeat(&self, worker_id: i64) -> Result<HeartbeatResponse, ClientError> {
        let body = HeartbeatRequest { worker_id };
        let response = self
            .http
            .post(self.url("/api/worker/heartbeat"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    pub async fn is_cancelled(&self, job_id: i64) -> Result<bool, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/worker/jobs/{job_id}/cancelled")))
            .send()
            .await?;
        let body: CancelledResponse = Self::check(response).await?;
        Ok(body.cancelled)
    }

    pub async fn unregister(
        &self,
        worker_id: i64,
        reason: Option<&str>,
    ) -> Result<UnregisterResponse, ClientError> {
        let body = UnregisterRequest {
            worker_id,
            reason: reason.map(str::to_string),
        };
        let response = self
            .http
            .post(self.url("/api/worker/unregister"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }

    pub async fn cache_add(
        &self,
        output_file: &str,
        content_hash: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<CacheAddResponse, ClientError> {
        let body = CacheAddRequest {
            output_file: output_file.to_string(),
            content_hash: content_hash.to_string(),
            metadata,
        };
        let response = self
            .http
            .post(self.url("/api/worker/cache/add"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await
    }
}
