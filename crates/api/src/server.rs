// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker API server.
//!
//! Runs as a background task inside the host process. `start` binds the
//! listener before returning, so callers know the advertised address is
//! reachable; shutdown is a watch-channel signal observed by the serve loop.

use crate::routes;
use cb_storage::Store;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server task failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state handed to every handler.
pub struct ApiState {
    pub store: Store,
}

/// The worker API service, ready to start.
pub struct ApiServer {
    store: Store,
}

/// Handle to a running server: its bound address and the shutdown signal.
pub struct ApiServerHandle {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ApiServerHandle {
    /// The address the listener actually bound (relevant with port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Signal shutdown and wait for the serve loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
        info!("worker api stopped");
    }
}

impl ApiServer {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn router(state: Arc<ApiState>) -> axum::Router {
        use axum::routing::{get, post};

        axum::Router::new()
            .route("/api/worker/register", post(routes::register))
            .route("/api/worker/activate", post(routes::activate))
            .route("/api/worker/jobs/claim", post(routes::claim))
            .route("/api/worker/jobs/:id/status", post(routes::update_status))
            .route("/api/worker/heartbeat", post(routes::heartbeat))
            .route("/api/worker/jobs/:id/cancelled", get(routes::job_cancelled))
            .route("/api/worker/unregister", post(routes::unregister))
            .route("/api/worker/cache/add", post(routes::cache_add))
            .route("/health", get(routes::health))
            .with_state(state)
    }

    /// Bind `addr` and serve in a background task. Returns once the listener
    /// is bound.
    pub async fn start(self, addr: SocketAddr) -> Result<ApiServerHandle, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::BindFailed { addr, source })?;
        let bound = listener.local_addr()?;

        let state = Arc::new(ApiState { store: self.store });
        let app = Self::router(state);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let shutdown = async move {
                // Ignore a dropped sender; that also means shut down.
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(error = %e, "worker api serve loop failed");
            }
        });

        info!(addr = %bound, "worker api listening");
        Ok(ApiServerHandle {
            addr: bound,
            shutdown_tx,
            task,
        })
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
