// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cbworker - coursebuild worker process

use cb_adapters::env as worker_env;
use cb_api::WorkerApiClient;
use cb_core::JobKind;
use cb_storage::{ExecutedNotebookCache, Store};
use cb_worker::process::ProcessContext;
use cb_worker::{
    spawn_parent_watchdog, QueueBackend, RestBackend, Runner, RunnerConfig, SqliteBackend,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cbworker", version, about = "coursebuild worker process")]
struct Cli {
    /// Job kind this worker processes
    #[arg(long)]
    kind: JobKindArg,

    /// Worker identity (container id or direct-<uuid>); generated if absent
    #[arg(long)]
    container_id: Option<String>,

    /// Path to the jobs database (direct mode; falls back to $DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Base URL of the worker API bridge (container mode; falls back to
    /// $CB_API_BASE_URL)
    #[arg(long)]
    api_base_url: Option<String>,

    /// Seconds between queue polls when idle
    #[arg(long, default_value_t = 0.5)]
    poll_interval: f64,

    /// Directory for the worker log file (logs to stderr when absent)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Clone, Copy)]
struct JobKindArg(JobKind);

impl std::str::FromStr for JobKindArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(JobKindArg)
    }
}

fn init_tracing(log_dir: Option<&PathBuf>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cbworker.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "worker exited with error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let kind = cli.kind.0;
    let container_id = cli
        .container_id
        .unwrap_or_else(|| format!("direct-{}", Uuid::new_v4()));
    let pre_assigned = worker_env::worker_id();
    let parent_pid = worker_env::parent_pid();
    let workspace = worker_env::workspace_path().unwrap_or_else(|| PathBuf::from("."));

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_signal_handler(Arc::clone(&shutdown));
    if let Some(pid) = parent_pid {
        spawn_parent_watchdog(pid, Arc::clone(&shutdown));
    }

    let config = RunnerConfig {
        pre_assigned_id: pre_assigned,
        poll_interval: Duration::from_secs_f64(cli.poll_interval.max(0.05)),
        ..Default::default()
    };

    let api_base_url = cli
        .api_base_url
        .or_else(|| std::env::var("CB_API_BASE_URL").ok());
    let db_path = cli.db_path.or_else(worker_env::db_path);

    match (api_base_url, db_path) {
        (Some(base_url), _) => {
            // Container mode: all queue traffic goes through the bridge, and
            // the executed-notebook cache is unreachable by design.
            let client = WorkerApiClient::new(base_url);
            let backend = RestBackend::new(client, kind, &container_id, parent_pid.map(i64::from));
            let ctx = ProcessContext::new(workspace, None);
            run_backend(backend, ctx, config, shutdown).await
        }
        (None, Some(db_path)) => {
            let store = Store::open(&db_path)?;
            let exec_cache = match kind {
                JobKind::Notebook => {
                    let cache_path = db_path.with_file_name("cache.db");
                    Some(ExecutedNotebookCache::open(cache_path)?)
                }
                _ => None,
            };
            let backend = SqliteBackend::open(
                &store,
                kind,
                &container_id,
                parent_pid.map(i64::from),
            )?;
            let ctx = ProcessContext::new(workspace, exec_cache);
            run_backend(backend, ctx, config, shutdown).await
        }
        (None, None) => Err("either --db-path or --api-base-url is required".into()),
    }
}

async fn run_backend<B: QueueBackend>(
    backend: B,
    ctx: ProcessContext,
    config: RunnerConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    Runner::new(backend, ctx, config, shutdown).run().await?;
    Ok(())
}

fn spawn_signal_handler(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot install SIGTERM handler");
                    let _ = ctrl_c.await;
                    shutdown.store(true, Ordering::SeqCst);
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        tracing::info!("shutdown signal received");
        shutdown.store(true, Ordering::SeqCst);
    });
}
