// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::backend::SqliteBackend;
use crate::process::ProcessContext;
use cb_core::{JobKind, JobSpec, JobStatus, Language, NotebookPayload, OutputFormat, OutputKind};
use cb_storage::{JobQueue, Store, WorkerRegistry, WorkerStatus};
use std::time::Duration;
use tempfile::TempDir;

fn notebook_spec(dir: &TempDir, input: &str) -> JobSpec {
    let payload = NotebookPayload {
        data: "# %%\nprint('x')\n".to_string(),
        language: Language::En,
        format: OutputFormat::Html,
        // Code-along needs no execution, so a stub processor suffices.
        kind: OutputKind::CodeAlong,
        prog_lang: "python".to_string(),
        fallback_execute: false,
        suppress_output: false,
        correlation_id: None,
        input_file: input.to_string(),
        input_file_name: input.to_string(),
        output_file: "out.html".to_string(),
    };
    JobSpec::new(
        JobKind::Notebook,
        input.into(),
        dir.path().join("out/out.html"),
        "h1".to_string(),
        serde_json::to_value(&payload).unwrap(),
    )
}

fn plantuml_spec(dir: &TempDir, input: &str) -> JobSpec {
    let payload = cb_core::DiagramPayload {
        data: "@startuml\n@enduml".to_string(),
        output_format: "png".to_string(),
        correlation_id: None,
        input_file: input.to_string(),
        input_file_name: input.to_string(),
        output_file: "d.png".to_string(),
    };
    JobSpec::new(
        JobKind::Plantuml,
        input.into(),
        dir.path().join("out/d.png"),
        "h2".to_string(),
        serde_json::to_value(&payload).unwrap(),
    )
}

struct Harness {
    dir: TempDir,
    store: Store,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("jobs.db")).unwrap();
        Self { dir, store }
    }

    fn queue(&self) -> JobQueue {
        JobQueue::open(&self.store).unwrap()
    }

    /// Run a worker that stops itself once the queue drains.
    async fn run_worker(&self, kind: JobKind, processor: &str) {
        let backend =
            SqliteBackend::open(&self.store, kind, "direct-test-runner", None).unwrap();
        let mut ctx = ProcessContext::new(self.dir.path().to_path_buf(), None);
        ctx.notebook_processor = processor.to_string();
        let shutdown = Arc::new(AtomicBool::new(false));

        let stopper = {
            let shutdown = Arc::clone(&shutdown);
            let store = self.store.clone();
            tokio::spawn(async move {
                let queue = JobQueue::open(&store).unwrap();
                loop {
                    let pending = queue
                        .list(&cb_storage::JobFilter {
                            status: Some(JobStatus::Pending),
                            ..Default::default()
                        })
                        .unwrap();
                    let processing = queue
                        .list(&cb_storage::JobFilter {
                            status: Some(JobStatus::Processing),
                            ..Default::default()
                        })
                        .unwrap();
                    if pending.is_empty() && processing.is_empty() {
                        shutdown.store(true, Ordering::SeqCst);
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
        };

        let config = RunnerConfig {
            pre_assigned_id: None,
            poll_interval: Duration::from_millis(20),
            heartbeat_interval: Duration::from_secs(10),
        };
        Runner::new(backend, ctx, config, shutdown)
            .run()
            .await
            .unwrap();
        stopper.await.unwrap();
    }
}

#[tokio::test]
async fn worker_completes_a_job_and_records_stats() {
    let harness = Harness::new();
    let queue = harness.queue();
    // `true` stands in for the notebook processor and always succeeds.
    let id = queue.enqueue(&notebook_spec(&harness.dir, "a.py")).unwrap();

    harness.run_worker(JobKind::Notebook, "true").await;

    let job = queue.get(id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.result.is_some());
    assert!(job.completed_at.is_some());

    let registry = WorkerRegistry::open(&harness.store).unwrap();
    let workers = registry.discover(Some(JobKind::Notebook)).unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].jobs_processed, 1);
    assert_eq!(workers[0].status, WorkerStatus::Dead); // unregistered on shutdown

    // Success also lands in the finished-artifact cache.
    let cache = cb_storage::ResultCache::open(&harness.store).unwrap();
    assert!(cache
        .lookup(&harness.dir.path().join("out/out.html"), "h1")
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn worker_reports_failures_with_structured_error() {
    let harness = Harness::new();
    let queue = harness.queue();
    std::env::remove_var("PLANTUML_JAR");
    let id = queue.enqueue(&plantuml_spec(&harness.dir, "d.pu")).unwrap();

    harness.run_worker(JobKind::Plantuml, "true").await;

    let job = queue.get(id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error: serde_json::Value = serde_json::from_str(job.error.as_deref().unwrap()).unwrap();
    assert_eq!(error["error_class"], "ConfigurationError");

    let registry = WorkerRegistry::open(&harness.store).unwrap();
    let workers = registry.discover(Some(JobKind::Plantuml)).unwrap();
    assert_eq!(workers[0].jobs_failed, 1);
}

#[tokio::test]
async fn cancelled_jobs_are_skipped_without_status_writes() {
    let harness = Harness::new();
    let mut queue = harness.queue();
    let id = queue.enqueue(&notebook_spec(&harness.dir, "a.py")).unwrap();
    queue
        .cancel_for_input(std::path::Path::new("a.py"), Some("cid"))
        .unwrap();

    harness.run_worker(JobKind::Notebook, "true").await;

    let job = queue.get(id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.result.is_none());
}

#[tokio::test]
async fn worker_uses_pre_assigned_identity() {
    let harness = Harness::new();
    let registry = WorkerRegistry::open(&harness.store).unwrap();
    let pre = registry
        .pre_register(
            JobKind::Notebook,
            "direct-pre-assigned",
            cb_storage::ExecutionMode::Direct,
            "sess-1",
        )
        .unwrap();

    let backend =
        SqliteBackend::open(&harness.store, JobKind::Notebook, "direct-pre-assigned", None)
            .unwrap();
    let ctx = ProcessContext::new(harness.dir.path().to_path_buf(), None);
    let shutdown = Arc::new(AtomicBool::new(true)); // exit immediately
    let config = RunnerConfig {
        pre_assigned_id: Some(pre),
        ..Default::default()
    };
    Runner::new(backend, ctx, config, shutdown).run().await.unwrap();

    // Activated (created -> idle) and then unregistered (-> dead) on exit.
    let worker = registry.get(pre).unwrap().unwrap();
    assert_eq!(worker.status, WorkerStatus::Dead);
}
