// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the end-to-end specs.

use cb_core::{
    execution_requirement, CourseModel, ExecutionRequirement, FileKind, NotebookPayload,
    OutputFormat, OutputKind, OutputTarget,
};
use cb_engine::{BuildConfig, BuildContext};
use cb_storage::{ExecutionMode, JobQueue, Store, WorkerRegistry};
use cb_core::{JobKind, JobStatus};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// A scratch course: data dir, model, store, and context in one place.
pub struct Course {
    pub dir: TempDir,
    pub model: CourseModel,
    pub ctx: BuildContext,
}

impl Course {
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let mut model = CourseModel::new("Spec Course", "python");
        model
            .output_targets
            .push(OutputTarget::defaulted(dir.path().join("out")));
        let config = BuildConfig::new(dir.path().to_path_buf(), dir.path().join("out"));
        let store = Store::open(&config.jobs_db_path).unwrap();
        let ctx = BuildContext::new(config, store);
        Self { dir, model, ctx }
    }

    /// A course with one notebook file and the given explicit target.
    pub fn single_notebook(kinds: &[OutputKind], formats: &[OutputFormat]) -> Self {
        let mut course = Self::empty();
        course.model.output_targets.clear();
        course.model.output_targets.push(OutputTarget {
            name: "public".to_string(),
            output_root: course.dir.path().join("out"),
            kinds: kinds.to_vec(),
            formats: formats.to_vec(),
            languages: vec![cb_core::Language::En],
            is_explicit: true,
        });
        course.add_notebook("slides/topic/slides_intro.py", "# %%\nprint('hi')\n");
        course
    }

    pub fn add_notebook(&mut self, rel: &str, contents: &str) {
        if self.model.topics.is_empty() {
            let section = self.model.add_section("S1");
            self.model.add_topic(section, "topic", "slides/topic".into());
        }
        let topic = self.model.topics[0].id;
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        self.model.add_file(
            topic,
            rel.into(),
            FileKind::Notebook {
                prog_lang: "python".into(),
            },
            1,
        );
    }

    pub fn register_worker(&self, kind: JobKind) -> i64 {
        let registry = WorkerRegistry::open(&self.ctx.store).unwrap();
        registry
            .register(kind, &format!("direct-spec-{kind}"), ExecutionMode::Direct, None)
            .unwrap()
    }

    pub fn queue(&self) -> JobQueue {
        JobQueue::open(&self.ctx.store).unwrap()
    }

    pub fn cache_db_path(&self) -> PathBuf {
        self.ctx.config.cache_db_path()
    }
}

/// Claims notebook jobs and emulates the notebook processor's cache
/// choreography: populates-cache runs write an executed-notebook entry,
/// suppressed runs write no artifact, everything else writes its artifact
/// (consuming the cache entry when present). The intermediate-cache key is
/// the execution-scoped hash, exactly as the real processor computes it.
pub fn spawn_notebook_worker(course: &Course, worker_id: i64) -> tokio::task::JoinHandle<()> {
    let store = course.ctx.store.clone();
    let cache_path = course.cache_db_path();
    tokio::spawn(async move {
        let mut queue = JobQueue::open(&store).unwrap();
        let exec_cache = cb_storage::ExecutedNotebookCache::open(&cache_path).unwrap();
        let artifacts = cb_storage::ResultCache::open(&store).unwrap();

        for _ in 0..400 {
            let Some(job) = queue.claim(JobKind::Notebook, worker_id).unwrap() else {
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            };
            let payload: NotebookPayload =
                serde_json::from_value(job.payload.clone()).unwrap();
            let key = cb_storage::ExecutedNotebookKey {
                input_file: job.input_file.clone(),
                content_hash: payload.execution_hash(),
                language: payload.language.as_str().to_string(),
                prog_lang: payload.prog_lang.clone(),
            };

            let mut consumed_cache = false;
            match execution_requirement(payload.format, payload.kind) {
                ExecutionRequirement::PopulatesCache => {
                    exec_cache
                        .put(&key, r#"{"cells": ["executed"]}"#)
                        .unwrap();
                }
                ExecutionRequirement::ReusesCache => {
                    consumed_cache = exec_cache.get(&key).unwrap().is_some();
                }
                ExecutionRequirement::None => {}
            }

            if !payload.suppress_output {
                std::fs::create_dir_all(job.output_file.parent().unwrap()).unwrap();
                std::fs::write(
                    &job.output_file,
                    format!("{}/{}", payload.format, payload.kind),
                )
                .unwrap();
            }

            artifacts
                .insert(&job.output_file, &job.content_hash, None)
                .unwrap();
            queue
                .update_status(
                    job.id,
                    JobStatus::Completed,
                    None,
                    Some(&format!(r#"{{"consumed_cache": {consumed_cache}}}"#)),
                )
                .unwrap();
        }
    })
}
