// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The explicit per-build state threaded through the call graph.
//!
//! One `BuildContext` lives for one build (or one watch cycle). Everything
//! that would otherwise be a process-global (the correlation registry, the
//! session identity, shutdown signalling) hangs off it.

use cb_core::{CorrelationRegistry, TargetFilter};
use cb_storage::Store;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Settings assembled from CLI flags and the environment.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root of the authoring sources.
    pub data_dir: PathBuf,
    /// Default output root when the spec declares no targets.
    pub output_dir: PathBuf,
    /// Path to the jobs database.
    pub jobs_db_path: PathBuf,
    /// Skip cache lookups and rebuild everything.
    pub ignore_cache: bool,
    /// CLI-level narrowing of the spec's targets.
    pub filter: TargetFilter,
    /// Most-recent cache versions retained per output file.
    pub cache_versions: usize,
    pub log_level: String,
}

impl BuildConfig {
    pub fn new(data_dir: PathBuf, output_dir: PathBuf) -> Self {
        let jobs_db_path = data_dir.join("cb_jobs.db");
        Self {
            data_dir,
            output_dir,
            jobs_db_path,
            ignore_cache: false,
            filter: TargetFilter::default(),
            cache_versions: 5,
            log_level: "info".to_string(),
        }
    }

    /// Companion database holding executed-notebook intermediates.
    pub fn cache_db_path(&self) -> PathBuf {
        self.jobs_db_path.with_file_name("cache.db")
    }
}

/// Shared state for one build.
pub struct BuildContext {
    pub config: BuildConfig,
    pub store: Store,
    pub correlations: Arc<CorrelationRegistry>,
    /// Identity of this host session; workers started by it are tagged with
    /// it (`managed_by`) so shutdown stops only what this session started.
    pub session_id: String,
    shutdown: Arc<AtomicBool>,
}

impl BuildContext {
    pub fn new(config: BuildConfig, store: Store) -> Self {
        Self {
            config,
            store,
            correlations: Arc::new(CorrelationRegistry::new()),
            session_id: Uuid::new_v4().to_string(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
