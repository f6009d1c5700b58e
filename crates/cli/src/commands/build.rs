// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cb build` - plan and execute a course build.

use anyhow::{Context, Result};
use cb_core::{JobKind, Language, OutputFormat, OutputKind, TargetFilter};
use cb_engine::{
    load_course_model, spawn_correlation_reaper, spawn_hung_job_reaper, BuildConfig, BuildContext,
    BuildDriver, BuildLock, DefaultFormatter, DriverConfig, LifecycleManager, OutputFormatter,
    Planner, QuietFormatter, ReaperConfig, VerboseFormatter, WatchOptions, Watcher,
    WorkerPoolConfig,
};
use cb_storage::{ExecutionMode, Store};
use clap::Args;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

#[derive(Args)]
pub struct BuildArgs {
    /// Path to the course spec (TOML)
    pub spec: PathBuf,

    /// Root of the authoring sources (defaults to the spec's directory)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Default output root for specs without explicit targets
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Keep running and rebuild changed files
    #[arg(long)]
    pub watch: bool,

    /// Ignore the artifact cache and rebuild everything
    #[arg(long = "ignore-db")]
    pub ignore_db: bool,

    /// Jobs database path (defaults to <data-dir>/cb_jobs.db)
    #[arg(long)]
    pub jobs_db_path: Option<PathBuf>,

    /// Restrict to these languages (repeatable)
    #[arg(long = "language")]
    pub languages: Vec<Language>,

    /// Restrict to these formats (repeatable)
    #[arg(long = "format")]
    pub formats: Vec<OutputFormat>,

    /// Restrict to these output kinds (repeatable)
    #[arg(long = "kind")]
    pub kinds: Vec<OutputKind>,

    /// Per-job detail and cache-hit lines
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors and final summary only
    #[arg(long)]
    pub quiet: bool,
}

impl BuildArgs {
    fn target_filter(&self) -> TargetFilter {
        TargetFilter {
            languages: (!self.languages.is_empty()).then(|| self.languages.clone()),
            formats: (!self.formats.is_empty()).then(|| self.formats.clone()),
            kinds: (!self.kinds.is_empty()).then(|| self.kinds.clone()),
        }
    }
}

pub async fn run(args: BuildArgs, log_level: Option<&str>) -> Result<i32> {
    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => args
            .spec
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let mut config = BuildConfig::new(data_dir.clone(), args.output_dir.clone());
    if let Some(db) = &args.jobs_db_path {
        config.jobs_db_path = db.clone();
    }
    config.ignore_cache = args.ignore_db;
    config.filter = args.target_filter();
    if let Some(level) = log_level {
        config.log_level = level.to_string();
    }

    let _lock = BuildLock::acquire(&config.jobs_db_path)?;
    let store = Store::open(&config.jobs_db_path)
        .with_context(|| format!("opening jobs database {}", config.jobs_db_path.display()))?;
    let ctx = BuildContext::new(config, store);

    let model = load_course_model(&args.spec, &ctx.config.data_dir, &ctx.config.output_dir)?;
    info!(course = %model.name, files = model.files.len(), "course model loaded");

    let correlation_id = ctx.correlations.new_correlation_id();
    let planner = Planner::new(&model, &ctx.config.filter, &ctx.config.data_dir)
        .with_correlation_id(correlation_id.clone());
    let plan = planner.plan()?;

    // Pool shape and the API bridge for container workers.
    let pool_config = WorkerPoolConfig::load(&ctx.config.data_dir.join("workers.toml"))?;
    let kinds: Vec<JobKind> = plan
        .stages
        .iter()
        .flat_map(|s| &s.jobs)
        .map(|j| j.kind)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let wants_docker = kinds
        .iter()
        .any(|&k| pool_config.for_kind(k).mode() == ExecutionMode::Docker);

    let api_server = if wants_docker {
        let server = cb_api::ApiServer::new(ctx.store.clone());
        Some(server.start("0.0.0.0:0".parse()?).await?)
    } else {
        None
    };

    let mut lifecycle = LifecycleManager::new(pool_config);
    if let Some(server) = &api_server {
        lifecycle = lifecycle.with_api_base_url(server.base_url());
    }
    lifecycle.ensure_pool(&ctx, &kinds).await?;

    // Background reapers for the lifetime of the build.
    let reaper_config = ReaperConfig::default();
    let hung_reaper =
        spawn_hung_job_reaper(ctx.store.clone(), reaper_config.clone(), ctx.shutdown_flag());
    let cid_reaper = spawn_correlation_reaper(
        std::sync::Arc::clone(&ctx.correlations),
        reaper_config,
        ctx.shutdown_flag(),
    );

    // Ctrl-C flips the shared flag; every loop observes it within one poll.
    let shutdown_on_signal = ctx.shutdown_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; shutting down");
            shutdown_on_signal.store(true, Ordering::SeqCst);
        }
    });

    let mut formatter: Box<dyn OutputFormatter> = if args.verbose {
        Box::new(VerboseFormatter::new())
    } else if args.quiet {
        Box::new(QuietFormatter::new())
    } else {
        Box::new(DefaultFormatter::new())
    };

    let driver_config = DriverConfig {
        ignore_cache: ctx.config.ignore_cache,
        ..Default::default()
    };
    let mut driver = BuildDriver::new(driver_config, formatter.as_mut());
    let report = driver.execute(&ctx, &plan).await?;
    ctx.correlations.remove(&correlation_id);

    if args.watch && !report.fatal {
        let watcher = Watcher::new(WatchOptions::default());
        let cycles = watcher.run(&ctx, &model).await?;
        info!(cycles, "watch mode finished");
    }

    lifecycle.shutdown_pool(&ctx).await?;
    if let Some(server) = api_server {
        server.shutdown().await;
    }
    ctx.request_shutdown();
    let _ = hung_reaper.await;
    let _ = cid_reaper.await;

    Ok(report.exit_code())
}
