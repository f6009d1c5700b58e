// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cb status` - queue and worker health at a glance.
//!
//! Exit codes: 0 healthy, 1 warning (stale workers, recent failures,
//! stuck pending jobs), 2 error (database unreadable).

use crate::color;
use crate::output::StatusFormat;
use crate::table::{Column, Table};
use anyhow::Result;
use cb_core::JobStatus;
use cb_storage::{collect_stats, DbStats, JobFilter, JobQueue, Store, WorkerRegistry, WorkerStatus};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct StatusArgs {
    /// Show the worker table
    #[arg(long)]
    pub workers: bool,

    /// Show the recent-jobs table
    #[arg(long)]
    pub jobs: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: StatusFormat,

    #[arg(long)]
    pub no_color: bool,

    /// Jobs database path
    #[arg(long, default_value = "cb_jobs.db")]
    pub jobs_db_path: PathBuf,
}

/// Overall health derived from the stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Health {
    Healthy,
    Warning,
    Error,
}

impl Health {
    fn exit_code(self) -> i32 {
        match self {
            Health::Healthy => 0,
            Health::Warning => 1,
            Health::Error => 2,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Health::Healthy => "healthy",
            Health::Warning => "warning",
            Health::Error => "error",
        }
    }
}

fn assess(stats: &DbStats) -> Health {
    let hung = stats.workers_by_status.get("hung").copied().unwrap_or(0);
    let processing = stats.jobs_with_status(JobStatus::Processing);
    let pending = stats.jobs_with_status(JobStatus::Pending);
    let failed = stats.jobs_with_status(JobStatus::Failed);

    if hung > 0 || failed > 0 {
        return Health::Warning;
    }
    // Work queued but nobody to do it.
    if (pending > 0 || processing > 0) && stats.healthy_workers() == 0 {
        return Health::Warning;
    }
    Health::Healthy
}

pub fn run(args: StatusArgs) -> Result<i32> {
    if args.no_color {
        color::disable();
    }

    if !args.jobs_db_path.exists() {
        eprintln!("error: jobs database not found at {}", args.jobs_db_path.display());
        return Ok(Health::Error.exit_code());
    }
    let store = match Store::open(&args.jobs_db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: cannot open jobs database: {e}");
            return Ok(Health::Error.exit_code());
        }
    };

    let stats = collect_stats(&store)?;
    let health = assess(&stats);

    match args.format {
        StatusFormat::Json => print_json(&args, &store, &stats, health)?,
        StatusFormat::Compact => print_compact(&stats, health),
        StatusFormat::Table => print_tables(&args, &store, &stats, health)?,
    }
    Ok(health.exit_code())
}

fn print_compact(stats: &DbStats, health: Health) {
    println!(
        "{} | workers {} | pending {} | processing {} | completed {} | failed {}",
        color::status(health.as_str()),
        stats.healthy_workers(),
        stats.jobs_with_status(JobStatus::Pending),
        stats.jobs_with_status(JobStatus::Processing),
        stats.jobs_with_status(JobStatus::Completed),
        stats.jobs_with_status(JobStatus::Failed),
    );
}

fn print_json(args: &StatusArgs, store: &Store, stats: &DbStats, health: Health) -> Result<()> {
    let mut body = serde_json::json!({
        "health": health.as_str(),
        "stats": stats,
    });
    if args.workers {
        let registry = WorkerRegistry::open(store)?;
        let workers: Vec<_> = registry
            .discover(None)?
            .into_iter()
            .map(|w| {
                serde_json::json!({
                    "id": w.id,
                    "kind": w.kind,
                    "container_id": w.container_id,
                    "status": w.status.as_str(),
                    "heartbeat_age_secs": w.heartbeat_age_secs,
                    "jobs_processed": w.jobs_processed,
                    "jobs_failed": w.jobs_failed,
                })
            })
            .collect();
        body["workers"] = serde_json::Value::Array(workers);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn print_tables(args: &StatusArgs, store: &Store, stats: &DbStats, health: Health) -> Result<()> {
    println!("status: {}", color::status(health.as_str()));
    println!(
        "jobs: {} pending, {} processing, {} completed, {} failed, {} cancelled",
        stats.jobs_with_status(JobStatus::Pending),
        stats.jobs_with_status(JobStatus::Processing),
        stats.jobs_with_status(JobStatus::Completed),
        stats.jobs_with_status(JobStatus::Failed),
        stats.jobs_with_status(JobStatus::Cancelled),
    );
    println!(
        "workers: {} healthy | cache: {} entries, {} hits",
        stats.healthy_workers(),
        stats.cache_entries,
        stats.cache_total_accesses
    );

    if args.workers {
        let registry = WorkerRegistry::open(store)?;
        let workers = registry.discover(None)?;
        let mut table = Table::new(vec![
            Column::right("ID"),
            Column::left("KIND"),
            Column::status("STATUS"),
            Column::left("MODE"),
            Column::right("HB AGE"),
            Column::right("DONE"),
            Column::right("FAILED"),
            Column::muted("CONTAINER").with_max_width(24),
        ]);
        for w in &workers {
            // Long-dead rows are noise in the live view.
            if w.status == WorkerStatus::Dead && w.heartbeat_age_secs > 3600 {
                continue;
            }
            table.add_row(vec![
                w.id.to_string(),
                w.kind.to_string(),
                w.status.to_string(),
                w.execution_mode.map(|m| m.to_string()).unwrap_or_default(),
                format!("{}s", w.heartbeat_age_secs),
                w.jobs_processed.to_string(),
                w.jobs_failed.to_string(),
                w.container_id.clone(),
            ]);
        }
        println!();
        if table.is_empty() {
            println!("no workers");
        } else {
            print!("{}", table.render());
        }
    }

    if args.jobs {
        let queue = JobQueue::open(store)?;
        let rows = queue.list(&JobFilter {
            limit: Some(15),
            ..Default::default()
        })?;
        let mut table = Table::new(vec![
            Column::right("ID"),
            Column::left("KIND"),
            Column::status("STATUS"),
            Column::left("INPUT").with_max_width(48),
        ]);
        for row in &rows {
            table.add_row(vec![
                row.id.to_string(),
                row.kind.to_string(),
                row.status.to_string(),
                row.input_file.display().to_string(),
            ]);
        }
        println!();
        if table.is_empty() {
            println!("no jobs");
        } else {
            print!("{}", table.render());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
