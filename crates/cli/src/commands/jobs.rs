// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cb jobs` - inspect and cancel queued jobs.

use crate::output::ListFormat;
use crate::table::{Column, Table};
use anyhow::{bail, Context, Result};
use cb_core::{JobKind, JobStatus};
use cb_storage::{JobFilter, JobQueue, JobRow, Store};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct JobsArgs {
    /// Jobs database path
    #[arg(long, global = true, default_value = "cb_jobs.db")]
    pub jobs_db_path: PathBuf,

    #[command(subcommand)]
    pub command: JobsCommand,
}

#[derive(Subcommand)]
pub enum JobsCommand {
    /// List jobs, newest first
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<JobStatus>,
        /// Maximum rows
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, value_enum, default_value_t)]
        format: ListFormat,
    },
    /// Cancel pending jobs
    Cancel {
        /// Only jobs older than this many seconds
        #[arg(long)]
        older_than: Option<i64>,
        /// Only jobs of this kind
        #[arg(long = "type")]
        kind: Option<JobKind>,
        /// Show what would be cancelled without doing it
        #[arg(long)]
        dry_run: bool,
        /// Required to actually cancel
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: JobsArgs) -> Result<i32> {
    let store = Store::open(&args.jobs_db_path)
        .with_context(|| format!("opening jobs database {}", args.jobs_db_path.display()))?;

    match args.command {
        JobsCommand::List {
            status,
            limit,
            format,
        } => list(&store, status, limit, format),
        JobsCommand::Cancel {
            older_than,
            kind,
            dry_run,
            force,
        } => cancel(&store, older_than, kind, dry_run, force),
    }
}

fn list(
    store: &Store,
    status: Option<JobStatus>,
    limit: usize,
    format: ListFormat,
) -> Result<i32> {
    let queue = JobQueue::open(store)?;
    let rows = queue.list(&JobFilter {
        status,
        limit: Some(limit),
        ..Default::default()
    })?;

    match format {
        ListFormat::Json => {
            let values: Vec<_> = rows.iter().map(job_json).collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        ListFormat::Table => {
            if rows.is_empty() {
                println!("no jobs");
                return Ok(0);
            }
            let mut table = Table::new(vec![
                Column::right("ID"),
                Column::left("KIND"),
                Column::status("STATUS"),
                Column::right("ATTEMPTS"),
                Column::left("INPUT").with_max_width(48),
                Column::muted("CREATED"),
            ]);
            for row in &rows {
                table.add_row(vec![
                    row.id.to_string(),
                    row.kind.to_string(),
                    row.status.to_string(),
                    format!("{}/{}", row.attempts, row.max_attempts),
                    row.input_file.display().to_string(),
                    row.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]);
            }
            print!("{}", table.render());
        }
    }
    Ok(0)
}

fn job_json(row: &JobRow) -> serde_json::Value {
    serde_json::json!({
        "id": row.id,
        "kind": row.kind,
        "status": row.status,
        "priority": row.priority,
        "input_file": row.input_file,
        "output_file": row.output_file,
        "attempts": row.attempts,
        "max_attempts": row.max_attempts,
        "correlation_id": row.correlation_id,
        "created_at": row.created_at.to_rfc3339(),
        "worker_id": row.worker_id,
    })
}

fn cancel(
    store: &Store,
    older_than: Option<i64>,
    kind: Option<JobKind>,
    dry_run: bool,
    force: bool,
) -> Result<i32> {
    let mut queue = JobQueue::open(store)?;
    let candidates = queue.list(&JobFilter {
        status: Some(JobStatus::Pending),
        kind,
        older_than_secs: older_than,
        limit: None,
    })?;

    if candidates.is_empty() {
        println!("no pending jobs match");
        return Ok(0);
    }
    if dry_run {
        println!("would cancel {} job(s):", candidates.len());
        for job in &candidates {
            println!("  #{} {} {}", job.id, job.kind, job.input_file.display());
        }
        return Ok(0);
    }
    if !force {
        bail!(
            "{} job(s) would be cancelled; pass --force to proceed (or --dry-run to preview)",
            candidates.len()
        );
    }

    let mut cancelled = 0;
    for job in &candidates {
        match queue.update_status(job.id, JobStatus::Cancelled, None, None) {
            Ok(()) => cancelled += 1,
            // Lost the race with a worker claim; leave it alone.
            Err(cb_storage::StorageError::InvalidTransition { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }
    println!("cancelled {cancelled} job(s)");
    Ok(0)
}
