// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cb db` - database maintenance, plus `cb delete-database`.

use anyhow::{bail, Context, Result};
use cb_storage::{clean, collect_stats, prune, vacuum, ExecutedNotebookCache, PruneRetention, Store};
use clap::{Args, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct DbArgs {
    /// Jobs database path
    #[arg(long, global = true, default_value = "cb_jobs.db")]
    pub jobs_db_path: PathBuf,

    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum WhichDb {
    Cache,
    Jobs,
    #[default]
    Both,
}

#[derive(Subcommand)]
pub enum DbCommand {
    /// Show aggregate statistics
    Stats,
    /// Delete old terminal jobs, events, and surplus cache versions
    Prune {
        #[arg(long, default_value_t = 7)]
        completed_days: i64,
        #[arg(long, default_value_t = 30)]
        failed_days: i64,
        #[arg(long, default_value_t = 7)]
        cancelled_days: i64,
        #[arg(long, default_value_t = 30)]
        events_days: i64,
        /// Cache versions to keep per output file
        #[arg(long, default_value_t = 5)]
        cache_versions: usize,
        #[arg(long)]
        dry_run: bool,
    },
    /// Reclaim file space
    Vacuum {
        #[arg(long, value_enum, default_value_t)]
        which: WhichDb,
    },
    /// Delete all rows from every table
    Clean {
        /// Required to actually clean
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct DeleteDatabaseArgs {
    /// Jobs database path
    #[arg(long, default_value = "cb_jobs.db")]
    pub jobs_db_path: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub which: WhichDb,
}

fn cache_db_path(jobs_db_path: &Path) -> PathBuf {
    jobs_db_path.with_file_name("cache.db")
}

pub fn run(args: DbArgs) -> Result<i32> {
    let store = Store::open(&args.jobs_db_path)
        .with_context(|| format!("opening jobs database {}", args.jobs_db_path.display()))?;

    match args.command {
        DbCommand::Stats => {
            let stats = collect_stats(&store)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);

            let cache_path = cache_db_path(&args.jobs_db_path);
            if cache_path.exists() {
                let cache = ExecutedNotebookCache::open(&cache_path)?;
                println!("executed_notebooks: {}", cache.len()?);
            }
            Ok(0)
        }
        DbCommand::Prune {
            completed_days,
            failed_days,
            cancelled_days,
            events_days,
            cache_versions,
            dry_run,
        } => {
            let retention = PruneRetention {
                completed_days,
                failed_days,
                cancelled_days,
                events_days,
                cache_versions,
            };
            let counts = prune(&store, &retention, dry_run)?;
            let verb = if dry_run { "would prune" } else { "pruned" };
            println!(
                "{verb}: {} completed, {} failed, {} cancelled job(s), {} event(s), {} cache version(s)",
                counts.completed_jobs,
                counts.failed_jobs,
                counts.cancelled_jobs,
                counts.events,
                counts.cache_versions
            );
            Ok(0)
        }
        DbCommand::Vacuum { which } => {
            if matches!(which, WhichDb::Jobs | WhichDb::Both) {
                vacuum(&store)?;
                println!("vacuumed {}", args.jobs_db_path.display());
            }
            if matches!(which, WhichDb::Cache | WhichDb::Both) {
                let cache_path = cache_db_path(&args.jobs_db_path);
                if cache_path.exists() {
                    let cache = ExecutedNotebookCache::open(&cache_path)?;
                    cache.vacuum()?;
                    println!("vacuumed {}", cache_path.display());
                }
            }
            Ok(0)
        }
        DbCommand::Clean { force } => {
            if !force {
                bail!("db clean removes all rows; pass --force to proceed");
            }
            clean(&store)?;
            let cache_path = cache_db_path(&args.jobs_db_path);
            if cache_path.exists() {
                let cache = ExecutedNotebookCache::open(&cache_path)?;
                cache.clear()?;
            }
            println!("cleaned all tables");
            Ok(0)
        }
    }
}

pub fn run_delete(args: DeleteDatabaseArgs) -> Result<i32> {
    if matches!(args.which, WhichDb::Jobs | WhichDb::Both) {
        remove_db_files(&args.jobs_db_path)?;
    }
    if matches!(args.which, WhichDb::Cache | WhichDb::Both) {
        remove_db_files(&cache_db_path(&args.jobs_db_path))?;
    }
    Ok(0)
}

/// Remove a database file and its rollback journal, if present.
fn remove_db_files(path: &Path) -> Result<()> {
    for candidate in [path.to_path_buf(), path.with_extension("db-journal")] {
        if candidate.exists() {
            std::fs::remove_file(&candidate)
                .with_context(|| format!("deleting {}", candidate.display()))?;
            println!("deleted {}", candidate.display());
        }
    }
    Ok(())
}
