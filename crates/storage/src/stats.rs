// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database statistics and retention pruning, backing `db stats`,
//! `db prune`, and `db vacuum`.

use crate::cache::ResultCache;
use crate::error::StorageError;
use crate::store::Store;
use cb_core::{JobKind, JobStatus};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Aggregate counts across the jobs database.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DbStats {
    /// Jobs per status.
    pub jobs_by_status: BTreeMap<String, i64>,
    /// Jobs per kind.
    pub jobs_by_kind: BTreeMap<String, i64>,
    /// Workers per status.
    pub workers_by_status: BTreeMap<String, i64>,
    pub cache_entries: i64,
    pub cache_total_accesses: i64,
    pub worker_events: i64,
    pub database_bytes: u64,
}

impl DbStats {
    pub fn total_jobs(&self) -> i64 {
        self.jobs_by_status.values().sum()
    }

    pub fn jobs_with_status(&self, status: JobStatus) -> i64 {
        self.jobs_by_status
            .get(status.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn jobs_with_kind(&self, kind: JobKind) -> i64 {
        self.jobs_by_kind.get(kind.as_str()).copied().unwrap_or(0)
    }

    pub fn healthy_workers(&self) -> i64 {
        self.workers_by_status.get("idle").copied().unwrap_or(0)
            + self.workers_by_status.get("busy").copied().unwrap_or(0)
    }
}

/// Retention windows for [`prune`]. Days of zero mean "delete all of them".
#[derive(Debug, Clone, Copy)]
pub struct PruneRetention {
    pub completed_days: i64,
    pub failed_days: i64,
    pub cancelled_days: i64,
    pub events_days: i64,
    /// Most-recent cache versions to keep per output file.
    pub cache_versions: usize,
}

impl Default for PruneRetention {
    fn default() -> Self {
        Self {
            completed_days: 7,
            failed_days: 30,
            cancelled_days: 7,
            events_days: 30,
            cache_versions: 5,
        }
    }
}

/// What [`prune`] removed (or would remove, in dry-run mode).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneCounts {
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub cancelled_jobs: usize,
    pub events: usize,
    pub cache_versions: usize,
}

impl PruneCounts {
    pub fn total(&self) -> usize {
        self.completed_jobs + self.failed_jobs + self.cancelled_jobs + self.events + self.cache_versions
    }
}

/// Collect aggregate statistics.
pub fn collect_stats(store: &Store) -> Result<DbStats, StorageError> {
    let conn = store.connect()?;
    let mut stats = DbStats::default();

    group_counts(&conn, "SELECT status, COUNT(*) FROM jobs GROUP BY status", &mut stats.jobs_by_status)?;
    group_counts(&conn, "SELECT job_type, COUNT(*) FROM jobs GROUP BY job_type", &mut stats.jobs_by_kind)?;
    group_counts(
        &conn,
        "SELECT status, COUNT(*) FROM workers GROUP BY status",
        &mut stats.workers_by_status,
    )?;

    stats.cache_entries = conn.query_row("SELECT COUNT(*) FROM results_cache", [], |r| r.get(0))?;
    stats.cache_total_accesses = conn.query_row(
        "SELECT COALESCE(SUM(access_count), 0) FROM results_cache",
        [],
        |r| r.get(0),
    )?;
    stats.worker_events = conn.query_row("SELECT COUNT(*) FROM worker_events", [], |r| r.get(0))?;
    stats.database_bytes = std::fs::metadata(store.path()).map(|m| m.len()).unwrap_or(0);

    Ok(stats)
}

fn group_counts(
    conn: &Connection,
    sql: &str,
    out: &mut BTreeMap<String, i64>,
) -> Result<(), StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (key, count) = row?;
        out.insert(key, count);
    }
    Ok(())
}

/// Delete terminal jobs and events past their retention windows and prune
/// cache versions. With `dry_run`, counts what would be removed and leaves
/// the database untouched.
pub fn prune(
    store: &Store,
    retention: &PruneRetention,
    dry_run: bool,
) -> Result<PruneCounts, StorageError> {
    let conn = store.connect()?;
    let mut counts = PruneCounts::default();

    counts.completed_jobs = prune_jobs(&conn, JobStatus::Completed, retention.completed_days, dry_run)?;
    counts.failed_jobs = prune_jobs(&conn, JobStatus::Failed, retention.failed_days, dry_run)?;
    counts.cancelled_jobs = prune_jobs(&conn, JobStatus::Cancelled, retention.cancelled_days, dry_run)?;

    let events_cutoff = format!("-{} days", retention.events_days);
    counts.events = if dry_run {
        conn.query_row(
            "SELECT COUNT(*) FROM worker_events WHERE created_at < datetime('now', ?1)",
            [&events_cutoff],
            |r| r.get::<_, i64>(0),
        )? as usize
    } else {
        conn.execute(
            "DELETE FROM worker_events WHERE created_at < datetime('now', ?1)",
            [&events_cutoff],
        )?
    };

    counts.cache_versions = if dry_run {
        conn.query_row(
            "SELECT COUNT(*) FROM results_cache WHERE id NOT IN (
                 SELECT id FROM (
                     SELECT id, ROW_NUMBER() OVER (
                         PARTITION BY output_file
                         ORDER BY created_at DESC, id DESC
                     ) AS rn
                     FROM results_cache
                 ) WHERE rn <= ?1
             )",
            [retention.cache_versions as i64],
            |r| r.get::<_, i64>(0),
        )? as usize
    } else {
        let cache = ResultCache::open(store)?;
        cache.prune_versions(retention.cache_versions)?
    };

    if !dry_run && counts.total() > 0 {
        info!(
            completed = counts.completed_jobs,
            failed = counts.failed_jobs,
            cancelled = counts.cancelled_jobs,
            events = counts.events,
            cache = counts.cache_versions,
            "pruned database"
        );
    }

    Ok(counts)
}

fn prune_jobs(
    conn: &Connection,
    status: JobStatus,
    days: i64,
    dry_run: bool,
) -> Result<usize, StorageError> {
    let cutoff = format!("-{days} days");
    if dry_run {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs
             WHERE status = ?1 AND created_at < datetime('now', ?2)",
            rusqlite::params![status.as_str(), cutoff],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    } else {
        Ok(conn.execute(
            "DELETE FROM jobs WHERE status = ?1 AND created_at < datetime('now', ?2)",
            rusqlite::params![status.as_str(), cutoff],
        )?)
    }
}

/// Reclaim file space after pruning.
pub fn vacuum(store: &Store) -> Result<(), StorageError> {
    let conn = store.connect()?;
    conn.execute("VACUUM", [])?;
    Ok(())
}

/// Delete all rows from every table. Used by `db clean`.
pub fn clean(store: &Store) -> Result<(), StorageError> {
    let conn = store.connect()?;
    conn.execute_batch(
        "DELETE FROM worker_events;
         DELETE FROM jobs;
         DELETE FROM workers;
         DELETE FROM results_cache;",
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
