// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database file ownership, schema, and migrations.
//!
//! The store enforces one connection policy for every consumer: plain
//! rollback-journal mode (container workers mount the database file across
//! an OS boundary where WAL shared-memory coordination is unreliable),
//! foreign keys on, and a busy timeout so concurrent claimants queue instead
//! of failing. Migrations are additive and idempotent, driven by the
//! `schema_version` table.

use crate::error::StorageError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Current schema version.
pub const DATABASE_VERSION: i64 = 3;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_SQL: &str = "
-- Jobs table (the durable work queue)
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_type TEXT NOT NULL,
    status TEXT NOT NULL
        CHECK(status IN ('pending', 'processing', 'completed', 'failed', 'cancelled')),
    priority INTEGER DEFAULT 0,

    input_file TEXT NOT NULL,
    output_file TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    payload TEXT NOT NULL,  -- JSON
    correlation_id TEXT,

    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    started_at TIMESTAMP,
    completed_at TIMESTAMP,
    cancelled_at TIMESTAMP,
    cancelled_by TEXT,
    worker_id INTEGER,

    attempts INTEGER DEFAULT 0,
    max_attempts INTEGER DEFAULT 3,
    error TEXT,    -- JSON
    result TEXT,   -- JSON

    FOREIGN KEY (worker_id) REFERENCES workers(id)
);

CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status, job_type);
CREATE INDEX IF NOT EXISTS idx_jobs_content_hash ON jobs(content_hash);
CREATE INDEX IF NOT EXISTS idx_jobs_input ON jobs(input_file, status);

-- Finished-artifact cache
CREATE TABLE IF NOT EXISTS results_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    output_file TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    result_metadata TEXT,  -- JSON
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    last_accessed TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    access_count INTEGER DEFAULT 0,

    UNIQUE(output_file, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_cache_lookup ON results_cache(output_file, content_hash);

-- Worker registry
CREATE TABLE IF NOT EXISTS workers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    worker_type TEXT NOT NULL,
    container_id TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL CHECK(status IN ('created', 'idle', 'busy', 'hung', 'dead')),
    parent_pid INTEGER,

    started_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    last_heartbeat TIMESTAMP DEFAULT CURRENT_TIMESTAMP,

    jobs_processed INTEGER DEFAULT 0,
    jobs_failed INTEGER DEFAULT 0,
    avg_processing_time REAL,

    execution_mode TEXT,
    config TEXT,
    session_id TEXT,
    managed_by TEXT
);

CREATE INDEX IF NOT EXISTS idx_workers_status ON workers(worker_type, status);

-- Worker lifecycle events (audit log)
CREATE TABLE IF NOT EXISTS worker_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL CHECK(event_type IN (
        'worker_starting',
        'worker_registered',
        'worker_ready',
        'worker_stopping',
        'worker_stopped',
        'worker_failed',
        'pool_starting',
        'pool_started',
        'pool_stopping',
        'pool_stopped'
    )),

    worker_id INTEGER,        -- NULL for pool-level events
    worker_type TEXT NOT NULL,
    execution_mode TEXT,      -- 'docker' or 'direct'

    message TEXT,
    metadata TEXT,            -- JSON

    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    session_id TEXT,

    FOREIGN KEY (worker_id) REFERENCES workers(id)
);

CREATE INDEX IF NOT EXISTS idx_worker_events_type ON worker_events(event_type, created_at);
CREATE INDEX IF NOT EXISTS idx_worker_events_worker ON worker_events(worker_id, created_at);
CREATE INDEX IF NOT EXISTS idx_worker_events_session ON worker_events(session_id, created_at);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
";

/// Handle to the jobs database file.
///
/// `Store` itself holds no connection; call [`Store::connect`] to obtain one
/// per logical consumer. Connections must not cross OS threads.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open (creating if needed) the database and bring the schema up to
    /// [`DATABASE_VERSION`]. Idempotent: re-opening an initialized database
    /// leaves it untouched.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { path };
        let conn = store.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;

        match schema_version(&conn)? {
            Some(version) if version < DATABASE_VERSION => {
                migrate(&conn, version)?;
                info!(from = version, to = DATABASE_VERSION, "migrated jobs database");
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
                    [DATABASE_VERSION],
                )?;
            }
        }

        Ok(store)
    }

    /// Open a new connection with the store's pragma policy applied.
    pub fn connect(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Rollback journal, not WAL: the file must stay mountable into
        // container workers without shared-memory coordination.
        conn.pragma_update(None, "journal_mode", "DELETE")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current schema version, if the database has been initialized.
    pub fn version(&self) -> Result<Option<i64>, StorageError> {
        schema_version(&self.connect()?)
    }
}

fn schema_version(conn: &Connection) -> Result<Option<i64>, StorageError> {
    let result = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get::<_, i64>(0),
    );
    match result {
        Ok(version) => Ok(Some(version)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Apply additive migrations from `from_version` to [`DATABASE_VERSION`].
///
/// Duplicate-column errors are swallowed so a half-applied migration can be
/// re-run safely.
fn migrate(conn: &Connection, from_version: i64) -> Result<(), StorageError> {
    if from_version < 2 {
        add_column_if_missing(conn, "jobs", "correlation_id TEXT")?;
        conn.execute("INSERT OR IGNORE INTO schema_version (version) VALUES (2)", [])?;
    }

    if from_version < 3 {
        // worker_events is created by SCHEMA_SQL (CREATE TABLE IF NOT EXISTS);
        // only the workers columns need adding here.
        for column in [
            "execution_mode TEXT",
            "config TEXT",
            "session_id TEXT",
            "managed_by TEXT",
        ] {
            add_column_if_missing(conn, "workers", column)?;
        }
        conn.execute("INSERT OR IGNORE INTO schema_version (version) VALUES (3)", [])?;
    }

    Ok(())
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column_def: &str,
) -> Result<(), StorageError> {
    let sql = format!("ALTER TABLE {table} ADD COLUMN {column_def}");
    match conn.execute(&sql, []) {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().to_lowercase().contains("duplicate column name") => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
