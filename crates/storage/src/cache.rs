// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two content-addressed caches.
//!
//! The finished-artifact cache lives in the jobs database: a hit on
//! `(output_file, content_hash)` means a previous run produced that artifact
//! and the job can be skipped. The cache is advisory; callers verify the
//! artifact still exists on disk and invalidate the entry if it does not.
//!
//! Executed-notebook intermediates live in a companion database file so that
//! pruning one does not touch the other.

use crate::error::StorageError;
use crate::store::Store;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One finished-artifact cache row.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub output_file: PathBuf,
    pub content_hash: String,
    pub result_metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub access_count: i64,
}

/// Finished-artifact cache operations on the jobs database.
pub struct ResultCache {
    conn: Connection,
}

impl ResultCache {
    pub fn open(store: &Store) -> Result<Self, StorageError> {
        Ok(Self {
            conn: store.connect()?,
        })
    }

    /// Record a produced artifact. Re-recording the same key refreshes the
    /// metadata and creation time.
    pub fn insert(
        &self,
        output_file: &Path,
        content_hash: &str,
        result_metadata: Option<&serde_json::Value>,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO results_cache (output_file, content_hash, result_metadata)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(output_file, content_hash) DO UPDATE SET
                 result_metadata = excluded.result_metadata,
                 created_at = CURRENT_TIMESTAMP",
            params![
                output_file.to_string_lossy(),
                content_hash,
                result_metadata.map(|m| m.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Look up `(output_file, content_hash)`. A hit bumps `access_count` and
    /// `last_accessed`.
    pub fn lookup(
        &self,
        output_file: &Path,
        content_hash: &str,
    ) -> Result<Option<CacheEntry>, StorageError> {
        let entry = self
            .conn
            .query_row(
                "UPDATE results_cache
                 SET access_count = access_count + 1, last_accessed = CURRENT_TIMESTAMP
                 WHERE output_file = ?1 AND content_hash = ?2
                 RETURNING output_file, content_hash, result_metadata, created_at, access_count",
                params![output_file.to_string_lossy(), content_hash],
                |row| {
                    let output: String = row.get(0)?;
                    let metadata: Option<String> = row.get(2)?;
                    let created: String = row.get(3)?;
                    Ok(CacheEntry {
                        output_file: PathBuf::from(output),
                        content_hash: row.get(1)?,
                        result_metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
                        created_at: crate::queue::parse_ts(created),
                        access_count: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Drop one entry, e.g. after discovering the artifact is gone from disk.
    pub fn invalidate(&self, output_file: &Path, content_hash: &str) -> Result<(), StorageError> {
        let removed = self.conn.execute(
            "DELETE FROM results_cache WHERE output_file = ?1 AND content_hash = ?2",
            params![output_file.to_string_lossy(), content_hash],
        )?;
        if removed > 0 {
            debug!(output = %output_file.display(), "invalidated stale cache entry");
        }
        Ok(())
    }

    /// Keep only the `keep_versions` most recent entries per output file.
    /// Returns the number of pruned rows.
    pub fn prune_versions(&self, keep_versions: usize) -> Result<usize, StorageError> {
        let pruned = self.conn.execute(
            "DELETE FROM results_cache WHERE id NOT IN (
                 SELECT id FROM (
                     SELECT id, ROW_NUMBER() OVER (
                         PARTITION BY output_file
                         ORDER BY created_at DESC, id DESC
                     ) AS rn
                     FROM results_cache
                 ) WHERE rn <= ?1
             )",
            [keep_versions as i64],
        )?;
        Ok(pruned)
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM results_cache", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Key of one executed-notebook intermediate.
///
/// `content_hash` is the execution-scoped hash (source bytes plus language
/// tags, format and kind excluded), so the populating run and every
/// consumer of the same executed state share one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedNotebookKey {
    pub input_file: PathBuf,
    pub content_hash: String,
    pub language: String,
    pub prog_lang: String,
}

const CACHE_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS executed_notebooks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    input_file TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    language TEXT NOT NULL,
    prog_lang TEXT NOT NULL,
    notebook_json TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,

    UNIQUE(input_file, content_hash, language, prog_lang)
);

CREATE INDEX IF NOT EXISTS idx_executed_lookup
    ON executed_notebooks(input_file, content_hash, language, prog_lang);
";

/// Cache of post-execution notebook state, in its own database file.
pub struct ExecutedNotebookCache {
    conn: Connection,
}

impl ExecutedNotebookCache {
    /// Open (creating if needed) the companion cache database.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path: PathBuf = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "DELETE")?;
        conn.execute_batch(CACHE_SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Store the executed state for a key, replacing any previous entry.
    pub fn put(&self, key: &ExecutedNotebookKey, notebook_json: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO executed_notebooks
                 (input_file, content_hash, language, prog_lang, notebook_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key.input_file.to_string_lossy(),
                key.content_hash,
                key.language,
                key.prog_lang,
                notebook_json,
            ],
        )?;
        debug!(input = %key.input_file.display(), lang = %key.language, "cached executed notebook");
        Ok(())
    }

    pub fn get(&self, key: &ExecutedNotebookKey) -> Result<Option<String>, StorageError> {
        Ok(self
            .conn
            .query_row(
                "SELECT notebook_json FROM executed_notebooks
                 WHERE input_file = ?1 AND content_hash = ?2
                   AND language = ?3 AND prog_lang = ?4",
                params![
                    key.input_file.to_string_lossy(),
                    key.content_hash,
                    key.language,
                    key.prog_lang,
                ],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM executed_notebooks", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Delete all intermediates. Used by `db clean`.
    pub fn clear(&self) -> Result<usize, StorageError> {
        Ok(self.conn.execute("DELETE FROM executed_notebooks", [])?)
    }

    /// Reclaim file space. Used by `db vacuum --which cache`.
    pub fn vacuum(&self) -> Result<(), StorageError> {
        self.conn.execute("VACUUM", [])?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
