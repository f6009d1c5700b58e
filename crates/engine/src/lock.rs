// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-host build lock.
//!
//! One coordinating process per jobs database: a second `cb build` against
//! the same database would double-plan and double-manage the pool. The lock
//! file sits next to the database and is released when the guard drops.

use crate::error::EngineError;
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Held for the lifetime of one build (or watch session).
pub struct BuildLock {
    // NOTE(lifetime): held to keep the exclusive flock; released on drop
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl BuildLock {
    /// Acquire the lock next to `jobs_db_path`, failing fast when another
    /// build holds it.
    pub fn acquire(jobs_db_path: &Path) -> Result<Self, EngineError> {
        let path = jobs_db_path.with_extension("lock");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Avoid truncating before the lock is held; the running build's pid
        // would be wiped.
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| EngineError::BuildLocked(path.clone()))?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        info!(lock = %path.display(), "acquired build lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
