// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped `.git` directory mover.
//!
//! Output roots are sometimes git repositories (published course sites).
//! Destructive copy phases must not clobber their `.git` directories, so
//! the guard moves each one aside before the writes and restores it after.
//! Restore failures are fatal and name both paths; losing track of a moved
//! `.git` is worse than a failed build.

use crate::error::EngineError;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Moved `.git` directories, restored on [`GitDirGuard::restore`] (or
/// best-effort on drop).
pub struct GitDirGuard {
    /// (original, moved-aside) pairs.
    moved: Vec<(PathBuf, PathBuf)>,
    restored: bool,
}

impl GitDirGuard {
    /// Move aside the `.git` directory directly under each root, if any.
    pub fn move_aside(roots: &[PathBuf]) -> Result<Self, EngineError> {
        let mut moved = Vec::new();
        for root in roots {
            let git_dir = root.join(".git");
            if !git_dir.exists() {
                continue;
            }
            // Already handled (two targets sharing a root).
            if moved.iter().any(|(orig, _)| *orig == git_dir) {
                continue;
            }
            let aside = root.join(format!(".git-moved-{}", Uuid::new_v4()));
            std::fs::rename(&git_dir, &aside)?;
            info!(from = %git_dir.display(), to = %aside.display(), "moved .git aside");
            moved.push((git_dir, aside));
        }
        Ok(Self {
            moved,
            restored: false,
        })
    }

    /// How many `.git` directories are currently moved aside.
    pub fn len(&self) -> usize {
        self.moved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }

    /// Restore every moved directory. The first failure aborts with both
    /// paths in the error; remaining pairs stay for the drop handler.
    pub fn restore(mut self) -> Result<(), EngineError> {
        while let Some((original, aside)) = self.moved.pop() {
            if let Err(e) = std::fs::rename(&aside, &original) {
                error!(
                    original = %original.display(),
                    moved = %aside.display(),
                    error = %e,
                    "failed to restore .git directory"
                );
                // Put it back in the list so Drop retries the remainder.
                self.moved.push((original.clone(), aside.clone()));
                return Err(EngineError::GitRestoreFailed {
                    original,
                    moved: aside,
                    message: e.to_string(),
                });
            }
            info!(path = %original.display(), "restored .git directory");
        }
        self.restored = true;
        Ok(())
    }
}

impl Drop for GitDirGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        for (original, aside) in self.moved.drain(..) {
            if let Err(e) = std::fs::rename(&aside, &original) {
                warn!(
                    original = %original.display(),
                    moved = %aside.display(),
                    error = %e,
                    "could not restore .git directory on drop"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "git_guard_tests.rs"]
mod tests;
