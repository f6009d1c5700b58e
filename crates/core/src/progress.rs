// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build progress snapshot handed to output formatters.

use serde::{Deserialize, Serialize};

/// A point-in-time view of a running build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub active_workers: usize,
}

impl BuildProgress {
    pub fn finished(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }

    pub fn outstanding(&self) -> usize {
        self.total.saturating_sub(self.finished())
    }

    pub fn is_done(&self) -> bool {
        self.outstanding() == 0
    }

    /// Completion percentage in [0, 100]; 100 for an empty build.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        ((self.finished() * 100) / self.total) as u32
    }
}
