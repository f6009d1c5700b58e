// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-path debouncing.
//!
//! Editors fire bursts of events for one save. Each path gets its own
//! timer; a new event for the same path cancels the pending timer and
//! restarts it, so a burst collapses into a single emission once the path
//! has been quiet for the delay.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Debouncer {
    delay: Duration,
    pending: HashMap<PathBuf, JoinHandle<()>>,
    ready_tx: mpsc::Sender<PathBuf>,
}

impl Debouncer {
    /// Returns the debouncer and the receiver of settled paths.
    pub fn new(delay: Duration) -> (Self, mpsc::Receiver<PathBuf>) {
        let (ready_tx, ready_rx) = mpsc::channel(64);
        (
            Self {
                delay,
                pending: HashMap::new(),
                ready_tx,
            },
            ready_rx,
        )
    }

    /// Note an event for `path`, (re)starting its timer.
    pub fn on_event(&mut self, path: PathBuf) {
        if let Some(handle) = self.pending.remove(&path) {
            handle.abort();
        }
        let delay = self.delay;
        let tx = self.ready_tx.clone();
        let timer_path = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(timer_path).await;
        });
        self.pending.insert(path, handle);
    }

    /// Forget a settled path so its next event starts a fresh timer.
    pub fn mark_settled(&mut self, path: &PathBuf) {
        self.pending.remove(path);
    }

    /// Abort all pending timers.
    pub fn clear(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
