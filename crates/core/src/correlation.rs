// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local registry of active request correlation ids.
//!
//! Every user-visible request (a build, a watch-triggered rebuild) gets a
//! correlation id that ties together the jobs it spawned, for log correlation
//! and end-of-build reporting. Entries removed from the active map are kept
//! in the history for reporting; a periodic scan evicts entries that outlive
//! [`STALE_CID_MAX_LIFETIME`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Active entries older than this are reaped.
pub const STALE_CID_MAX_LIFETIME: Duration = Duration::from_secs(1200);

/// Per-request state.
#[derive(Debug, Clone)]
pub struct CorrelationData {
    pub correlation_id: String,
    pub start_time: Instant,
    /// Job ids (or other resources) this request depends on.
    pub dependencies: Vec<String>,
}

#[derive(Default)]
struct Inner {
    active: HashMap<String, CorrelationData>,
    history: Vec<CorrelationData>,
}

/// Thread-safe correlation map. Clones share the same registry.
#[derive(Default)]
pub struct CorrelationRegistry {
    inner: Mutex<Inner>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a fresh correlation id.
    pub fn new_correlation_id(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let data = CorrelationData {
            correlation_id: id.clone(),
            start_time: Instant::now(),
            dependencies: Vec::new(),
        };
        self.inner.lock().active.insert(id.clone(), data);
        id
    }

    /// Append a dependency to an active entry. Unknown ids are ignored.
    pub fn note_dependency(&self, correlation_id: &str, dependency: impl Into<String>) {
        if let Some(data) = self.inner.lock().active.get_mut(correlation_id) {
            data.dependencies.push(dependency.into());
        }
    }

    /// Remove from the active map, retaining the entry in the history.
    pub fn remove(&self, correlation_id: &str) -> Option<CorrelationData> {
        let mut inner = self.inner.lock();
        let data = inner.active.remove(correlation_id)?;
        inner.history.push(data.clone());
        Some(data)
    }

    /// Evict active entries older than `max_lifetime`. Returns the evicted ids.
    pub fn reap_stale(&self, max_lifetime: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let stale: Vec<String> = inner
            .active
            .values()
            .filter(|d| now.duration_since(d.start_time) > max_lifetime)
            .map(|d| d.correlation_id.clone())
            .collect();
        for id in &stale {
            if let Some(data) = inner.active.remove(id) {
                inner.history.push(data);
            }
        }
        stale
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    pub fn dependencies_of(&self, correlation_id: &str) -> Option<Vec<String>> {
        let inner = self.inner.lock();
        inner
            .active
            .get(correlation_id)
            .or_else(|| {
                inner
                    .history
                    .iter()
                    .find(|d| d.correlation_id == correlation_id)
            })
            .map(|d| d.dependencies.clone())
    }
}

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;
