// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job kinds, statuses, and the enqueue request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default retry bound for a job.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// The fixed taxonomy of work a worker can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Notebook,
    Plantuml,
    Drawio,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Notebook => "notebook",
            JobKind::Plantuml => "plantuml",
            JobKind::Drawio => "drawio",
        }
    }

    /// All kinds, in worker-pool configuration order.
    pub fn all() -> [JobKind; 3] {
        [JobKind::Notebook, JobKind::Plantuml, JobKind::Drawio]
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notebook" => Ok(JobKind::Notebook),
            "plantuml" => Ok(JobKind::Plantuml),
            "drawio" => Ok(JobKind::Drawio),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

/// Status of a job through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// Re-entering the same terminal state is allowed so that a second
    /// completion write is a no-op rather than an error.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Processing) => true,
            (JobStatus::Pending, JobStatus::Cancelled) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::Failed) => true,
            // reset_hung sends a processing job back to pending
            (JobStatus::Processing, JobStatus::Pending) => true,
            (a, b) if a.is_terminal() && *a == b => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Everything needed to enqueue one job.
///
/// The queue assigns the id; the planner fills in the rest from the course
/// model and the payload's content hash.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub kind: JobKind,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub content_hash: String,
    pub payload: serde_json::Value,
    pub priority: i64,
    pub correlation_id: Option<String>,
    pub max_attempts: u32,
}

impl JobSpec {
    pub fn new(
        kind: JobKind,
        input_path: PathBuf,
        output_path: PathBuf,
        content_hash: String,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            input_path,
            output_path,
            content_hash,
            payload,
            priority: 0,
            correlation_id: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
