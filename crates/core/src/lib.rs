// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Core domain types for coursebuild: jobs, payloads, the course model,
//! output targets, and error classification. No I/O lives here.

mod classify;
mod correlation;
mod course;
mod error;
mod exec_deps;
mod job;
mod layout;
mod payload;
mod progress;
mod target;

pub use classify::{ErrorClassifier, WorkerErrorJson};
pub use correlation::{CorrelationData, CorrelationRegistry, STALE_CID_MAX_LIFETIME};
pub use course::{
    CourseFile, CourseModel, DiagramKind, DirGroup, FileId, FileKind, Section, SectionId, Topic,
    TopicId,
};
pub use error::{BuildError, ErrorType, Severity};
pub use exec_deps::{
    collect_requested_outputs, execution_requirement, resolve_implicit_executions,
    ExecutionRequirement, OutputTriple,
};
pub use job::{JobKind, JobSpec, JobStatus, DEFAULT_MAX_ATTEMPTS};
pub use layout::output_dir_for;
pub use payload::{hash_content, ContentHashed, DiagramPayload, JobPayload, NotebookPayload};
pub use progress::BuildProgress;
pub use target::{effective_targets, Language, OutputFormat, OutputKind, OutputTarget, TargetFilter};
