// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kind-specific job processors.
//!
//! The heavy lifting (notebook execution and rendering, diagram
//! rasterization) lives in external tools; processors prepare inputs,
//! invoke the tool with the retry policy, place the artifact, and maintain
//! the executed-notebook cache. Failures are reported as structured
//! [`WorkerErrorJson`] values that the host-side classifier understands.

mod drawio;
mod notebook;
mod plantuml;

use crate::backend::ClaimedJob;
use crate::retry::RetryPolicy;
use cb_core::{JobKind, WorkerErrorJson};
use cb_storage::ExecutedNotebookCache;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Shared state for processors within one worker process.
pub struct ProcessContext {
    /// Root of the authoring workspace (inputs resolve against this).
    pub workspace: PathBuf,
    /// Executed-notebook intermediate cache. Absent for container workers,
    /// which cannot reach the companion database file.
    pub exec_cache: Option<ExecutedNotebookCache>,
    /// Notebook processor binary (default `cb-notebook-processor`).
    pub notebook_processor: String,
    pub retry: RetryPolicy,
}

impl ProcessContext {
    pub fn new(workspace: PathBuf, exec_cache: Option<ExecutedNotebookCache>) -> Self {
        Self {
            workspace,
            exec_cache,
            notebook_processor: std::env::var("CB_NOTEBOOK_PROCESSOR")
                .unwrap_or_else(|_| "cb-notebook-processor".to_string()),
            retry: RetryPolicy::new(cb_adapters::DIAGRAM_TIMEOUT),
        }
    }
}

/// Process one claimed job. The returned value becomes the job's
/// `result` column.
pub async fn process_job(
    job: &ClaimedJob,
    ctx: &ProcessContext,
) -> Result<serde_json::Value, WorkerErrorJson> {
    match job.kind {
        JobKind::Notebook => notebook::process(job, ctx).await,
        JobKind::Plantuml => plantuml::process(job, ctx).await,
        JobKind::Drawio => drawio::process(job, ctx).await,
    }
}

pub(crate) fn payload_error(message: impl Into<String>) -> WorkerErrorJson {
    WorkerErrorJson {
        error_class: "InvalidPayload".to_string(),
        error_message: message.into(),
        cell_index: None,
        line: None,
        code_snippet: None,
    }
}

pub(crate) fn error(class: &str, message: impl Into<String>) -> WorkerErrorJson {
    WorkerErrorJson {
        error_class: class.to_string(),
        error_message: message.into(),
        cell_index: None,
        line: None,
        code_snippet: None,
    }
}

/// Resolve the job's source text: prefer the payload's inline data, fall
/// back to reading the input file from the workspace.
pub(crate) fn resolve_source(
    data: &str,
    input_file: &Path,
    workspace: &Path,
) -> Result<String, WorkerErrorJson> {
    if !data.is_empty() {
        return Ok(data.to_string());
    }
    let path = if input_file.is_absolute() {
        input_file.to_path_buf()
    } else {
        workspace.join(input_file)
    };
    std::fs::read_to_string(&path).map_err(|_| {
        error(
            "FileNotFoundError",
            format!("Input file not found: {}", path.display()),
        )
    })
}

/// A scratch file that is removed on drop.
pub(crate) struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn write(dir: &Path, file_name: &str, contents: &str) -> Result<Self, WorkerErrorJson> {
        let scratch_dir = dir.join(format!("cb-scratch-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&scratch_dir)
            .map_err(|e| error("IoError", format!("cannot create scratch dir: {e}")))?;
        let path = scratch_dir.join(file_name);
        std::fs::write(&path, contents)
            .map_err(|e| error("IoError", format!("cannot write scratch file: {e}")))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(dir) = self.path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

/// Ensure the artifact's parent directory exists.
pub(crate) fn prepare_output_dir(output_file: &Path) -> Result<(), WorkerErrorJson> {
    if let Some(parent) = output_file.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| error("IoError", format!("cannot create output dir: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
