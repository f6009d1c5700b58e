// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notebook transformation.
//!
//! The actual execution and rendering engine is an external tool invoked per
//! job:
//!
//! ```text
//! cb-notebook-processor --source <file> --output <file> \
//!     --format <html|notebook|code> --kind <code-along|completed|speaker> \
//!     --language <de|en> --prog-lang <lang> \
//!     [--execute] [--executed-in <file>] [--executed-out <file>]
//! ```
//!
//! This module owns the cache choreography around it: speaker HTML executes
//! and populates the executed-notebook cache, completed HTML consumes it
//! (falling back to direct execution when allowed), and suppressed outputs
//! execute without leaving an artifact on disk.

use super::{error, payload_error, prepare_output_dir, resolve_source, ProcessContext, ScratchFile};
use crate::backend::ClaimedJob;
use crate::retry::{run_with_retry, RetryPolicy};
use cb_adapters::{CommandOutcome, NOTEBOOK_TIMEOUT};
use cb_core::{
    execution_requirement, hash_content, ExecutionRequirement, NotebookPayload, WorkerErrorJson,
};
use cb_storage::ExecutedNotebookKey;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

pub(crate) async fn process(
    job: &ClaimedJob,
    ctx: &ProcessContext,
) -> Result<serde_json::Value, WorkerErrorJson> {
    let payload: NotebookPayload = serde_json::from_value(job.payload.clone())
        .map_err(|e| payload_error(format!("bad notebook payload: {e}")))?;

    let source = resolve_source(&payload.data, &job.input_file, &ctx.workspace)?;
    let requirement = execution_requirement(payload.format, payload.kind);

    // The intermediate cache is keyed on the execution-scoped hash, not the
    // job's content hash: the latter folds in format and kind, which would
    // split the populating speaker run from its completed consumer. Hashing
    // the resolved source matches [`NotebookPayload::execution_hash`] for
    // planner-built payloads and stays correct for bare jobs that reference
    // the file on disk.
    let key = ExecutedNotebookKey {
        input_file: job.input_file.clone(),
        content_hash: hash_content(
            source.as_bytes(),
            &[payload.language.as_str(), &payload.prog_lang],
        ),
        language: payload.language.as_str().to_string(),
        prog_lang: payload.prog_lang.clone(),
    };

    // Cached execution state to feed in, if this output consumes the cache.
    let mut executed_in: Option<String> = None;
    let mut cache_hit = false;
    if requirement == ExecutionRequirement::ReusesCache {
        if let Some(cache) = &ctx.exec_cache {
            match cache.get(&key) {
                Ok(Some(state)) => {
                    debug!(job_id = job.id, "executed-notebook cache hit");
                    executed_in = Some(state);
                    cache_hit = true;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(job_id = job.id, error = %e, "executed-notebook cache read failed");
                }
            }
        }
        if executed_in.is_none() && !payload.fallback_execute {
            return Err(error(
                "ExecutionCacheMiss",
                format!(
                    "no cached execution for {} ({}, {}) and fallback execution is disabled",
                    job.input_file.display(),
                    payload.language,
                    payload.prog_lang
                ),
            ));
        }
    }

    let must_execute = match requirement {
        ExecutionRequirement::PopulatesCache => true,
        ExecutionRequirement::ReusesCache => !cache_hit,
        ExecutionRequirement::None => false,
    };

    prepare_output_dir(&job.output_file)?;
    let output_dir = job
        .output_file
        .parent()
        .ok_or_else(|| error("IoError", "output file has no parent directory"))?;

    let scratch_source = ScratchFile::write(output_dir, &payload.input_file_name, &source)?;
    let scratch_executed_in = match &executed_in {
        Some(state) => Some(ScratchFile::write(output_dir, "executed-in.json", state)?),
        None => None,
    };
    let executed_out_path = if requirement == ExecutionRequirement::PopulatesCache {
        Some(output_dir.join(format!("executed-out-{}.json", job.id)))
    } else {
        None
    };

    let invocation = Invocation {
        processor: ctx.notebook_processor.clone(),
        source: scratch_source.path().to_path_buf(),
        output: (!payload.suppress_output).then(|| job.output_file.clone()),
        payload: payload.clone(),
        execute: must_execute,
        executed_in: scratch_executed_in.as_ref().map(|s| s.path().to_path_buf()),
        executed_out: executed_out_path.clone(),
    };
    let outcome = run_with_retry(
        move || invocation.command(),
        &RetryPolicy::new(NOTEBOOK_TIMEOUT),
        "notebook processing",
    )
    .await;

    let result = handle_outcome(job, &payload, outcome)?;

    // Populate the intermediate cache from the processor's executed state.
    if let (Some(path), Some(cache)) = (&executed_out_path, &ctx.exec_cache) {
        match std::fs::read_to_string(path) {
            Ok(state) => {
                if let Err(e) = cache.put(&key, &state) {
                    tracing::warn!(job_id = job.id, error = %e, "executed-notebook cache write failed");
                }
            }
            Err(e) => {
                tracing::warn!(job_id = job.id, error = %e, "processor produced no executed state");
            }
        }
        let _ = std::fs::remove_file(path);
    }

    if payload.suppress_output {
        info!(
            job_id = job.id,
            input = %job.input_file.display(),
            "implicit execution completed; artifact suppressed"
        );
    }

    Ok(result)
}

struct Invocation {
    processor: String,
    source: PathBuf,
    output: Option<PathBuf>,
    payload: NotebookPayload,
    execute: bool,
    executed_in: Option<PathBuf>,
    executed_out: Option<PathBuf>,
}

impl Invocation {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.processor);
        cmd.arg("--source")
            .arg(&self.source)
            .arg("--format")
            .arg(self.payload.format.as_str())
            .arg("--kind")
            .arg(self.payload.kind.as_str())
            .arg("--language")
            .arg(self.payload.language.as_str())
            .arg("--prog-lang")
            .arg(&self.payload.prog_lang);
        match &self.output {
            Some(path) => {
                cmd.arg("--output").arg(path);
            }
            None => {
                cmd.arg("--no-write");
            }
        }
        if self.execute {
            cmd.arg("--execute");
        }
        if let Some(path) = &self.executed_in {
            cmd.arg("--executed-in").arg(path);
        }
        if let Some(path) = &self.executed_out {
            cmd.arg("--executed-out").arg(path);
        }
        cmd
    }
}

fn handle_outcome(
    job: &ClaimedJob,
    payload: &NotebookPayload,
    outcome: CommandOutcome,
) -> Result<serde_json::Value, WorkerErrorJson> {
    match outcome {
        CommandOutcome::Completed(output) if output.status.success() => {
            debug!(job_id = job.id, output = %job.output_file.display(), "notebook processed");
            Ok(serde_json::json!({
                "output_file": job.output_file.to_string_lossy(),
                "format": payload.format.as_str(),
                "kind": payload.kind.as_str(),
                "language": payload.language.as_str(),
                "suppressed": payload.suppress_output,
            }))
        }
        CommandOutcome::Completed(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // The processor reports cell failures as structured JSON on
            // stderr when it can; pass it through verbatim.
            match serde_json::from_str::<WorkerErrorJson>(stderr.trim()) {
                Ok(structured) => Err(structured),
                Err(_) => Err(error("NotebookError", stderr.trim().to_string())),
            }
        }
        CommandOutcome::TimedOut { timeout } => Err(error(
            "SubprocessTimeout",
            format!("notebook processing timed out after {}s", timeout.as_secs()),
        )),
        CommandOutcome::Crashed { .. } => {
            Err(error("SubprocessCrash", "notebook processor crashed"))
        }
        CommandOutcome::SpawnFailed { error: e } => Err(error(
            "SpawnFailed",
            format!("notebook processor not found ({e})"),
        )),
    }
}
