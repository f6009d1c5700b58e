// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DrawIO diagram conversion via the desktop binary's export mode.

use super::{error, payload_error, prepare_output_dir, resolve_source, ProcessContext, ScratchFile};
use crate::backend::ClaimedJob;
use crate::retry::run_with_retry;
use cb_adapters::CommandOutcome;
use cb_core::{DiagramPayload, WorkerErrorJson};
use tokio::process::Command;
use tracing::debug;

pub(crate) async fn process(
    job: &ClaimedJob,
    ctx: &ProcessContext,
) -> Result<serde_json::Value, WorkerErrorJson> {
    let payload: DiagramPayload = serde_json::from_value(job.payload.clone())
        .map_err(|e| payload_error(format!("bad drawio payload: {e}")))?;

    let binary = std::env::var("DRAWIO_EXECUTABLE").map_err(|_| {
        error(
            "ConfigurationError",
            "DRAWIO_EXECUTABLE environment variable not set",
        )
    })?;

    let source = resolve_source(&payload.data, &job.input_file, &ctx.workspace)?;
    prepare_output_dir(&job.output_file)?;

    let output_dir = job
        .output_file
        .parent()
        .ok_or_else(|| error("IoError", "output file has no parent directory"))?;
    let scratch = ScratchFile::write(output_dir, "diagram.drawio", &source)?;

    // Renderer crashes (V8) land in stderr with a nonzero exit; those are
    // retried because the diagram itself is usually fine.
    let retry = ctx.retry.with_retry_on_crash(true);

    let binary_for_cmd = binary.clone();
    let format = payload.output_format.clone();
    let input_path = scratch.path().to_path_buf();
    let output_path = job.output_file.clone();
    let outcome = run_with_retry(
        move || {
            let mut cmd = Command::new(&binary_for_cmd);
            cmd.arg("--export")
                .arg("--format")
                .arg(&format)
                .arg("--output")
                .arg(&output_path)
                .arg(&input_path);
            cmd
        },
        &retry,
        "drawio conversion",
    )
    .await;

    match outcome {
        CommandOutcome::Completed(output) if output.status.success() => {
            debug!(job_id = job.id, output = %job.output_file.display(), "drawio converted");
            Ok(serde_json::json!({
                "output_file": job.output_file.to_string_lossy(),
                "output_format": payload.output_format,
            }))
        }
        CommandOutcome::Completed(output) => Err(error(
            "DrawioError",
            format!(
                "Error converting DrawIO file:\n{}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        )),
        CommandOutcome::TimedOut { timeout } => Err(error(
            "SubprocessTimeout",
            format!("drawio conversion timed out after {}s", timeout.as_secs()),
        )),
        CommandOutcome::Crashed { output } => Err(error(
            "SubprocessCrash",
            format!(
                "Fatal error in drawio renderer\n{}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        )),
        CommandOutcome::SpawnFailed { error: e } => Err(error(
            "SpawnFailed",
            format!("drawio: command not found ({e})"),
        )),
    }
}
