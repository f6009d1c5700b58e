// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PlantUML diagram conversion.
//!
//! Writes the diagram source next to the output, invokes the PlantUML jar,
//! and relies on PlantUML naming the artifact after the input stem.

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
        .map_err(|e| payload_error(format!("bad plantuml payload: {e}")))?;

    let jar = std::env::var("PLANTUML_JAR")
        .map_err(|_| error("ConfigurationError", "PLANTUML_JAR environment variable not set"))?;

    let source = resolve_source(&payload.data, &job.input_file, &ctx.workspace)?;
    prepare_output_dir(&job.output_file)?;

    let output_dir = job
        .output_file
        .parent()
        .ok_or_else(|| error("IoError", "output file has no parent directory"))?;
    let stem = job
        .output_file
        .file_stem()
        .ok_or_else(|| error("IoError", "output file has no stem"))?
        .to_string_lossy()
        .into_owned();

    // PlantUML names the artifact after the input file's stem.
    let scratch = ScratchFile::write(output_dir, &format!("{stem}.puml"), &source)?;

    let jar_for_cmd = jar.clone();
    let format = payload.output_format.clone();
    let input_path = scratch.path().to_path_buf();
    let out_dir = output_dir.to_path_buf();
    let outcome = run_with_retry(
        move || {
            let mut cmd = Command::new("java");
            cmd.arg("-jar")
                .arg(&jar_for_cmd)
                .arg(format!("-t{format}"))
                .arg("-o")
                .arg(&out_dir)
                .arg(&input_path);
            cmd
        },
        &ctx.retry,
        "plantuml conversion",
    )
    .await;

    match outcome {
        CommandOutcome::Completed(output) if output.status.success() => {
            debug!(job_id = job.id, output = %job.output_file.display(), "plantuml converted");
            Ok(serde_json::json!({
                "output_file": job.output_file.to_string_lossy(),
                "output_format": payload.output_format,
            }))
        }
        CommandOutcome::Completed(output) => Err(error(
            "PlantumlError",
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        )),
        CommandOutcome::TimedOut { timeout } => Err(error(
            "SubprocessTimeout",
            format!("plantuml conversion timed out after {}s", timeout.as_secs()),
        )),
        CommandOutcome::Crashed { .. } => {
            Err(error("SubprocessCrash", "plantuml process crashed"))
        }
        CommandOutcome::SpawnFailed { error: e } => Err(error(
            "SpawnFailed",
            format!("java: command not found ({e})"),
        )),
    }
}
