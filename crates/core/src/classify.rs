// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic classification of raw worker errors.
//!
//! Workers serialize failures as JSON (`error_class`, `error_message`,
//! optional cell/line context); older paths hand over bare strings. The
//! classifier maps either form to a [`BuildError`] with a disjoint category
//! and the guidance string shown to the user. All guidance text lives here.

use crate::error::{BuildError, ErrorType, Severity};
use crate::job::JobKind;
use std::path::PathBuf;

/// Structured error payload posted by workers on job failure.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorkerErrorJson {
    pub error_class: String,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

/// Maps raw worker errors to the user-facing taxonomy.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a failed job's error payload.
    ///
    /// `raw_error` is either the worker's JSON error structure or a plain
    /// message string.
    pub fn classify_job_error(kind: JobKind, input_file: &str, raw_error: &str) -> BuildError {
        let (message, error_class, details) = match serde_json::from_str::<WorkerErrorJson>(
            raw_error,
        ) {
            Ok(parsed) => {
                let details = serde_json::to_value(&parsed).ok();
                (parsed.error_message, Some(parsed.error_class), details)
            }
            Err(_) => (raw_error.to_string(), None, None),
        };

        let lower = message.to_lowercase();
        let class_lower = error_class.as_deref().unwrap_or("").to_lowercase();

        // Input-file problems are checked before tool-missing patterns:
        // "Input file not found" must never read as a missing converter.
        if lower.contains("input file not found") || class_lower == "filenotfounderror" {
            return BuildError {
                error_type: ErrorType::User,
                category: "missing_input".to_string(),
                severity: Severity::Error,
                file_path: Some(PathBuf::from(input_file)),
                message,
                actionable_guidance:
                    "Check that the input file exists and its path in the course spec is correct."
                        .to_string(),
                details,
            };
        }

        let mut error = match kind {
            JobKind::Drawio => classify_drawio(&lower),
            JobKind::Plantuml => classify_plantuml(&lower),
            JobKind::Notebook => classify_notebook(&lower),
        };

        error.file_path = Some(PathBuf::from(input_file));
        error.message = message;
        error.details = details;
        error
    }

    /// Classify a host-side infrastructure condition (not tied to one job).
    pub fn classify_infrastructure(category: &str, message: impl Into<String>) -> BuildError {
        let (severity, guidance) = match category {
            "no_workers" => (
                Severity::Fatal,
                "No workers are registered for a required job kind. Start workers or enable auto_start in the worker configuration.",
            ),
            "queue_unavailable" => (
                Severity::Fatal,
                "The jobs database could not be opened. Check the --jobs-db-path and file permissions.",
            ),
            _ => (
                Severity::Error,
                "An internal component failed. Re-run with --log-level debug for details.",
            ),
        };
        BuildError {
            error_type: ErrorType::Infrastructure,
            category: category.to_string(),
            severity,
            file_path: None,
            message: message.into(),
            actionable_guidance: guidance.to_string(),
            details: None,
        }
    }
}

fn skeleton(error_type: ErrorType, category: &str, guidance: &str) -> BuildError {
    BuildError {
        error_type,
        category: category.to_string(),
        severity: Severity::Error,
        file_path: None,
        message: String::new(),
        actionable_guidance: guidance.to_string(),
        details: None,
    }
}

fn is_timeout(lower: &str) -> bool {
    lower.contains("timed out") || lower.contains("timeout")
}

fn classify_drawio(lower: &str) -> BuildError {
    // V8/Electron crashes come from the renderer, not the diagram.
    if lower.contains("disallowjavascriptexecutionscope")
        || lower.contains("fatal error in")
        || lower.contains("v8 ")
        || lower.contains("segmentation fault")
    {
        return skeleton(
            ErrorType::Infrastructure,
            "drawio_crash",
            "The DrawIO renderer crashed; this is usually transient. Re-run the build, and reduce diagram complexity if it persists.",
        );
    }
    if lower.contains("drawio_executable")
        || (lower.contains("drawio") && lower.contains("command not found"))
        || (lower.contains("drawio") && lower.contains("no such file or directory"))
    {
        return skeleton(
            ErrorType::Configuration,
            "missing_drawio",
            "Install DrawIO desktop and set DRAWIO_EXECUTABLE to the binary path.",
        );
    }
    if is_timeout(lower) {
        return skeleton(
            ErrorType::Infrastructure,
            "subprocess_timeout",
            "The DrawIO conversion timed out. Re-run the build; the timeout backs off automatically on retry.",
        );
    }
    skeleton(
        ErrorType::User,
        "drawio_processing",
        "Check your DrawIO diagram for errors and re-export it from the editor.",
    )
}

fn classify_plantuml(lower: &str) -> BuildError {
    if lower.contains("plantuml_jar")
        || lower.contains("unable to access jarfile")
        || (lower.contains("java") && lower.contains("command not found"))
    {
        return skeleton(
            ErrorType::Configuration,
            "missing_plantuml",
            "Install Java and set PLANTUML_JAR to the plantuml.jar path.",
        );
    }
    if lower.contains("syntax error") {
        return skeleton(
            ErrorType::User,
            "plantuml_syntax",
            "Fix the PlantUML syntax error reported in the diagram source.",
        );
    }
    if is_timeout(lower) {
        return skeleton(
            ErrorType::Infrastructure,
            "subprocess_timeout",
            "The PlantUML conversion timed out. Re-run the build; the timeout backs off automatically on retry.",
        );
    }
    skeleton(
        ErrorType::User,
        "plantuml_processing",
        "Check the PlantUML diagram source for errors.",
    )
}

fn classify_notebook(lower: &str) -> BuildError {
    if lower.contains("modulenotfounderror") || lower.contains("no module named") {
        return skeleton(
            ErrorType::User,
            "missing_module",
            "The notebook imports a module that is not installed in the execution environment. Add it to the course requirements.",
        );
    }
    if lower.contains("syntaxerror")
        || lower.contains("nameerror")
        || lower.contains("undefined name")
        || lower.contains("compilation failed")
    {
        return skeleton(
            ErrorType::User,
            "notebook_compilation",
            "Fix the reported error in the notebook cell; the cell index and snippet are attached.",
        );
    }
    if lower.contains("kernel") && (lower.contains("not found") || lower.contains("died")) {
        return skeleton(
            ErrorType::Configuration,
            "missing_kernel",
            "The notebook kernel is unavailable. Install the kernel for the course's programming language.",
        );
    }
    if is_timeout(lower) {
        return skeleton(
            ErrorType::Infrastructure,
            "subprocess_timeout",
            "Notebook execution timed out. Re-run the build; the timeout backs off automatically on retry.",
        );
    }
    skeleton(
        ErrorType::User,
        "notebook_execution",
        "A cell raised during execution; see the attached context.",
    )
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
