// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn missing_drawio_executable_is_configuration() {
    let error = ErrorClassifier::classify_job_error(
        JobKind::Drawio,
        "test.drawio",
        "DRAWIO_EXECUTABLE environment variable not set",
    );
    assert_eq!(error.error_type, ErrorType::Configuration);
    assert_eq!(error.category, "missing_drawio");
    assert!(error.actionable_guidance.contains("DRAWIO_EXECUTABLE"));
}

#[test]
fn drawio_command_not_found_is_configuration() {
    let error = ErrorClassifier::classify_job_error(
        JobKind::Drawio,
        "test.drawio",
        "drawio: command not found",
    );
    assert_eq!(error.error_type, ErrorType::Configuration);
    assert_eq!(error.category, "missing_drawio");
}

#[test]
fn input_file_not_found_is_not_missing_drawio() {
    // "not found" alone is too broad a pattern: a missing input file must
    // point the user at the file, not at installing DrawIO.
    let error = ErrorClassifier::classify_job_error(
        JobKind::Drawio,
        "test.drawio",
        r"Input file not found: C:\Users\tc\file.drawio",
    );
    assert_ne!(error.category, "missing_drawio");
    assert_eq!(error.error_type, ErrorType::User);
    assert!(!error.actionable_guidance.contains("DRAWIO_EXECUTABLE"));
}

#[test]
fn file_not_found_error_class_is_not_missing_drawio() {
    let raw = r#"{"error_message": "Input file not found: /source/file.drawio", "error_class": "FileNotFoundError"}"#;
    let error = ErrorClassifier::classify_job_error(JobKind::Drawio, "test.drawio", raw);
    assert_ne!(error.category, "missing_drawio");
    assert_eq!(error.category, "missing_input");
}

#[test]
fn drawio_conversion_error_is_user() {
    let error = ErrorClassifier::classify_job_error(
        JobKind::Drawio,
        "test.drawio",
        "Error converting DrawIO file: invalid XML",
    );
    assert_eq!(error.error_type, ErrorType::User);
    assert_eq!(error.category, "drawio_processing");
}

#[test]
fn v8_crash_is_infrastructure() {
    let error = ErrorClassifier::classify_job_error(
        JobKind::Drawio,
        "test.drawio",
        "Error converting DrawIO file:\nFatal error in , line 0\nInvoke in DisallowJavascriptExecutionScope",
    );
    assert_eq!(error.error_type, ErrorType::Infrastructure);
    assert_eq!(error.category, "drawio_crash");
    let guidance = error.actionable_guidance.to_lowercase();
    assert!(guidance.contains("crash") || guidance.contains("transient"));
}

#[test]
fn missing_plantuml_jar_is_configuration() {
    let error = ErrorClassifier::classify_job_error(
        JobKind::Plantuml,
        "test.puml",
        "PLANTUML_JAR environment variable not set",
    );
    assert_eq!(error.error_type, ErrorType::Configuration);
    assert_eq!(error.category, "missing_plantuml");
}

#[test]
fn input_file_not_found_is_not_missing_plantuml() {
    let error = ErrorClassifier::classify_job_error(
        JobKind::Plantuml,
        "test.puml",
        "Input file not found: /path/to/test.puml",
    );
    assert_ne!(error.category, "missing_plantuml");
}

#[test]
fn plantuml_syntax_error_is_user() {
    let error = ErrorClassifier::classify_job_error(
        JobKind::Plantuml,
        "test.puml",
        "Syntax Error on line 4",
    );
    assert_eq!(error.error_type, ErrorType::User);
    assert_eq!(error.category, "plantuml_syntax");
}

#[parameterized(
    syntax = { "SyntaxError: invalid syntax", "notebook_compilation" },
    name = { "NameError: name 'foo' is not defined", "notebook_compilation" },
    module = { "ModuleNotFoundError: No module named 'nonexistent'", "missing_module" },
)]
fn notebook_author_errors_are_user(message: &str, category: &str) {
    let error = ErrorClassifier::classify_job_error(JobKind::Notebook, "test.ipynb", message);
    assert_eq!(error.error_type, ErrorType::User);
    assert_eq!(error.category, category);
}

#[test]
fn structured_error_keeps_cell_context_in_details() {
    let raw = r#"{"error_class": "NameError", "error_message": "NameError: name 'x' is not defined", "cell_index": 12, "code_snippet": "print(x)"}"#;
    let error = ErrorClassifier::classify_job_error(JobKind::Notebook, "test.ipynb", raw);
    assert_eq!(error.category, "notebook_compilation");
    let details = error.details.unwrap();
    assert_eq!(details["cell_index"], 12);
    assert_eq!(details["code_snippet"], "print(x)");
}

#[parameterized(
    drawio = { JobKind::Drawio },
    plantuml = { JobKind::Plantuml },
    notebook = { JobKind::Notebook },
)]
fn timeouts_are_infrastructure(kind: JobKind) {
    let error = ErrorClassifier::classify_job_error(
        kind,
        "input",
        "conversion timed out after 30s",
    );
    assert_eq!(error.error_type, ErrorType::Infrastructure);
    assert_eq!(error.category, "subprocess_timeout");
}

#[test]
fn no_workers_is_fatal_infrastructure() {
    let error =
        ErrorClassifier::classify_infrastructure("no_workers", "no workers registered for kind notebook");
    assert_eq!(error.error_type, ErrorType::Infrastructure);
    assert_eq!(error.severity, Severity::Fatal);
    assert!(error.is_fatal());
}

#[test]
fn classification_is_deterministic() {
    let a = ErrorClassifier::classify_job_error(JobKind::Drawio, "d.drawio", "weird failure");
    let b = ErrorClassifier::classify_job_error(JobKind::Drawio, "d.drawio", "weird failure");
    assert_eq!(a.category, b.category);
    assert_eq!(a.error_type, b.error_type);
}
