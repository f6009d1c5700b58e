// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn notebook_payload() -> NotebookPayload {
    NotebookPayload {
        data: "# %%\nprint('hi')\n".to_string(),
        language: Language::En,
        format: OutputFormat::Html,
        kind: OutputKind::Completed,
        prog_lang: "python".to_string(),
        fallback_execute: false,
        suppress_output: false,
        correlation_id: Some("cid-7".to_string()),
        input_file: "slides/week1/intro.py".to_string(),
        input_file_name: "intro.py".to_string(),
        output_file: "out/public/En/Course/Slides/Html/Completed/01 Intro.html".to_string(),
    }
}

fn diagram_payload(data: &str, format: &str) -> DiagramPayload {
    DiagramPayload {
        data: data.to_string(),
        output_format: format.to_string(),
        correlation_id: None,
        input_file: "img/arch.pu".to_string(),
        input_file_name: "arch.pu".to_string(),
        output_file: "img/arch.png".to_string(),
    }
}

#[test]
fn notebook_hash_is_stable() {
    assert_eq!(
        notebook_payload().content_hash(),
        notebook_payload().content_hash()
    );
}

#[test]
fn notebook_hash_discriminates_kind_and_language() {
    let base = notebook_payload();

    let mut other_kind = base.clone();
    other_kind.kind = OutputKind::Speaker;
    assert_ne!(base.content_hash(), other_kind.content_hash());

    let mut other_lang = base.clone();
    other_lang.language = Language::De;
    assert_ne!(base.content_hash(), other_lang.content_hash());
}

#[test]
fn execution_hash_is_shared_across_format_and_kind() {
    // The cache-populating speaker run and the completed consumer must
    // agree on the intermediate-cache key.
    let speaker = NotebookPayload {
        format: OutputFormat::Html,
        kind: OutputKind::Speaker,
        ..notebook_payload()
    };
    let completed = NotebookPayload {
        format: OutputFormat::Html,
        kind: OutputKind::Completed,
        ..notebook_payload()
    };
    assert_ne!(speaker.content_hash(), completed.content_hash());
    assert_eq!(speaker.execution_hash(), completed.execution_hash());
}

#[test]
fn execution_hash_discriminates_language_and_source() {
    let base = notebook_payload();

    let mut other_lang = base.clone();
    other_lang.language = Language::De;
    assert_ne!(base.execution_hash(), other_lang.execution_hash());

    let mut other_source = base.clone();
    other_source.data.push_str("# %%\nprint('more')\n");
    assert_ne!(base.execution_hash(), other_source.execution_hash());

    let mut other_prog_lang = base.clone();
    other_prog_lang.prog_lang = "cpp".to_string();
    assert_ne!(base.execution_hash(), other_prog_lang.execution_hash());
}

#[test]
fn notebook_hash_ignores_output_path() {
    // The output path places the artifact; it must not invalidate the cache.
    let base = notebook_payload();
    let mut moved = base.clone();
    moved.output_file = "elsewhere.html".to_string();
    assert_eq!(base.content_hash(), moved.content_hash());
}

#[test]
fn diagram_hash_discriminates_output_format() {
    let png = diagram_payload("@startuml\n@enduml", "png");
    let svg = diagram_payload("@startuml\n@enduml", "svg");
    assert_ne!(png.content_hash(), svg.content_hash());
}

#[test]
fn same_source_different_converter_hashes_differently() {
    let data = "<mxfile/>";
    let pu = JobPayload::Plantuml(diagram_payload(data, "png"));
    let dw = JobPayload::Drawio(diagram_payload(data, "png"));
    assert_ne!(pu.content_hash(), dw.content_hash());
}

#[test]
fn payload_round_trips_through_json() {
    let payload = JobPayload::Notebook(notebook_payload());
    let value = payload.to_value().unwrap();
    let back = JobPayload::from_value(JobKind::Notebook, value).unwrap();
    assert_eq!(payload, back);
}

#[test]
fn payload_kind_matches_variant() {
    assert_eq!(
        JobPayload::Plantuml(diagram_payload("x", "png")).kind(),
        JobKind::Plantuml
    );
    assert_eq!(
        JobPayload::Notebook(notebook_payload()).kind(),
        JobKind::Notebook
    );
}

#[test]
fn hash_content_varies_with_tags() {
    let a = hash_content(b"data", &["html", "speaker"]);
    let b = hash_content(b"data", &["html", "completed"]);
    assert_ne!(a, b);
}
