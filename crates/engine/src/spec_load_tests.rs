// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn write_spec(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("course.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn seed_topic(dir: &TempDir, topic: &str, files: &[&str]) {
    let topic_dir = dir.path().join(topic);
    std::fs::create_dir_all(&topic_dir).unwrap();
    for file in files {
        let path = topic_dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "content").unwrap();
    }
}

const BASIC_SPEC: &str = r#"
name = "Rust Basics"
prog_lang = "python"

[[sections]]
name = "Week 1"
topics = ["slides/week1"]
"#;

#[test]
fn loads_sections_topics_and_files() {
    let dir = TempDir::new().unwrap();
    seed_topic(
        &dir,
        "slides/week1",
        &["slides_intro.py", "slides_types.py", "img/arch.pu", "data.csv"],
    );
    let spec = write_spec(&dir, BASIC_SPEC);

    let model = load_course_model(&spec, dir.path(), Path::new("out")).unwrap();
    assert_eq!(model.name, "Rust Basics");
    assert_eq!(model.sections.len(), 1);
    assert_eq!(model.topics.len(), 1);
    assert_eq!(model.files.len(), 4);

    let notebooks: Vec<_> = model.files.iter().filter(|f| f.is_notebook()).collect();
    assert_eq!(notebooks.len(), 2);
    assert_eq!(notebooks[0].number_in_topic, 1);
    assert_eq!(notebooks[1].number_in_topic, 2);

    let diagram = model
        .file_for_path(Path::new("slides/week1/img/arch.pu"))
        .unwrap();
    assert_eq!(diagram.kind, FileKind::Diagram(DiagramKind::Plantuml));
    assert_eq!(diagram.execution_stage, DIAGRAM_STAGE);

    let data = model.file_for_path(Path::new("slides/week1/data.csv")).unwrap();
    assert_eq!(data.kind, FileKind::DataFile);
}

#[test]
fn notebooks_run_after_diagrams() {
    let dir = TempDir::new().unwrap();
    seed_topic(&dir, "slides/week1", &["slides_a.py", "img/d.drawio"]);
    let spec = write_spec(&dir, BASIC_SPEC);

    let model = load_course_model(&spec, dir.path(), Path::new("out")).unwrap();
    assert_eq!(model.stages(), vec![DIAGRAM_STAGE, NOTEBOOK_STAGE]);
}

#[test]
fn missing_spec_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let err = load_course_model(
        &dir.path().join("absent.toml"),
        dir.path(),
        Path::new("out"),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::SpecRead { .. }));
}

#[test]
fn invalid_toml_is_a_spec_error() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(&dir, "name = [unclosed");
    let err = load_course_model(&spec, dir.path(), Path::new("out")).unwrap_err();
    assert!(matches!(err, EngineError::SpecInvalid { .. }));
}

#[test]
fn missing_topic_directory_is_tolerated() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(&dir, BASIC_SPEC);
    let model = load_course_model(&spec, dir.path(), Path::new("out")).unwrap();
    assert_eq!(model.topics.len(), 1);
    assert!(model.files.is_empty());
}

#[test]
fn spec_without_targets_gets_a_defaulted_target() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(&dir, BASIC_SPEC);
    let model = load_course_model(&spec, dir.path(), Path::new("fallback-out")).unwrap();

    assert_eq!(model.output_targets.len(), 1);
    let target = &model.output_targets[0];
    assert!(!target.is_explicit);
    assert_eq!(target.output_root, Path::new("fallback-out"));
    assert_eq!(target.languages.len(), 2);
}

#[test]
fn declared_targets_are_explicit_with_their_filters() {
    let dir = TempDir::new().unwrap();
    let spec = write_spec(
        &dir,
        r#"
name = "C"

[[targets]]
name = "public"
output_root = "public-out"
languages = ["en"]
formats = ["html"]
kinds = ["completed", "code-along"]
"#,
    );
    let model = load_course_model(&spec, dir.path(), Path::new("out")).unwrap();

    assert_eq!(model.output_targets.len(), 1);
    let target = &model.output_targets[0];
    assert!(target.is_explicit);
    assert_eq!(target.languages, vec![Language::En]);
    assert_eq!(target.formats, vec![OutputFormat::Html]);
    assert_eq!(
        target.kinds,
        vec![OutputKind::Completed, OutputKind::CodeAlong]
    );
}

#[test]
fn classify_recognizes_diagrams_and_slides() {
    assert_eq!(
        classify_file_name(Path::new("a/arch.puml"), "python"),
        Some(FileKind::Diagram(DiagramKind::Plantuml))
    );
    assert_eq!(
        classify_file_name(Path::new("a/arch.drawio"), "python"),
        Some(FileKind::Diagram(DiagramKind::Drawio))
    );
    assert_eq!(
        classify_file_name(Path::new("a/slides_intro.py"), "python"),
        Some(FileKind::Notebook {
            prog_lang: "python".to_string()
        })
    );
    // Wrong extension for the course language: plain data.
    assert_eq!(
        classify_file_name(Path::new("a/slides_intro.py"), "cpp"),
        Some(FileKind::DataFile)
    );
    assert_eq!(
        classify_file_name(Path::new("a/notes.txt"), "python"),
        Some(FileKind::DataFile)
    );
}
