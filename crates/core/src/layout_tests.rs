// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

#[test]
fn public_html_layout() {
    let dir = output_dir_for(
        Path::new("out"),
        "Rust Basics",
        Language::En,
        OutputFormat::Html,
        OutputKind::Completed,
    );
    assert_eq!(
        dir,
        Path::new("out/public/En/Rust Basics/Slides/Html/Completed")
    );
}

#[test]
fn speaker_outputs_are_private() {
    let dir = output_dir_for(
        Path::new("out"),
        "Rust Basics",
        Language::En,
        OutputFormat::Html,
        OutputKind::Speaker,
    );
    assert!(dir.starts_with("out/speaker"));
}

#[test]
fn german_fragments_are_localized() {
    let dir = output_dir_for(
        Path::new("out"),
        "Kurs",
        Language::De,
        OutputFormat::Html,
        OutputKind::Completed,
    );
    assert_eq!(dir, Path::new("out/public/De/Kurs/Folien/Html/Fertig"));
}

#[test]
fn course_names_are_sanitized() {
    let dir = output_dir_for(
        Path::new("out"),
        "C++: Advanced?",
        Language::En,
        OutputFormat::Code,
        OutputKind::Completed,
    );
    assert_eq!(
        dir,
        Path::new("out/public/En/C++- Advanced-/Slides/Code/Completed")
    );
}
