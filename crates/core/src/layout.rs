// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output directory layout.
//!
//! `<output_root>/{public|speaker}/<LangDir>/<CourseDir>/<SlidesDir>/<Format>/<Kind>/…`
//!
//! Directory fragments are localized: German outputs use German directory
//! names so the published tree reads naturally in either language.

use crate::target::{Language, OutputFormat, OutputKind};
use std::path::{Path, PathBuf};

fn lang_dir(lang: Language) -> &'static str {
    match lang {
        Language::De => "De",
        Language::En => "En",
    }
}

fn slides_dir(lang: Language) -> &'static str {
    match lang {
        Language::De => "Folien",
        Language::En => "Slides",
    }
}

fn format_dir(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Html => "Html",
        OutputFormat::Notebook => "Notebooks",
        OutputFormat::Code => "Code",
    }
}

fn kind_dir(kind: OutputKind, lang: Language) -> &'static str {
    match (kind, lang) {
        (OutputKind::CodeAlong, Language::De) => "Code-Along",
        (OutputKind::CodeAlong, Language::En) => "Code-Along",
        (OutputKind::Completed, Language::De) => "Fertig",
        (OutputKind::Completed, Language::En) => "Completed",
        (OutputKind::Speaker, _) => "Speaker",
    }
}

/// Replace characters that are unsafe in published file names.
fn sanitize_dir_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect()
}

/// Directory that receives artifacts for one `(language, format, kind)`.
///
/// Speaker outputs land under the private `speaker/` tree, everything else
/// under `public/`.
pub fn output_dir_for(
    output_root: &Path,
    course_name: &str,
    lang: Language,
    format: OutputFormat,
    kind: OutputKind,
) -> PathBuf {
    let toplevel = if kind.is_speaker() { "speaker" } else { "public" };
    output_root
        .join(toplevel)
        .join(lang_dir(lang))
        .join(sanitize_dir_name(course_name))
        .join(slides_dir(lang))
        .join(format_dir(format))
        .join(kind_dir(kind, lang))
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
