// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Course spec ingestion.
//!
//! Reads the declarative TOML course spec, scans the declared topic
//! directories, and assembles the [`CourseModel`] arena the planner
//! consumes. File classification is by name: `slides_*` sources become
//! notebooks, PlantUML/drawio extensions become diagrams, everything else is
//! static data. Diagrams occupy stage 0 so their images exist before any
//! notebook renders; notebooks follow at stage 1.

use crate::error::EngineError;
use cb_core::{
    CourseModel, DiagramKind, DirGroup, FileKind, Language, OutputFormat, OutputKind, OutputTarget,
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DIAGRAM_STAGE: u32 = 0;
pub const NOTEBOOK_STAGE: u32 = 1;

#[derive(Debug, Deserialize)]
struct CourseSpecToml {
    name: String,
    #[serde(default = "default_prog_lang")]
    prog_lang: String,
    #[serde(default)]
    sections: Vec<SectionToml>,
    #[serde(default)]
    dir_groups: Vec<DirGroupToml>,
    #[serde(default)]
    targets: Vec<TargetToml>,
}

fn default_prog_lang() -> String {
    "python".to_string()
}

#[derive(Debug, Deserialize)]
struct SectionToml {
    name: String,
    /// Topic directories relative to the data dir, in course order.
    topics: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DirGroupToml {
    name: String,
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct TargetToml {
    name: String,
    output_root: PathBuf,
    #[serde(default)]
    languages: Vec<Language>,
    #[serde(default)]
    formats: Vec<OutputFormat>,
    #[serde(default)]
    kinds: Vec<KindToml>,
}

// OutputKind serializes as "code-along"; accept that spelling in specs too.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum KindToml {
    CodeAlong,
    Completed,
    Speaker,
}

impl From<&KindToml> for OutputKind {
    fn from(k: &KindToml) -> Self {
        match k {
            KindToml::CodeAlong => OutputKind::CodeAlong,
            KindToml::Completed => OutputKind::Completed,
            KindToml::Speaker => OutputKind::Speaker,
        }
    }
}

/// Load the spec at `spec_path` and scan `data_dir` for course files.
///
/// `default_output_root` backs the synthesized target when the spec declares
/// none; that target is marked `is_explicit = false`.
pub fn load_course_model(
    spec_path: &Path,
    data_dir: &Path,
    default_output_root: &Path,
) -> Result<CourseModel, EngineError> {
    let text = std::fs::read_to_string(spec_path).map_err(|e| EngineError::SpecRead {
        path: spec_path.to_path_buf(),
        message: e.to_string(),
    })?;
    let spec: CourseSpecToml = toml::from_str(&text).map_err(|e| EngineError::SpecInvalid {
        path: spec_path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut model = CourseModel::new(spec.name, spec.prog_lang);

    for section in &spec.sections {
        let section_id = model.add_section(&section.name);
        for topic_dir in &section.topics {
            let topic_name = topic_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| topic_dir.display().to_string());
            let topic_id = model.add_topic(section_id, topic_name, topic_dir.clone());

            let absolute = data_dir.join(topic_dir);
            if !absolute.is_dir() {
                warn!(topic = %topic_dir.display(), "topic directory missing; skipping");
                continue;
            }
            for (path, kind) in scan_topic_dir(&absolute, data_dir, &model.prog_lang)? {
                let stage = match kind {
                    FileKind::Notebook { .. } => NOTEBOOK_STAGE,
                    FileKind::Diagram(_) => DIAGRAM_STAGE,
                    FileKind::DataFile => DIAGRAM_STAGE,
                };
                model.add_file(topic_id, path, kind, stage);
            }
        }
    }

    model.dir_groups = spec
        .dir_groups
        .iter()
        .map(|g| DirGroup {
            name: g.name.clone(),
            path: g.path.clone(),
        })
        .collect();

    model.output_targets = if spec.targets.is_empty() {
        vec![OutputTarget::defaulted(default_output_root.to_path_buf())]
    } else {
        spec.targets
            .iter()
            .map(|t| OutputTarget {
                name: t.name.clone(),
                output_root: t.output_root.clone(),
                kinds: if t.kinds.is_empty() {
                    OutputKind::all().to_vec()
                } else {
                    t.kinds.iter().map(OutputKind::from).collect()
                },
                formats: if t.formats.is_empty() {
                    OutputFormat::all().to_vec()
                } else {
                    t.formats.clone()
                },
                languages: if t.languages.is_empty() {
                    Language::all().to_vec()
                } else {
                    t.languages.clone()
                },
                is_explicit: true,
            })
            .collect()
    };

    debug!(
        course = %model.name,
        sections = model.sections.len(),
        files = model.files.len(),
        targets = model.output_targets.len(),
        "course model loaded"
    );
    Ok(model)
}

/// Classify a file name into its course role, independent of any directory
/// scan. Used by the watcher to decide whether a changed path is relevant.
pub fn classify_file_name(path: &Path, prog_lang: &str) -> Option<FileKind> {
    let name = path.file_name()?.to_string_lossy();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pu" | "puml" | "plantuml" => return Some(FileKind::Diagram(DiagramKind::Plantuml)),
        "drawio" => return Some(FileKind::Diagram(DiagramKind::Drawio)),
        _ => {}
    }
    if name.starts_with("slides_") && extension == source_extension(prog_lang) {
        return Some(FileKind::Notebook {
            prog_lang: prog_lang.to_string(),
        });
    }
    Some(FileKind::DataFile)
}

fn source_extension(prog_lang: &str) -> &str {
    match prog_lang {
        "python" => "py",
        "cpp" => "cpp",
        "java" => "java",
        "rust" => "rs",
        _ => "py",
    }
}

fn scan_topic_dir(
    absolute: &Path,
    data_dir: &Path,
    prog_lang: &str,
) -> Result<Vec<(PathBuf, FileKind)>, EngineError> {
    // IndexMap keeps scan order deterministic per directory listing sort.
    let mut found: IndexMap<PathBuf, FileKind> = IndexMap::new();
    let mut pending = vec![absolute.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries: Vec<_> = std::fs::read_dir(&dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .collect();
        entries.sort();

        for path in entries {
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let Some(kind) = classify_file_name(&path, prog_lang) else {
                continue;
            };
            let relative = path
                .strip_prefix(data_dir)
                .unwrap_or(&path)
                .to_path_buf();
            found.insert(relative, kind);
        }
    }

    // Notebooks after diagrams so per-topic numbering follows name order.
    let mut files: Vec<_> = found.into_iter().collect();
    files.sort_by_key(|(path, kind)| {
        let rank = match kind {
            FileKind::Diagram(_) => 0,
            FileKind::DataFile => 1,
            FileKind::Notebook { .. } => 2,
        };
        (rank, path.clone())
    });
    Ok(files)
}

#[cfg(test)]
#[path = "spec_load_tests.rs"]
mod tests;
