// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory course model.
//!
//! Course, section, topic, and file records live in flat arenas indexed by
//! typed ids; parent/child links are ids rather than owning references, so
//! the model is a plain acyclic value that can be walked in any direction.

use crate::target::OutputTarget;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub usize);
    };
}

arena_id! {
    /// Index into [`CourseModel::sections`].
    SectionId
}
arena_id! {
    /// Index into [`CourseModel::topics`].
    TopicId
}
arena_id! {
    /// Index into [`CourseModel::files`].
    FileId
}

/// Diagram source dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Plantuml,
    Drawio,
}

/// What a course file is, which decides the jobs it generates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FileKind {
    /// Notebook-style slide source; `prog_lang` is derived from the extension.
    Notebook { prog_lang: String },
    Diagram(DiagramKind),
    /// Copied verbatim by the directory-group phase.
    DataFile,
}

/// One authored source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseFile {
    pub id: FileId,
    pub topic: TopicId,
    /// Path relative to the data directory.
    pub path: PathBuf,
    pub kind: FileKind,
    /// Stage partition; stages execute in ascending order.
    pub execution_stage: u32,
    /// 1-based position of this notebook within its topic, for output naming.
    pub number_in_topic: u32,
}

impl CourseFile {
    pub fn is_notebook(&self) -> bool {
        matches!(self.kind, FileKind::Notebook { .. })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Human title for output naming: the stem without its `slides_` prefix,
    /// underscores as spaces, words capitalized.
    pub fn title(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = stem.strip_prefix("slides_").unwrap_or(&stem);
        stem.split('_')
            .filter(|w| !w.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// A topic: one directory of related files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub section: SectionId,
    pub name: String,
    /// Directory relative to the data directory.
    pub path: PathBuf,
    pub files: Vec<FileId>,
}

/// A section: an ordered group of topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub topics: Vec<TopicId>,
}

/// A tree of static assets copied verbatim to each target root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirGroup {
    pub name: String,
    /// Source directory relative to the data directory.
    pub path: PathBuf,
}

/// The complete course model consumed by the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseModel {
    pub name: String,
    pub prog_lang: String,
    pub sections: Vec<Section>,
    pub topics: Vec<Topic>,
    pub files: Vec<CourseFile>,
    pub dir_groups: Vec<DirGroup>,
    pub output_targets: Vec<OutputTarget>,
}

impl CourseModel {
    pub fn new(name: impl Into<String>, prog_lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prog_lang: prog_lang.into(),
            ..Default::default()
        }
    }

    pub fn add_section(&mut self, name: impl Into<String>) -> SectionId {
        let id = SectionId(self.sections.len());
        self.sections.push(Section {
            id,
            name: name.into(),
            topics: Vec::new(),
        });
        id
    }

    pub fn add_topic(
        &mut self,
        section: SectionId,
        name: impl Into<String>,
        path: PathBuf,
    ) -> TopicId {
        let id = TopicId(self.topics.len());
        self.topics.push(Topic {
            id,
            section,
            name: name.into(),
            path,
            files: Vec::new(),
        });
        self.sections[section.0].topics.push(id);
        id
    }

    pub fn add_file(
        &mut self,
        topic: TopicId,
        path: PathBuf,
        kind: FileKind,
        execution_stage: u32,
    ) -> FileId {
        let id = FileId(self.files.len());
        let number_in_topic = 1 + self.topics[topic.0]
            .files
            .iter()
            .filter(|f| self.files[f.0].is_notebook())
            .count() as u32;
        self.files.push(CourseFile {
            id,
            topic,
            path,
            kind,
            execution_stage,
            number_in_topic,
        });
        self.topics[topic.0].files.push(id);
        id
    }

    pub fn file(&self, id: FileId) -> &CourseFile {
        &self.files[id.0]
    }

    pub fn topic(&self, id: TopicId) -> &Topic {
        &self.topics[id.0]
    }

    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.0]
    }

    /// Files in model order (section, topic, file declaration order).
    pub fn files_in_order(&self) -> impl Iterator<Item = &CourseFile> {
        self.sections
            .iter()
            .flat_map(|s| &s.topics)
            .flat_map(|t| &self.topics[t.0].files)
            .map(|f| &self.files[f.0])
    }

    /// Find the file whose data-relative path matches, if any.
    pub fn file_for_path(&self, path: &std::path::Path) -> Option<&CourseFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// The distinct execution stages present, ascending.
    pub fn stages(&self) -> Vec<u32> {
        let mut stages: Vec<u32> = self
            .files
            .iter()
            .filter(|f| !matches!(f.kind, FileKind::DataFile))
            .map(|f| f.execution_stage)
            .collect();
        stages.sort_unstable();
        stages.dedup();
        stages
    }
}

#[cfg(test)]
#[path = "course_tests.rs"]
mod tests;
