// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kind-specific job payloads and content hashing.
//!
//! The payload is the stable wire contract between the planner and the
//! workers: it carries everything a worker needs to process one file, plus
//! enough identity to compute the cache key.

use crate::job::JobKind;
use crate::target::{Language, OutputFormat, OutputKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Types that can produce the content-addressed cache key.
///
/// The hash covers the input bytes plus every tag that discriminates one
/// output from another, so two jobs with the same hash are interchangeable.
pub trait ContentHashed {
    fn content_hash(&self) -> String;
}

/// Payload for a notebook transformation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookPayload {
    /// Notebook source text.
    pub data: String,
    pub language: Language,
    pub format: OutputFormat,
    pub kind: OutputKind,
    pub prog_lang: String,
    /// Execute directly when the cache has no entry for the key.
    pub fallback_execute: bool,
    /// Execute to seed the cache but skip the on-disk artifact.
    #[serde(default)]
    pub suppress_output: bool,
    pub correlation_id: Option<String>,
    pub input_file: String,
    pub input_file_name: String,
    pub output_file: String,
}

impl NotebookPayload {
    /// Key for the executed-notebook intermediate cache.
    ///
    /// Covers only what execution depends on: the source bytes, the natural
    /// language, and the programming language. `format` and `kind` are
    /// deliberately excluded so the cache-populating run (speaker HTML) and
    /// its consumers (completed HTML) share one key.
    pub fn execution_hash(&self) -> String {
        hash_content(
            self.data.as_bytes(),
            &[self.language.as_str(), &self.prog_lang],
        )
    }
}

impl ContentHashed for NotebookPayload {
    fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.data.as_bytes());
        hasher.update(self.language.as_str());
        hasher.update(self.format.as_str());
        hasher.update(self.kind.as_str());
        hasher.update(&self.prog_lang);
        hex_digest(hasher)
    }
}

/// Payload for a diagram conversion job (plantuml or drawio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramPayload {
    /// Diagram source (PlantUML text or drawio XML).
    pub data: String,
    /// Requested raster/vector format, e.g. "png" or "svg".
    pub output_format: String,
    pub correlation_id: Option<String>,
    pub input_file: String,
    pub input_file_name: String,
    pub output_file: String,
}

impl ContentHashed for DiagramPayload {
    fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.data.as_bytes());
        hasher.update(&self.output_format);
        hex_digest(hasher)
    }
}

/// A payload tagged by job kind.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPayload {
    Notebook(NotebookPayload),
    Plantuml(DiagramPayload),
    Drawio(DiagramPayload),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Notebook(_) => JobKind::Notebook,
            JobPayload::Plantuml(_) => JobKind::Plantuml,
            JobPayload::Drawio(_) => JobKind::Drawio,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            JobPayload::Notebook(p) => p.correlation_id.as_deref(),
            JobPayload::Plantuml(p) | JobPayload::Drawio(p) => p.correlation_id.as_deref(),
        }
    }

    pub fn input_file(&self) -> &str {
        match self {
            JobPayload::Notebook(p) => &p.input_file,
            JobPayload::Plantuml(p) | JobPayload::Drawio(p) => &p.input_file,
        }
    }

    pub fn output_file(&self) -> &str {
        match self {
            JobPayload::Notebook(p) => &p.output_file,
            JobPayload::Plantuml(p) | JobPayload::Drawio(p) => &p.output_file,
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            JobPayload::Notebook(p) => serde_json::to_value(p),
            JobPayload::Plantuml(p) | JobPayload::Drawio(p) => serde_json::to_value(p),
        }
    }

    /// Decode a payload column for the given job kind.
    pub fn from_value(
        kind: JobKind,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            JobKind::Notebook => JobPayload::Notebook(serde_json::from_value(value)?),
            JobKind::Plantuml => JobPayload::Plantuml(serde_json::from_value(value)?),
            JobKind::Drawio => JobPayload::Drawio(serde_json::from_value(value)?),
        })
    }
}

impl ContentHashed for JobPayload {
    fn content_hash(&self) -> String {
        match self {
            JobPayload::Notebook(p) => p.content_hash(),
            // The converter binary differs, so the kind tag must discriminate
            // plantuml from drawio even for identical source text.
            JobPayload::Plantuml(p) => format!("pu-{}", p.content_hash()),
            JobPayload::Drawio(p) => format!("dw-{}", p.content_hash()),
        }
    }
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Hash raw input bytes with discriminating tags, for callers that do not
/// build a full payload (e.g. cache probes during planning).
pub fn hash_content(data: &[u8], tags: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    for tag in tags {
        hasher.update(tag.as_bytes());
    }
    hex_digest(hasher)
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
