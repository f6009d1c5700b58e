// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output targets and the (language, format, kind) filter algebra.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Natural language of generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::De => "de",
            Language::En => "en",
        }
    }

    pub fn all() -> [Language; 2] {
        [Language::De, Language::En]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "de" => Ok(Language::De),
            "en" => Ok(Language::En),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Output format of a derived artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Notebook,
    Code,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Notebook => "notebook",
            OutputFormat::Code => "code",
        }
    }

    pub fn all() -> [OutputFormat; 3] {
        [OutputFormat::Html, OutputFormat::Notebook, OutputFormat::Code]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(OutputFormat::Html),
            "notebook" => Ok(OutputFormat::Notebook),
            "code" => Ok(OutputFormat::Code),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Audience-facing kind of a derived artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputKind {
    #[serde(rename = "code-along")]
    CodeAlong,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "speaker")]
    Speaker,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::CodeAlong => "code-along",
            OutputKind::Completed => "completed",
            OutputKind::Speaker => "speaker",
        }
    }

    pub fn all() -> [OutputKind; 3] {
        [OutputKind::CodeAlong, OutputKind::Completed, OutputKind::Speaker]
    }

    /// Speaker artifacts land under the private output tree.
    pub fn is_speaker(&self) -> bool {
        matches!(self, OutputKind::Speaker)
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code-along" => Ok(OutputKind::CodeAlong),
            "completed" => Ok(OutputKind::Completed),
            "speaker" => Ok(OutputKind::Speaker),
            other => Err(format!("unknown output kind: {other}")),
        }
    }
}

/// One deployment target declared by the course spec (or defaulted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputTarget {
    pub name: String,
    pub output_root: PathBuf,
    pub kinds: Vec<OutputKind>,
    pub formats: Vec<OutputFormat>,
    pub languages: Vec<Language>,
    /// False for targets synthesized from defaults rather than declared in
    /// the spec. Defaulted targets absorb CLI overrides wholesale instead of
    /// intersecting with them.
    pub is_explicit: bool,
}

impl OutputTarget {
    /// A defaulted target producing everything under `output_root`.
    pub fn defaulted(output_root: PathBuf) -> Self {
        Self {
            name: "default".to_string(),
            output_root,
            kinds: OutputKind::all().to_vec(),
            formats: OutputFormat::all().to_vec(),
            languages: Language::all().to_vec(),
            is_explicit: false,
        }
    }

    /// Whether this target wants the given combination.
    ///
    /// Code format is only generated for the completed kind.
    pub fn should_generate(&self, lang: Language, format: OutputFormat, kind: OutputKind) -> bool {
        if format == OutputFormat::Code && kind != OutputKind::Completed {
            return false;
        }
        self.languages.contains(&lang)
            && self.formats.contains(&format)
            && self.kinds.contains(&kind)
    }
}

/// CLI-level filter narrowing what the targets produce.
#[derive(Debug, Clone, Default)]
pub struct TargetFilter {
    pub languages: Option<Vec<Language>>,
    pub formats: Option<Vec<OutputFormat>>,
    pub kinds: Option<Vec<OutputKind>>,
}

impl TargetFilter {
    pub fn is_empty(&self) -> bool {
        self.languages.is_none() && self.formats.is_none() && self.kinds.is_none()
    }
}

fn intersect<T: Copy + PartialEq>(declared: &[T], requested: Option<&Vec<T>>) -> Vec<T> {
    match requested {
        None => declared.to_vec(),
        Some(req) => declared.iter().copied().filter(|v| req.contains(v)).collect(),
    }
}

/// Merge CLI overrides into the declared targets.
///
/// Explicit targets intersect their declared sets with the filter; a target
/// whose intersection becomes empty drops out. Defaulted targets take the
/// filter sets verbatim so a CLI override narrows the default without being
/// read as spec intent.
pub fn effective_targets(declared: &[OutputTarget], filter: &TargetFilter) -> Vec<OutputTarget> {
    let mut out = Vec::new();
    for target in declared {
        let mut t = target.clone();
        if target.is_explicit {
            t.languages = intersect(&target.languages, filter.languages.as_ref());
            t.formats = intersect(&target.formats, filter.formats.as_ref());
            t.kinds = intersect(&target.kinds, filter.kinds.as_ref());
        } else {
            if let Some(langs) = &filter.languages {
                t.languages = langs.clone();
            }
            if let Some(formats) = &filter.formats {
                t.formats = formats.clone();
            }
            if let Some(kinds) = &filter.kinds {
                t.kinds = kinds.clone();
            }
        }
        if !t.languages.is_empty() && !t.formats.is_empty() && !t.kinds.is_empty() {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
