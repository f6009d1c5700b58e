// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The user-facing build error shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Who can fix this error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    /// Wrong content: the course author can fix it.
    User,
    /// Wrong setup: missing tools, env vars, or spec values.
    Configuration,
    /// The machinery itself failed; retrying may help.
    Infrastructure,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorType::User => write!(f, "user"),
            ErrorType::Configuration => write!(f, "configuration"),
            ErrorType::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    /// Aborts the current stage and the build.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// A classified build error, ready for display.
///
/// Produced exclusively by [`crate::ErrorClassifier`], which owns the mapping
/// from raw worker errors to categories and guidance strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildError {
    pub error_type: ErrorType,
    /// Stable machine-readable category, e.g. `missing_drawio`.
    pub category: String,
    pub severity: Severity,
    pub file_path: Option<PathBuf>,
    pub message: String,
    /// One actionable sentence telling the user what to do next.
    pub actionable_guidance: String,
    /// Structured context from the worker (cell index, line, snippet).
    pub details: Option<serde_json::Value>,
}

impl BuildError {
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_path {
            Some(path) => write!(
                f,
                "[{}/{}] {}: {}",
                self.error_type,
                self.category,
                path.display(),
                self.message
            ),
            None => write!(f, "[{}/{}] {}", self.error_type, self.category, self.message),
        }
    }
}
