// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution-cache dependencies between output combinations.
//!
//! Completed HTML reuses the execution results cached by speaker HTML. When a
//! build requests only the consumer, the provider must still run to populate
//! the cache, without writing its own artifact to disk.

use crate::target::{Language, OutputFormat, OutputKind, OutputTarget};
use std::collections::BTreeSet;

/// A requested `(language, format, kind)` combination.
pub type OutputTriple = (Language, OutputFormat, OutputKind);

/// How a `(format, kind)` combination relates to the execution cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionRequirement {
    /// Cells are cleared or content is static; no execution.
    None,
    /// Runs the notebook and populates the cache. Must run before any
    /// `ReusesCache` output with the same key.
    PopulatesCache,
    /// Consumes cached execution results.
    ReusesCache,
}

/// Fixed classification table keyed on `(format, kind)`.
pub fn execution_requirement(format: OutputFormat, kind: OutputKind) -> ExecutionRequirement {
    match (format, kind) {
        (OutputFormat::Html, OutputKind::Speaker) => ExecutionRequirement::PopulatesCache,
        (OutputFormat::Html, OutputKind::Completed) => ExecutionRequirement::ReusesCache,
        _ => ExecutionRequirement::None,
    }
}

/// The provider combination for a cache-consuming `(format, kind)`.
fn cache_provider(format: OutputFormat, kind: OutputKind) -> Option<(OutputFormat, OutputKind)> {
    match (format, kind) {
        (OutputFormat::Html, OutputKind::Completed) => {
            Some((OutputFormat::Html, OutputKind::Speaker))
        }
        _ => None,
    }
}

/// Collect every combination the effective targets want generated.
pub fn collect_requested_outputs(targets: &[OutputTarget]) -> BTreeSet<OutputTriple> {
    let mut requested = BTreeSet::new();
    for target in targets {
        for &lang in &target.languages {
            for &format in &target.formats {
                for &kind in &target.kinds {
                    if target.should_generate(lang, format, kind) {
                        requested.insert((lang, format, kind));
                    }
                }
            }
        }
    }
    requested
}

/// Determine the implicit executions needed to satisfy cache dependencies.
///
/// Returns the combinations that must be executed to seed the cache but whose
/// on-disk output is suppressed unless also explicitly requested.
pub fn resolve_implicit_executions(requested: &BTreeSet<OutputTriple>) -> BTreeSet<OutputTriple> {
    let mut implicit = BTreeSet::new();
    for &(lang, format, kind) in requested {
        if execution_requirement(format, kind) != ExecutionRequirement::ReusesCache {
            continue;
        }
        if let Some((provider_format, provider_kind)) = cache_provider(format, kind) {
            let provider = (lang, provider_format, provider_kind);
            if !requested.contains(&provider) {
                implicit.insert(provider);
            }
        }
    }
    implicit
}

#[cfg(test)]
#[path = "exec_deps_tests.rs"]
mod tests;
