// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable build output formatters.
//!
//! The driver reports through this trait; the CLI picks the default,
//! verbose, or quiet implementation. Formatters write to stdout/stderr
//! directly, mirroring how users see a build.

use crate::driver::BuildReport;
use cb_core::{BuildError, BuildProgress, Severity};
use std::path::Path;

/// Maximum errors and warnings echoed in the final summary.
const SUMMARY_LIMIT: usize = 10;

pub trait OutputFormatter: Send {
    fn on_build_start(&mut self, total_jobs: usize);
    fn on_progress(&mut self, progress: &BuildProgress);
    fn on_cache_hit(&mut self, output_path: &Path);
    fn on_job_error(&mut self, error: &BuildError);
    fn on_summary(&mut self, report: &BuildReport);
}

/// One inline line per error, periodic progress, a categorized summary.
#[derive(Default)]
pub struct DefaultFormatter {
    last_percent: Option<u32>,
}

impl DefaultFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn error_line(error: &BuildError) -> String {
    let location = error
        .file_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<build>".to_string());
    let cell = error
        .details
        .as_ref()
        .and_then(|d| d.get("cell_index"))
        .and_then(|c| c.as_u64())
        .map(|c| format!(" (cell {c})"))
        .unwrap_or_default();
    format!(
        "{}: {location}{cell}: {}\n  -> {}",
        error.severity, error.message, error.actionable_guidance
    )
}

fn print_summary(report: &BuildReport) {
    println!(
        "build finished: {} completed, {} failed, {} cache hits, {} total",
        report.completed, report.failed, report.cache_hits, report.total
    );
    let errors: Vec<_> = report
        .errors
        .iter()
        .filter(|e| e.severity >= Severity::Error)
        .collect();
    let warnings: Vec<_> = report
        .errors
        .iter()
        .filter(|e| e.severity == Severity::Warning)
        .collect();

    if !errors.is_empty() {
        println!("errors ({}):", errors.len());
        for error in errors.iter().take(SUMMARY_LIMIT) {
            println!("  {error}");
        }
        if errors.len() > SUMMARY_LIMIT {
            println!("  ... and {} more", errors.len() - SUMMARY_LIMIT);
        }
    }
    if !warnings.is_empty() {
        println!("warnings ({}):", warnings.len());
        for warning in warnings.iter().take(SUMMARY_LIMIT) {
            println!("  {warning}");
        }
    }
}

impl OutputFormatter for DefaultFormatter {
    fn on_build_start(&mut self, total_jobs: usize) {
        if total_jobs > 0 {
            println!("building {total_jobs} output(s)...");
        }
    }

    fn on_progress(&mut self, progress: &BuildProgress) {
        let percent = progress.percent();
        // Only print when the number moves; polls are frequent.
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            println!(
                "progress: {percent}% ({}/{} done, {} active worker(s))",
                progress.finished(),
                progress.total,
                progress.active_workers
            );
        }
    }

    fn on_cache_hit(&mut self, _output_path: &Path) {}

    fn on_job_error(&mut self, error: &BuildError) {
        eprintln!("{}", error_line(error));
    }

    fn on_summary(&mut self, report: &BuildReport) {
        print_summary(report);
    }
}

/// Everything the default prints, plus cache hits and per-job detail.
#[derive(Default)]
pub struct VerboseFormatter {
    inner: DefaultFormatter,
}

impl VerboseFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputFormatter for VerboseFormatter {
    fn on_build_start(&mut self, total_jobs: usize) {
        self.inner.on_build_start(total_jobs);
    }

    fn on_progress(&mut self, progress: &BuildProgress) {
        self.inner.on_progress(progress);
    }

    fn on_cache_hit(&mut self, output_path: &Path) {
        println!("cache hit: {}", output_path.display());
    }

    fn on_job_error(&mut self, error: &BuildError) {
        self.inner.on_job_error(error);
        if let Some(details) = &error.details {
            eprintln!("  details: {details}");
        }
    }

    fn on_summary(&mut self, report: &BuildReport) {
        self.inner.on_summary(report);
    }
}

/// Errors and the final summary only.
#[derive(Default)]
pub struct QuietFormatter;

impl QuietFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for QuietFormatter {
    fn on_build_start(&mut self, _total_jobs: usize) {}
    fn on_progress(&mut self, _progress: &BuildProgress) {}
    fn on_cache_hit(&mut self, _output_path: &Path) {}

    fn on_job_error(&mut self, error: &BuildError) {
        eprintln!("{}", error_line(error));
    }

    fn on_summary(&mut self, report: &BuildReport) {
        if report.failed > 0 {
            print_summary(report);
        }
    }
}

/// Collects callbacks for assertions.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingFormatter {
    pub started_with: Option<usize>,
    pub cache_hits: Vec<std::path::PathBuf>,
    pub errors: Vec<BuildError>,
    pub summaries: Vec<BuildReport>,
}

#[cfg(test)]
impl OutputFormatter for RecordingFormatter {
    fn on_build_start(&mut self, total_jobs: usize) {
        self.started_with = Some(total_jobs);
    }
    fn on_progress(&mut self, _progress: &BuildProgress) {}
    fn on_cache_hit(&mut self, output_path: &Path) {
        self.cache_hits.push(output_path.to_path_buf());
    }
    fn on_job_error(&mut self, error: &BuildError) {
        self.errors.push(error.clone());
    }
    fn on_summary(&mut self, report: &BuildReport) {
        self.summaries.push(report.clone());
    }
}
