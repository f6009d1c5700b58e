// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution planner.
//!
//! Walks the course model and emits one job per file per requested output
//! combination, grouped into stages by each file's `execution_stage`.
//! Cache-consuming outputs pull their providers into the plan as implicit
//! executions: executed to seed the executed-notebook cache, artifact
//! suppressed unless also explicitly requested. Providers are enqueued at a
//! higher priority so a small pool claims them first; consumers keep
//! `fallback_execute` as a safety net against claim races.

use crate::error::EngineError;
use crate::images::ImageRegistry;
use cb_core::{
    collect_requested_outputs, output_dir_for, resolve_implicit_executions, ContentHashed,
    CourseFile, CourseModel, DiagramKind, DiagramPayload, DirGroup, FileKind, JobPayload, JobSpec,
    Language, NotebookPayload, OutputFormat, OutputKind, OutputTarget, OutputTriple, TargetFilter,
    effective_targets, execution_requirement, ExecutionRequirement,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Priority for cache-populating notebook runs; claimed before consumers.
const PROVIDER_PRIORITY: i64 = 10;

/// One batch of jobs that may run concurrently.
#[derive(Debug)]
pub struct PlannedStage {
    pub number: u32,
    pub jobs: Vec<JobSpec>,
}

/// The full staged plan plus the final copy phase.
#[derive(Debug, Default)]
pub struct BuildPlan {
    pub stages: Vec<PlannedStage>,
    /// Directory groups to copy, with the target roots receiving them.
    pub dir_groups: Vec<(DirGroup, Vec<PathBuf>)>,
    /// Implicit executions added to satisfy cache dependencies.
    pub implicit: BTreeSet<OutputTriple>,
}

impl BuildPlan {
    pub fn total_jobs(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_jobs() == 0
    }
}

pub struct Planner<'a> {
    model: &'a CourseModel,
    targets: Vec<OutputTarget>,
    data_dir: PathBuf,
    correlation_id: Option<String>,
}

impl<'a> Planner<'a> {
    pub fn new(model: &'a CourseModel, filter: &TargetFilter, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            targets: effective_targets(&model.output_targets, filter),
            data_dir: data_dir.into(),
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// The effective targets after CLI filtering.
    pub fn targets(&self) -> &[OutputTarget] {
        &self.targets
    }

    /// Plan the whole course.
    pub fn plan(&self) -> Result<BuildPlan, EngineError> {
        let requested = collect_requested_outputs(&self.targets);
        let implicit = resolve_implicit_executions(&requested);
        for triple in &implicit {
            info!(
                language = %triple.0,
                format = %triple.1,
                kind = %triple.2,
                "adding implicit execution to satisfy cache dependency"
            );
        }

        let mut registry = ImageRegistry::new();
        let mut stages: BTreeMap<u32, Vec<JobSpec>> = BTreeMap::new();

        for file in self.model.files_in_order() {
            for job in self.jobs_for_file(file, &requested, &implicit, &mut registry)? {
                stages.entry(file.execution_stage).or_default().push(job);
            }
        }

        let target_roots: Vec<PathBuf> =
            self.targets.iter().map(|t| t.output_root.clone()).collect();
        let dir_groups = self
            .model
            .dir_groups
            .iter()
            .map(|g| (g.clone(), target_roots.clone()))
            .collect();

        let plan = BuildPlan {
            stages: stages
                .into_iter()
                .filter(|(_, jobs)| !jobs.is_empty())
                .map(|(number, mut jobs)| {
                    // Cache providers submit ahead of their consumers, so
                    // even the very first claim of a fresh pool picks up a
                    // provider.
                    jobs.sort_by_key(|j| std::cmp::Reverse(j.priority));
                    PlannedStage { number, jobs }
                })
                .collect(),
            dir_groups,
            implicit,
        };
        debug!(
            stages = plan.stages.len(),
            jobs = plan.total_jobs(),
            "planned course build"
        );
        Ok(plan)
    }

    /// Plan a single changed file (watch mode).
    pub fn plan_file(&self, file: &CourseFile) -> Result<Vec<JobSpec>, EngineError> {
        let requested = collect_requested_outputs(&self.targets);
        let implicit = resolve_implicit_executions(&requested);
        let mut registry = ImageRegistry::new();
        let mut jobs = self.jobs_for_file(file, &requested, &implicit, &mut registry)?;
        jobs.sort_by_key(|j| std::cmp::Reverse(j.priority));
        Ok(jobs)
    }

    fn jobs_for_file(
        &self,
        file: &CourseFile,
        requested: &BTreeSet<OutputTriple>,
        implicit: &BTreeSet<OutputTriple>,
        registry: &mut ImageRegistry,
    ) -> Result<Vec<JobSpec>, EngineError> {
        match &file.kind {
            FileKind::Diagram(diagram_kind) => {
                Ok(vec![self.diagram_job(file, *diagram_kind, registry)?])
            }
            FileKind::Notebook { prog_lang } => {
                self.notebook_jobs(file, prog_lang, requested, implicit)
            }
            // Static data rides along with the directory-group copy phase.
            FileKind::DataFile => Ok(Vec::new()),
        }
    }

    fn read_source(&self, file: &CourseFile) -> Result<String, EngineError> {
        let path = self.data_dir.join(&file.path);
        std::fs::read_to_string(&path).map_err(|e| EngineError::SourceRead {
            path,
            message: e.to_string(),
        })
    }

    fn diagram_job(
        &self,
        file: &CourseFile,
        kind: DiagramKind,
        registry: &mut ImageRegistry,
    ) -> Result<JobSpec, EngineError> {
        let source = self.read_source(file)?;
        let output_rel = file.path.with_extension("png");
        let output_abs = self.data_dir.join(&output_rel);

        let payload = DiagramPayload {
            data: source,
            output_format: "png".to_string(),
            correlation_id: self.correlation_id.clone(),
            input_file: file.path.display().to_string(),
            input_file_name: file.file_name(),
            output_file: output_rel.display().to_string(),
        };
        let wrapped = match kind {
            DiagramKind::Plantuml => JobPayload::Plantuml(payload),
            DiagramKind::Drawio => JobPayload::Drawio(payload),
        };
        let content_hash = wrapped.content_hash();

        let image_name = output_rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        registry.register(&image_name, &file.path, &content_hash)?;

        let payload_value = wrapped
            .to_value()
            .map_err(|e| EngineError::PayloadEncode {
                path: file.path.clone(),
                message: e.to_string(),
            })?;

        let mut spec = JobSpec::new(
            wrapped.kind(),
            self.data_dir.join(&file.path),
            output_abs,
            content_hash,
            payload_value,
        );
        spec.correlation_id = self.correlation_id.clone();
        Ok(spec)
    }

    fn notebook_jobs(
        &self,
        file: &CourseFile,
        prog_lang: &str,
        requested: &BTreeSet<OutputTriple>,
        implicit: &BTreeSet<OutputTriple>,
    ) -> Result<Vec<JobSpec>, EngineError> {
        let source = self.read_source(file)?;
        let mut jobs = Vec::new();

        // Explicit outputs: one job per target per requested combination.
        for target in &self.targets {
            for &(lang, format, kind) in requested {
                if !target.should_generate(lang, format, kind) {
                    continue;
                }
                jobs.push(self.notebook_job(
                    file, prog_lang, &source, target, lang, format, kind, false,
                )?);
            }
        }

        // Implicit executions: seed the cache, suppress the artifact. The
        // first effective target hosts the placeholder output path.
        if let Some(target) = self.targets.first() {
            for &(lang, format, kind) in implicit {
                jobs.push(self.notebook_job(
                    file, prog_lang, &source, target, lang, format, kind, true,
                )?);
            }
        }

        Ok(jobs)
    }

    #[allow(clippy::too_many_arguments)]
    fn notebook_job(
        &self,
        file: &CourseFile,
        prog_lang: &str,
        source: &str,
        target: &OutputTarget,
        lang: Language,
        format: OutputFormat,
        kind: OutputKind,
        suppress_output: bool,
    ) -> Result<JobSpec, EngineError> {
        let topic = self.model.topic(file.topic);
        let out_dir = output_dir_for(&target.output_root, &self.model.name, lang, format, kind)
            .join(&topic.name);
        let file_name = format!(
            "{:02} {}.{}",
            file.number_in_topic,
            file.title(),
            artifact_extension(format, prog_lang)
        );
        let output_path = out_dir.join(file_name);

        let payload = NotebookPayload {
            data: source.to_string(),
            language: lang,
            format,
            kind,
            prog_lang: prog_lang.to_string(),
            fallback_execute: true,
            suppress_output,
            correlation_id: self.correlation_id.clone(),
            input_file: file.path.display().to_string(),
            input_file_name: file.file_name(),
            output_file: output_path.display().to_string(),
        };
        let content_hash = payload.content_hash();
        let payload_value =
            serde_json::to_value(&payload).map_err(|e| EngineError::PayloadEncode {
                path: file.path.clone(),
                message: e.to_string(),
            })?;

        let priority =
            if execution_requirement(format, kind) == ExecutionRequirement::PopulatesCache {
                PROVIDER_PRIORITY
            } else {
                0
            };

        let mut spec = JobSpec::new(
            cb_core::JobKind::Notebook,
            self.data_dir.join(&file.path),
            output_path,
            content_hash,
            payload_value,
        )
        .with_priority(priority);
        spec.correlation_id = self.correlation_id.clone();
        Ok(spec)
    }
}

fn artifact_extension(format: OutputFormat, prog_lang: &str) -> &'static str {
    match format {
        OutputFormat::Html => "html",
        OutputFormat::Notebook => "ipynb",
        OutputFormat::Code => match prog_lang {
            "cpp" => "cpp",
            "java" => "java",
            "rust" => "rs",
            _ => "py",
        },
    }
}

/// Convenience used by tests and the watcher: is this path one of the
/// model's course files?
pub fn course_file_for_path<'m>(
    model: &'m CourseModel,
    data_dir: &Path,
    path: &Path,
) -> Option<&'m CourseFile> {
    let relative = path.strip_prefix(data_dir).unwrap_or(path);
    model.file_for_path(relative)
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
