use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn};

use crate::artifact::ArtifactKind;
use crate::collab::{Collaborators, DashboardMetadata, ExtractionRequest, SourceDocument, TargetSchema};
use crate::error::{ConfigError, CvforgeError, ExtractionError, GenerationError};
use crate::extract::{RetryHook, RetryingExtractor};
use crate::naming::{Mode, NamingContext, PathResolver};
use crate::sanitize;
use crate::storage::FileStorage;
use crate::worker::{TaskOutcome, WorkerPool};

use super::context::{ItemRequest, PipelineContext, SharedContext};
use super::error::{PipelineError, PipelineWarning};
use super::generate::{DashboardSections, DerivePlan, Generator, TaskReport};
use super::options::PipelineOptions;
use super::progress::{ProgressEvent, ProgressReporter};
use super::result::PipelineResult;
use super::stage::{Stage, StageOutcome, StageReport, StageStatus};
use super::validation::validate_item;

/// Runs one item from raw text to its full set of artifacts.
///
/// ```text
/// extract_context? -> extract_item -> validate -> generate (fan-out)
///     -> proposal? -> dashboard
/// ```
///
/// Only item extraction, validation and the primary document can fail the
/// run; every other stage degrades to a missing artifact plus a warning.
pub struct Pipeline {
    options: Arc<PipelineOptions>,
    generator: Generator,
    resolver: PathResolver,
}

impl Pipeline {
    pub fn new(options: PipelineOptions, collaborators: Collaborators) -> Self {
        let extractor = RetryingExtractor::new(collaborators.extractor, options.retry);
        let generator = Generator {
            extractor,
            renderer: collaborators.renderer,
            dashboard: collaborators.dashboard,
            storage: FileStorage::new(&options.output_directory),
            settings: options.settings.clone(),
            timeout: options.generation_timeout,
        };
        let resolver = PathResolver::new(&options.output_directory);

        Self {
            options: Arc::new(options),
            generator,
            resolver,
        }
    }

    /// Observe retry attempts of every extraction this pipeline makes.
    pub fn with_retry_hook(mut self, hook: RetryHook) -> Self {
        self.generator.extractor = self.generator.extractor.with_hook(hook);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn storage(&self) -> &FileStorage {
        &self.generator.storage
    }

    /// Resolves naming up front so configuration problems surface before
    /// any collaborator is called.
    pub fn prepare(&self, request: ItemRequest) -> Result<PipelineContext, ConfigError> {
        let candidate = request
            .candidate_name
            .clone()
            .unwrap_or_else(|| request.source.label.clone());
        let job_context = request
            .job_context_name
            .clone()
            .or_else(|| request.shared_context.as_ref().map(|c| c.label.clone()))
            .or_else(|| request.target.as_ref().map(|t| t.label.clone()))
            .unwrap_or_default();

        let mut naming = NamingContext::new(self.options.mode, &candidate, &job_context)
            .batch(request.is_batch);
        naming.timestamp = request.timestamp.clone();

        let paths = self
            .resolver
            .resolve(&naming.clone().artifact(ArtifactKind::ItemData.as_str()))?;
        naming.timestamp = Some(paths.timestamp.clone());

        Ok(PipelineContext::new(
            request.source,
            request.target,
            naming,
            paths,
            request.shared_context,
        ))
    }

    pub fn run_single(
        &self,
        request: ItemRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineResult, CvforgeError> {
        let ctx = self.prepare(request)?;
        let (result, _ctx) = self.run(ctx, progress);
        Ok(result)
    }

    /// Extracts the target document into a job profile.
    pub fn extract_shared_context(
        &self,
        target: &SourceDocument,
    ) -> Result<Value, ExtractionError> {
        let _step = info_span!("extract_shared_context", target = %target.label).entered();
        self.generator.extractor.extract(&ExtractionRequest {
            source: &target.content,
            context: None,
            schema: TargetSchema::JobProfile,
            settings: &self.generator.settings,
        })
    }

    /// Run the full pipeline for one prepared item.
    /// Returns a (PipelineResult, PipelineContext) pair.
    pub fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (PipelineResult, PipelineContext) {
        let source = sanitize::source_fields(&ctx.source);
        let _pipeline_span = info_span!("pipeline",
            source = %source.name,
            source_id = %source.id,
            mode = %ctx.naming.mode,
            batch = ctx.naming.is_batch,
            timestamp = %ctx.paths.timestamp,
        )
        .entered();

        progress.report(ProgressEvent::running(5, "Starting pipeline"));

        // Step 1: Job profile (optional)
        {
            let _step = info_span!("extract_context").entered();
            let outcome = self.step_extract_context(&mut ctx);
            ctx.stages.push(outcome.report(Stage::ExtractContext));
            progress.report(ProgressEvent::running(15, "Job profile ready"));
        }

        // Step 2: Item extraction
        let item = {
            let _step = info_span!("extract_item").entered();
            match self.step_extract_item(&mut ctx) {
                Ok(item) => item,
                Err(e) => return self.fail(ctx, Some(Stage::ExtractItem), e, 30, progress),
            }
        };
        progress.report(ProgressEvent::running(30, "Item extracted"));

        // Step 3: Structural validation
        {
            let _step = info_span!("validate").entered();
            if let Err(e) = self.step_validate(&mut ctx, &item) {
                return self.fail(ctx, Some(Stage::Validate), e, 40, progress);
            }
        }
        progress.report(ProgressEvent::running(40, "Item validated"));

        // Step 4: Independent artifacts
        {
            let _step = info_span!("generate").entered();
            progress.report(ProgressEvent::running(50, "Generating artifacts"));
            if let Err(e) = self.step_generate(&mut ctx, &item, progress) {
                return self.fail(ctx, None, e, 80, progress);
            }
        }

        // Step 5: Proposal (depends on the match report)
        {
            let _step = info_span!("proposal").entered();
            let outcome = self.step_proposal(&mut ctx, &item);
            ctx.stages.push(outcome.report(Stage::Proposal));
            progress.report(ProgressEvent::running(85, "Proposal step finished"));
        }

        // Step 6: Dashboard
        {
            let _step = info_span!("dashboard").entered();
            let outcome = self.step_dashboard(&mut ctx, &item);
            ctx.stages.push(outcome.report(Stage::Dashboard));
            progress.report(ProgressEvent::running(95, "Dashboard step finished"));
        }

        let result = PipelineResult::from_context(&ctx, None);
        info!(
            success = result.success,
            artifacts = ctx.handles.len(),
            warnings = ctx.warnings.len(),
            "Pipeline finished"
        );
        progress.report(ProgressEvent::complete(format!(
            "Generated {} artifact(s) for {}",
            ctx.handles.len(),
            result.candidate_display_name
        )));

        (result, ctx)
    }

    fn fail(
        &self,
        mut ctx: PipelineContext,
        stage: Option<Stage>,
        err: PipelineError,
        percent: u8,
        progress: &dyn ProgressReporter,
    ) -> (PipelineResult, PipelineContext) {
        let err_msg = err.to_string();
        error!(error = %err_msg, "Pipeline failed");
        if let Some(stage) = stage {
            ctx.stages.push(StageReport {
                stage,
                status: StageStatus::Failed,
                detail: Some(err_msg.clone()),
            });
        }
        progress.report(ProgressEvent::error(percent, err_msg.clone()));
        (PipelineResult::from_context(&ctx, Some(err_msg)), ctx)
    }

    fn step_extract_context(&self, ctx: &mut PipelineContext) -> StageOutcome<()> {
        if ctx.shared.is_some() {
            return StageOutcome::Skipped("job profile already available".to_string());
        }
        let Some(target) = ctx.target.clone() else {
            return StageOutcome::Skipped("no target document".to_string());
        };

        let data = match self.extract_shared_context(&target) {
            Ok(data) => data,
            Err(e) => {
                warn!("Continuing without job profile: {}", e);
                ctx.warnings.push(PipelineWarning::ContextUnavailable {
                    error: e.to_string(),
                });
                return StageOutcome::Failed(e.to_string());
            }
        };

        let label = match ctx.naming.job_context_name.trim() {
            "" => target.label.clone(),
            name => name.to_string(),
        };
        let mut shared = SharedContext::new(&label, data);

        let persisted = self
            .resolver
            .resolve(&ctx.naming_for(ArtifactKind::JobProfile, None))
            .map_err(|e| e.to_string())
            .and_then(|paths| {
                self.generator
                    .storage
                    .write_json(&paths.file_path, &shared.data)
                    .map_err(|e| e.to_string())
            });
        match persisted {
            Ok(path) => {
                debug!("Stored job profile -> {}", sanitize::file_name(&path));
                ctx.data_files.insert(ArtifactKind::JobProfile, path.clone());
                shared.persisted_path = Some(path);
            }
            Err(error) => {
                warn!("Job profile was not saved: {}", error);
                ctx.warnings.push(PipelineWarning::DataNotPersisted {
                    artifact: ArtifactKind::JobProfile,
                    error,
                });
            }
        }

        ctx.shared = Some(Arc::new(shared));
        StageOutcome::Ok(())
    }

    fn step_extract_item(&self, ctx: &mut PipelineContext) -> Result<Arc<Value>, PipelineError> {
        let data = self.generator.extractor.extract(&ExtractionRequest {
            source: &ctx.source.content,
            context: ctx.shared.as_deref().map(|c| &c.data),
            schema: TargetSchema::Resume,
            settings: &self.generator.settings,
        })?;

        let path = self.generator.storage.write_json(&ctx.paths.file_path, &data)?;
        debug!("Stored item data -> {}", sanitize::file_name(&path));

        let item = Arc::new(data);
        ctx.data_files.insert(ArtifactKind::ItemData, path);
        ctx.item_data = Some(Arc::clone(&item));
        ctx.stages.push(StageOutcome::Ok(()).report(Stage::ExtractItem));
        Ok(item)
    }

    fn step_validate(&self, ctx: &mut PipelineContext, item: &Value) -> Result<(), PipelineError> {
        let report = validate_item(item);
        for issue in &report.informational {
            debug!("Informational: {}", issue);
        }

        let violation = report.to_error();
        ctx.validation = Some(report);
        match violation {
            Some(e) => Err(e.into()),
            None => {
                ctx.stages.push(StageOutcome::Ok(()).report(Stage::Validate));
                Ok(())
            }
        }
    }

    fn step_generate(
        &self,
        ctx: &mut PipelineContext,
        item: &Arc<Value>,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let extension = self.generator.renderer.extension().to_string();
        let mut pool: WorkerPool<TaskReport> =
            WorkerPool::new("generation", self.options.generation_workers.max(1))?;
        let mut kinds = Vec::new();

        // Primary document
        {
            let generator = self.generator.clone();
            let data = Arc::clone(item);
            let output_path = self.path_for(ctx, ArtifactKind::Document, Some(&extension))?;
            pool.submit(move || TaskReport {
                kind: ArtifactKind::Document,
                derived: None,
                result: generator.render(ArtifactKind::Document, data, output_path),
            })?;
            kinds.push(ArtifactKind::Document);
        }

        let source = item.to_string();
        let mut match_skipped = None;
        match ctx.shared.clone() {
            Some(shared) => {
                let plan = DerivePlan {
                    kind: ArtifactKind::MatchReport,
                    data_kind: ArtifactKind::MatchData,
                    schema: TargetSchema::MatchReport,
                    source: source.clone(),
                    context: Some(shared),
                    data_path: self.path_for(ctx, ArtifactKind::MatchData, None)?,
                    output_path: self.path_for(ctx, ArtifactKind::MatchReport, Some(&extension))?,
                };
                let generator = self.generator.clone();
                pool.submit(move || generator.derive_and_render(plan))?;
                kinds.push(ArtifactKind::MatchReport);
            }
            None => match_skipped = Some("no job profile".to_string()),
        }

        {
            let plan = DerivePlan {
                kind: ArtifactKind::Feedback,
                data_kind: ArtifactKind::FeedbackData,
                schema: TargetSchema::Feedback,
                source,
                context: ctx.shared.clone(),
                data_path: self.path_for(ctx, ArtifactKind::FeedbackData, None)?,
                output_path: self.path_for(ctx, ArtifactKind::Feedback, Some(&extension))?,
            };
            let generator = self.generator.clone();
            pool.submit(move || generator.derive_and_render(plan))?;
            kinds.push(ArtifactKind::Feedback);
        }

        let total = kinds.len();
        let mut settled = 0;
        let outcomes = pool.join_with(|_, _| {
            settled += 1;
            let percent = 50 + (30 * settled / total) as u8;
            progress.report(ProgressEvent::running(
                percent,
                format!("Generated {} of {} artifacts", settled, total),
            ));
        });

        let mut primary_error = None;
        for (kind, outcome) in kinds.into_iter().zip(outcomes) {
            let report = match outcome {
                TaskOutcome::Completed(report) => report,
                TaskOutcome::Panicked(message) => TaskReport {
                    kind,
                    derived: None,
                    result: Err(GenerationError::Panicked {
                        artifact: kind.to_string(),
                        message,
                    }),
                },
            };

            let stage = stage_for(kind);
            match absorb(ctx, report) {
                Ok(()) => ctx.stages.push(StageOutcome::Ok(()).report(stage)),
                Err(e) => {
                    ctx.stages
                        .push(StageOutcome::<()>::Failed(e.to_string()).report(stage));
                    if kind == ArtifactKind::Document {
                        primary_error = Some(e);
                    } else {
                        warn!("{} unavailable: {}", kind, e);
                        ctx.warnings.push(PipelineWarning::ArtifactFailed {
                            artifact: kind,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(reason) = match_skipped {
            ctx.stages
                .push(StageOutcome::<()>::Skipped(reason).report(Stage::MatchReport));
        }

        match primary_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn step_proposal(&self, ctx: &mut PipelineContext, item: &Value) -> StageOutcome<()> {
        if !self.options.generate_proposal {
            return StageOutcome::Skipped("proposal generation disabled".to_string());
        }
        if ctx.naming.mode != Mode::ProfessionalAnalysis {
            return StageOutcome::Skipped(format!("not available in {} mode", ctx.naming.mode));
        }
        let Some(shared) = ctx.shared.clone() else {
            return StageOutcome::Skipped("no job profile".to_string());
        };
        let match_data = ctx
            .derived
            .get(&ArtifactKind::MatchData)
            .filter(|_| ctx.handles.contains_key(&ArtifactKind::MatchReport))
            .cloned();
        let Some(match_data) = match_data else {
            return StageOutcome::Skipped("match report unavailable".to_string());
        };

        let extension = self.generator.renderer.extension().to_string();
        let paths = self
            .path_for(ctx, ArtifactKind::ProposalData, None)
            .and_then(|data| {
                self.path_for(ctx, ArtifactKind::Proposal, Some(&extension))
                    .map(|output| (data, output))
            });
        let (data_path, output_path) = match paths {
            Ok(paths) => paths,
            Err(e) => return StageOutcome::Failed(e.to_string()),
        };

        let plan = DerivePlan {
            kind: ArtifactKind::Proposal,
            data_kind: ArtifactKind::ProposalData,
            schema: TargetSchema::CoverLetter,
            source: json!({ "item": item, "match": match_data.as_ref() }).to_string(),
            context: Some(shared),
            data_path,
            output_path,
        };

        match absorb(ctx, self.generator.derive_and_render(plan)) {
            Ok(()) => StageOutcome::Ok(()),
            Err(e) => {
                warn!("Proposal unavailable: {}", e);
                ctx.warnings.push(PipelineWarning::ArtifactFailed {
                    artifact: ArtifactKind::Proposal,
                    error: e.to_string(),
                });
                StageOutcome::Failed(e.to_string())
            }
        }
    }

    fn step_dashboard(&self, ctx: &mut PipelineContext, item: &Arc<Value>) -> StageOutcome<()> {
        if !ctx.handles.contains_key(&ArtifactKind::Document) {
            return StageOutcome::Skipped("primary document missing".to_string());
        }

        let output_path = match self.path_for(ctx, ArtifactKind::Dashboard, None) {
            Ok(path) => path,
            Err(e) => return StageOutcome::Failed(e.to_string()),
        };

        let unavailable = ctx
            .stages
            .iter()
            .filter(|s| s.status != StageStatus::Ok)
            .map(|s| match &s.detail {
                Some(detail) => format!("{}: {}", s.stage, detail),
                None => s.stage.to_string(),
            })
            .collect();
        let metadata = DashboardMetadata {
            candidate: ctx.display_name(),
            job_context: ctx.shared.as_ref().map(|s| s.label.clone()),
            mode: ctx.naming.mode,
            timestamp: ctx.paths.timestamp.clone(),
            informational: ctx.informational(),
            unavailable,
        };
        let sections = DashboardSections {
            match_data: ctx.derived.get(&ArtifactKind::MatchData).cloned(),
            feedback: ctx.derived.get(&ArtifactKind::FeedbackData).cloned(),
            proposal: ctx.derived.get(&ArtifactKind::ProposalData).cloned(),
        };

        match self
            .generator
            .render_dashboard(Arc::clone(item), sections, metadata, output_path)
        {
            Ok(handle) => {
                ctx.handles.insert(ArtifactKind::Dashboard, handle);
                StageOutcome::Ok(())
            }
            Err(e) => {
                warn!("Dashboard unavailable: {}", e);
                ctx.warnings.push(PipelineWarning::ArtifactFailed {
                    artifact: ArtifactKind::Dashboard,
                    error: e.to_string(),
                });
                StageOutcome::Failed(e.to_string())
            }
        }
    }

    fn path_for(
        &self,
        ctx: &PipelineContext,
        kind: ArtifactKind,
        extension: Option<&str>,
    ) -> Result<PathBuf, ConfigError> {
        Ok(self.resolver.resolve(&ctx.naming_for(kind, extension))?.file_path)
    }
}

/// Folds one task report into the context and returns its render outcome.
fn absorb(ctx: &mut PipelineContext, report: TaskReport) -> Result<(), GenerationError> {
    if let Some(derived) = report.derived {
        match (derived.path, derived.persist_error) {
            (Some(path), _) => {
                ctx.data_files.insert(derived.kind, path);
            }
            (None, Some(error)) => {
                warn!("{} was not saved: {}", derived.kind, error);
                ctx.warnings.push(PipelineWarning::DataNotPersisted {
                    artifact: derived.kind,
                    error,
                });
            }
            (None, None) => {}
        }
        ctx.derived.insert(derived.kind, derived.data);
    }

    let handle = report.result?;
    ctx.handles.insert(report.kind, handle);
    Ok(())
}

fn stage_for(kind: ArtifactKind) -> Stage {
    match kind {
        ArtifactKind::MatchReport | ArtifactKind::MatchData => Stage::MatchReport,
        ArtifactKind::Feedback | ArtifactKind::FeedbackData => Stage::Feedback,
        ArtifactKind::Proposal | ArtifactKind::ProposalData => Stage::Proposal,
        ArtifactKind::Dashboard => Stage::Dashboard,
        ArtifactKind::ItemData => Stage::ExtractItem,
        ArtifactKind::JobProfile => Stage::ExtractContext,
        ArtifactKind::Document => Stage::Document,
    }
}
