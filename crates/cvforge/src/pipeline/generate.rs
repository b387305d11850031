//! Owned building blocks for the generation tasks.
//!
//! Tasks run on pool threads, so everything they touch is cloned or behind
//! an `Arc`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info_span};

use crate::artifact::{ArtifactHandle, ArtifactKind};
use crate::collab::{
    DashboardInput, DashboardMetadata, DashboardRenderer, DocumentRenderer, ExtractionRequest,
    GenerationSettings, RenderRequest, TargetSchema,
};
use crate::error::GenerationError;
use crate::extract::RetryingExtractor;
use crate::sanitize;
use crate::storage::FileStorage;
use crate::worker::{call_with_timeout, CallError};

use super::context::SharedContext;

#[derive(Clone)]
pub(crate) struct Generator {
    pub extractor: RetryingExtractor,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub dashboard: Arc<dyn DashboardRenderer>,
    pub storage: FileStorage,
    pub settings: GenerationSettings,
    pub timeout: Option<Duration>,
}

/// Structured data derived for an auxiliary artifact.
pub(crate) struct Derived {
    pub kind: ArtifactKind,
    pub data: Arc<Value>,
    pub path: Option<PathBuf>,
    pub persist_error: Option<String>,
}

/// What one generation task hands back to the pipeline.
pub(crate) struct TaskReport {
    pub kind: ArtifactKind,
    pub derived: Option<Derived>,
    pub result: Result<ArtifactHandle, GenerationError>,
}

/// Where a derive-then-render task writes its outputs.
pub(crate) struct DerivePlan {
    pub kind: ArtifactKind,
    pub data_kind: ArtifactKind,
    pub schema: TargetSchema,
    pub source: String,
    pub context: Option<Arc<SharedContext>>,
    pub data_path: PathBuf,
    pub output_path: PathBuf,
}

impl Generator {
    pub fn render(
        &self,
        kind: ArtifactKind,
        data: Arc<Value>,
        output_path: PathBuf,
    ) -> Result<ArtifactHandle, GenerationError> {
        let _span = info_span!("render", artifact = kind.as_str()).entered();
        let renderer = Arc::clone(&self.renderer);
        let settings = self.settings.clone();
        let label = format!("render-{}", kind.as_str());

        let outcome = call_with_timeout(&label, self.timeout, move || {
            renderer.render(&RenderRequest {
                kind,
                data: &data,
                settings: &settings,
                output_path: &output_path,
            })
        });

        let handle = flatten(kind, outcome)?;
        debug!("Rendered {} -> {}", kind, sanitize::file_name(handle.path()));
        Ok(handle)
    }

    /// Derives structured data via the extractor, persists it, then renders.
    pub fn derive_and_render(&self, plan: DerivePlan) -> TaskReport {
        let DerivePlan {
            kind,
            data_kind,
            schema,
            source,
            context,
            data_path,
            output_path,
        } = plan;

        let extracted = {
            let _span = info_span!("derive", artifact = data_kind.as_str()).entered();
            self.extractor.extract(&ExtractionRequest {
                source: &source,
                context: context.as_deref().map(|c| &c.data),
                schema,
                settings: &self.settings,
            })
        };

        let data = match extracted {
            Ok(data) => Arc::new(data),
            Err(e) => {
                return TaskReport {
                    kind,
                    derived: None,
                    result: Err(GenerationError::Derive {
                        artifact: kind.to_string(),
                        source: e,
                    }),
                }
            }
        };

        let (path, persist_error) = match self.storage.write_json(&data_path, data.as_ref()) {
            Ok(path) => (Some(path), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let result = self.render(kind, Arc::clone(&data), output_path);
        TaskReport {
            kind,
            derived: Some(Derived {
                kind: data_kind,
                data,
                path,
                persist_error,
            }),
            result,
        }
    }

    pub fn render_dashboard(
        &self,
        item: Arc<Value>,
        sections: DashboardSections,
        metadata: DashboardMetadata,
        output_path: PathBuf,
    ) -> Result<ArtifactHandle, GenerationError> {
        let _span = info_span!("render", artifact = "dashboard").entered();
        let dashboard = Arc::clone(&self.dashboard);

        let outcome = call_with_timeout("render-dashboard", self.timeout, move || {
            dashboard.render(&DashboardInput {
                item: &item,
                match_data: sections.match_data.as_deref(),
                feedback: sections.feedback.as_deref(),
                proposal: sections.proposal.as_deref(),
                metadata: &metadata,
                output_path: &output_path,
            })
        });

        flatten(ArtifactKind::Dashboard, outcome)
    }
}

/// Optional dashboard sections, owned so they can cross threads.
#[derive(Default)]
pub(crate) struct DashboardSections {
    pub match_data: Option<Arc<Value>>,
    pub feedback: Option<Arc<Value>>,
    pub proposal: Option<Arc<Value>>,
}

fn flatten(
    kind: ArtifactKind,
    outcome: Result<Result<ArtifactHandle, crate::error::CollaboratorError>, CallError>,
) -> Result<ArtifactHandle, GenerationError> {
    let artifact = kind.to_string();
    match outcome {
        Ok(Ok(handle)) => Ok(handle),
        Ok(Err(source)) => Err(GenerationError::Render { artifact, source }),
        Err(CallError::TimedOut(timeout)) => Err(GenerationError::TimedOut { artifact, timeout }),
        Err(CallError::Panicked(message)) | Err(CallError::Spawn(message)) => {
            Err(GenerationError::Panicked { artifact, message })
        }
    }
}
