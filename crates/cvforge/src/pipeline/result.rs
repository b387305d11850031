use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactHandle, ArtifactKind};
use crate::error::WorkerError;

use super::context::PipelineContext;
use super::stage::StageReport;

/// Final, immutable outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub source_label: String,
    pub success: bool,
    pub candidate_display_name: String,
    /// One slot per deliverable; `None` when it was not produced.
    pub artifact_handles: BTreeMap<ArtifactKind, Option<ArtifactHandle>>,
    pub data_files: BTreeMap<ArtifactKind, PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub informational: Vec<String>,
    pub stages: Vec<StageReport>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl PipelineResult {
    /// Result for a run that never got far enough to build a context.
    pub fn failure(source_label: &str, error: impl Into<String>) -> Self {
        Self {
            source_label: source_label.to_string(),
            success: false,
            candidate_display_name: source_label.to_string(),
            artifact_handles: empty_slots(),
            data_files: BTreeMap::new(),
            output_folder: None,
            informational: Vec::new(),
            stages: Vec::new(),
            warnings: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Result standing in for a batch task that panicked.
    pub fn crashed(index: usize, source_label: &str, message: &str) -> Self {
        let error = WorkerError::TaskPanicked {
            index,
            message: message.to_string(),
        };
        Self::failure(source_label, error.to_string())
    }

    pub(crate) fn from_context(ctx: &PipelineContext, error: Option<String>) -> Self {
        let mut artifact_handles = empty_slots();
        for (kind, handle) in &ctx.handles {
            artifact_handles.insert(*kind, Some(handle.clone()));
        }

        let success = error.is_none() && ctx.handles.contains_key(&ArtifactKind::Document);

        Self {
            source_label: ctx.source.label.clone(),
            success,
            candidate_display_name: ctx.display_name(),
            artifact_handles,
            data_files: ctx.data_files.clone(),
            output_folder: Some(ctx.paths.folder_path.clone()),
            informational: ctx.informational(),
            stages: ctx.stages.clone(),
            warnings: ctx.warnings.iter().map(|w| w.to_string()).collect(),
            error: match error {
                Some(e) => Some(e),
                None if !success => Some("Primary document was not produced".to_string()),
                None => None,
            },
        }
    }

    pub fn handle(&self, kind: ArtifactKind) -> Option<&ArtifactHandle> {
        self.artifact_handles.get(&kind).and_then(Option::as_ref)
    }

    pub fn produced(&self) -> impl Iterator<Item = &ArtifactHandle> {
        self.artifact_handles.values().filter_map(Option::as_ref)
    }
}

fn empty_slots() -> BTreeMap<ArtifactKind, Option<ArtifactHandle>> {
    ArtifactKind::DELIVERABLES
        .iter()
        .map(|kind| (*kind, None))
        .collect()
}
