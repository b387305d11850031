use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::artifact::{ArtifactHandle, ArtifactKind};
use crate::collab::SourceDocument;
use crate::naming::{NamingContext, ResolvedPaths};

use super::error::PipelineWarning;
use super::stage::StageReport;
use super::validation::ValidationReport;

/// Structured data of the target document, extracted once and shared
/// read-only by every item that is compared against it.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedContext {
    pub label: String,
    pub data: Value,
    pub persisted_path: Option<PathBuf>,
}

impl SharedContext {
    pub fn new(label: &str, data: Value) -> Self {
        Self {
            label: label.to_string(),
            data,
            persisted_path: None,
        }
    }
}

/// Input for one pipeline run.
#[derive(Debug, Clone)]
pub struct ItemRequest {
    pub source: SourceDocument,
    /// Name used for folder/file naming; defaults to the source label.
    pub candidate_name: Option<String>,
    /// Defaults to the target or shared context label.
    pub job_context_name: Option<String>,
    pub target: Option<SourceDocument>,
    pub shared_context: Option<Arc<SharedContext>>,
    pub timestamp: Option<String>,
    pub is_batch: bool,
}

impl ItemRequest {
    pub fn new(source: SourceDocument) -> Self {
        Self {
            source,
            candidate_name: None,
            job_context_name: None,
            target: None,
            shared_context: None,
            timestamp: None,
            is_batch: false,
        }
    }

    pub fn with_target(mut self, target: SourceDocument) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_candidate_name(mut self, name: &str) -> Self {
        self.candidate_name = Some(name.to_string());
        self
    }

    pub fn with_job_context_name(mut self, name: &str) -> Self {
        self.job_context_name = Some(name.to_string());
        self
    }

    pub fn with_shared_context(mut self, context: Arc<SharedContext>) -> Self {
        self.shared_context = Some(context);
        self
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    pub fn in_batch(mut self) -> Self {
        self.is_batch = true;
        self
    }
}

pub struct PipelineContext {
    // Input
    pub source: SourceDocument,
    pub target: Option<SourceDocument>,

    // Fixed at prepare time; every artifact reuses the timestamp
    pub naming: NamingContext,
    pub paths: ResolvedPaths,

    // Supplied by the batch, or set by extract_context
    pub shared: Option<Arc<SharedContext>>,

    // Set by extract_item
    pub item_data: Option<Arc<Value>>,

    // Set by validate
    pub validation: Option<ValidationReport>,

    // Derived data kept for the dashboard
    pub derived: BTreeMap<ArtifactKind, Arc<Value>>,

    pub data_files: BTreeMap<ArtifactKind, PathBuf>,
    pub handles: BTreeMap<ArtifactKind, ArtifactHandle>,
    pub stages: Vec<StageReport>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(
        source: SourceDocument,
        target: Option<SourceDocument>,
        naming: NamingContext,
        paths: ResolvedPaths,
        shared: Option<Arc<SharedContext>>,
    ) -> Self {
        Self {
            source,
            target,
            naming,
            paths,
            shared,
            item_data: None,
            validation: None,
            derived: BTreeMap::new(),
            data_files: BTreeMap::new(),
            handles: BTreeMap::new(),
            stages: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Naming inputs for one more artifact of this item.
    pub fn naming_for(&self, kind: ArtifactKind, extension: Option<&str>) -> NamingContext {
        let mut naming = self.naming.clone().artifact(kind.as_str());
        naming.extension = extension.map(str::to_string);
        naming
    }

    /// `personal_info.name` from the extracted data, else the naming name.
    pub fn display_name(&self) -> String {
        self.item_data
            .as_deref()
            .and_then(|data| data.pointer("/personal_info/name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.naming.candidate_name)
            .to_string()
    }

    pub fn informational(&self) -> Vec<String> {
        self.validation
            .as_ref()
            .map(|v| v.informational.clone())
            .unwrap_or_default()
    }
}
