//! Seams to the external collaborators: structured extraction, document
//! rendering and dashboard rendering.
//!
//! The pipeline only ever talks to these traits. `reference` holds simple
//! file-based implementations that make the engine runnable end to end.

pub mod reference;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifact::{ArtifactHandle, ArtifactKind};
use crate::error::CollaboratorError;
use crate::naming::Mode;

pub use reference::{HtmlDashboardRenderer, JsonDocumentRenderer, JsonExtractor};

/// Generation parameters passed explicitly into every collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub model: String,
    pub language: String,
    pub style_preset: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            language: "en".to_string(),
            style_preset: "modern".to_string(),
        }
    }
}

/// Shape the extractor is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSchema {
    Resume,
    JobProfile,
    MatchReport,
    Feedback,
    CoverLetter,
}

impl TargetSchema {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetSchema::Resume => "resume",
            TargetSchema::JobProfile => "job_profile",
            TargetSchema::MatchReport => "match_report",
            TargetSchema::Feedback => "feedback",
            TargetSchema::CoverLetter => "cover_letter",
        }
    }
}

impl std::fmt::Display for TargetSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw input document together with the label used to name its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub label: String,
    pub content: String,
    pub origin: Option<PathBuf>,
}

impl SourceDocument {
    pub fn from_text(label: &str, content: &str) -> Self {
        Self {
            label: label.to_string(),
            content: content.to_string(),
            origin: None,
        }
    }

    /// Reads a document from disk, labelling it with the file stem.
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let label = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        Ok(Self {
            label,
            content,
            origin: Some(path.to_path_buf()),
        })
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

pub struct ExtractionRequest<'a> {
    pub source: &'a str,
    pub context: Option<&'a Value>,
    pub schema: TargetSchema,
    pub settings: &'a GenerationSettings,
}

/// Turns raw text into structured data for a given schema.
pub trait Extractor: Send + Sync {
    fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Value, CollaboratorError>;
}

pub struct RenderRequest<'a> {
    pub kind: ArtifactKind,
    pub data: &'a Value,
    pub settings: &'a GenerationSettings,
    pub output_path: &'a Path,
}

/// Renders structured data into a formatted document at `output_path`.
pub trait DocumentRenderer: Send + Sync {
    /// File extension of the documents this renderer writes.
    fn extension(&self) -> &str {
        "docx"
    }

    fn render(&self, request: &RenderRequest<'_>) -> Result<ArtifactHandle, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardMetadata {
    pub candidate: String,
    pub job_context: Option<String>,
    pub mode: Mode,
    pub timestamp: String,
    pub informational: Vec<String>,
    pub unavailable: Vec<String>,
}

pub struct DashboardInput<'a> {
    pub item: &'a Value,
    pub match_data: Option<&'a Value>,
    pub feedback: Option<&'a Value>,
    pub proposal: Option<&'a Value>,
    pub metadata: &'a DashboardMetadata,
    pub output_path: &'a Path,
}

/// Renders the consolidated HTML view.
pub trait DashboardRenderer: Send + Sync {
    fn render(&self, input: &DashboardInput<'_>) -> Result<ArtifactHandle, CollaboratorError>;
}

/// The three collaborators a pipeline needs.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn Extractor>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub dashboard: Arc<dyn DashboardRenderer>,
}

impl Collaborators {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        renderer: Arc<dyn DocumentRenderer>,
        dashboard: Arc<dyn DashboardRenderer>,
    ) -> Self {
        Self {
            extractor,
            renderer,
            dashboard,
        }
    }

    /// File-based implementations from [`reference`].
    pub fn reference<P: AsRef<Path>>(output_directory: P) -> Self {
        let output_directory = output_directory.as_ref();
        Self {
            extractor: Arc::new(JsonExtractor),
            renderer: Arc::new(JsonDocumentRenderer::new(output_directory)),
            dashboard: Arc::new(HtmlDashboardRenderer::new(output_directory)),
        }
    }
}
