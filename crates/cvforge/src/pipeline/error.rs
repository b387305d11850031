use thiserror::Error;

use crate::artifact::ArtifactKind;
use crate::error::{
    ConfigError, ExtractionError, GenerationError, StorageError, ValidationError, WorkerError,
};

/// Failure that moves a pipeline run to FAILED.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Path resolution failed: {0}")]
    Naming(#[from] ConfigError),

    #[error("Item extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Primary document generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storing item data failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Generation pool failed: {0}")]
    Worker(#[from] WorkerError),
}

/// Degradation that does not fail the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    ContextUnavailable { error: String },
    ArtifactFailed { artifact: ArtifactKind, error: String },
    DataNotPersisted { artifact: ArtifactKind, error: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::ContextUnavailable { error } => {
                write!(f, "Continuing without job profile: {}", error)
            }
            PipelineWarning::ArtifactFailed { artifact, error } => {
                write!(f, "{} unavailable: {}", artifact, error)
            }
            PipelineWarning::DataNotPersisted { artifact, error } => {
                write!(f, "{} was not saved: {}", artifact, error)
            }
        }
    }
}
