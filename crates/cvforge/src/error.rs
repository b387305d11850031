use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CvforgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("A job context name is required in {mode} mode")]
    MissingJobContext { mode: String },

    #[error("Invalid timestamp '{0}': only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidTimestamp(String),
}

/// Failure reported by an external collaborator (extractor or renderer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl CollaboratorError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("Extraction of {schema} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        schema: String,
        attempts: u32,
        #[source]
        last: CollaboratorError,
    },

    #[error("Extraction of {schema} failed: {source}")]
    Permanent {
        schema: String,
        #[source]
        source: CollaboratorError,
    },
}

impl ExtractionError {
    /// The error returned by the final collaborator call.
    pub fn last_error(&self) -> &CollaboratorError {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent { source, .. } => source,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Permanent { .. } => 1,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Structural validation failed: {}", .violations.join("; "))]
    Structural { violations: Vec<String> },
}

impl ValidationError {
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Structural { violations } => violations,
        }
    }
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Rendering {artifact} failed: {source}")]
    Render {
        artifact: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("Deriving {artifact} data failed: {source}")]
    Derive {
        artifact: String,
        #[source]
        source: ExtractionError,
    },

    #[error("Rendering {artifact} timed out after {timeout:?}")]
    TimedOut { artifact: String, timeout: Duration },

    #[error("Generating {artifact} panicked: {message}")]
    Panicked { artifact: String, message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Path '{0}' is outside the output directory")]
    OutsideOutputDirectory(PathBuf),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("A {label} pool needs at least one worker")]
    NoWorkers { label: String },

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Task {index} crashed: {message}")]
    TaskPanicked { index: usize, message: String },
}

pub type Result<T> = std::result::Result<T, CvforgeError>;
