pub mod artifact;
pub mod batch;
pub mod broadcast;
pub mod collab;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod naming;
pub mod pipeline;
pub mod sanitize;
pub mod storage;
pub mod worker;

pub use artifact::{ArtifactHandle, ArtifactKind};
pub use batch::{BatchCoordinator, BatchOutcome, BatchReport, BatchRequest};
pub use broadcast::{ProgressBroadcaster, ProgressUpdate};
pub use collab::{
    Collaborators, DashboardRenderer, DocumentRenderer, Extractor, GenerationSettings,
    SourceDocument, TargetSchema,
};
pub use config::{load_config, Config};
pub use error::{
    CollaboratorError, ConfigError, CvforgeError, ExtractionError, GenerationError, Result,
    StorageError, ValidationError, WorkerError,
};
pub use extract::{RetryEvent, RetryPolicy, RetryingExtractor};
pub use logging::init_logging;
pub use naming::{Mode, NamingContext, PathResolver, ResolvedPaths};
pub use pipeline::{ItemRequest, Pipeline, PipelineOptions, PipelineResult, SharedContext};
