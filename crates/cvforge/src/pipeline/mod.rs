pub mod context;
pub mod error;
mod generate;
pub mod options;
pub mod progress;
pub mod result;
pub mod runner;
pub mod stage;
pub mod validation;

pub use context::{ItemRequest, PipelineContext, SharedContext};
pub use error::{PipelineError, PipelineWarning};
pub use options::{PipelineOptions, MAX_BATCH_WORKERS};
pub use progress::{
    BroadcastProgress, FnProgress, NoopProgress, ProgressEvent, ProgressReporter, ProgressState,
};
pub use result::PipelineResult;
pub use runner::Pipeline;
pub use stage::{Stage, StageOutcome, StageReport, StageStatus};
pub use validation::{validate_item, ValidationReport};
