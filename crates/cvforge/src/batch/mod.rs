pub mod coordinator;
pub mod report;

pub use coordinator::{BatchCoordinator, BatchRequest};
pub use report::{BatchOutcome, BatchReport};
