pub mod pool;
pub mod timeout;

use std::any::Any;

pub use pool::{Task, TaskOutcome, WorkerPool};
pub use timeout::{call_with_timeout, CallError};

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
