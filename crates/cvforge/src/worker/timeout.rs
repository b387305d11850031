use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use log::warn;
use thiserror::Error;

use super::panic_message;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("call timed out after {0:?}")]
    TimedOut(Duration),

    #[error("call panicked: {0}")]
    Panicked(String),

    #[error("failed to spawn call thread: {0}")]
    Spawn(String),
}

/// Runs `f` and gives up waiting after `timeout`.
///
/// With a limit, `f` runs on a dedicated thread which is detached when the
/// limit passes; the thread itself cannot be cancelled and finishes (or
/// hangs) in the background. Without a limit `f` runs inline.
pub fn call_with_timeout<T, F>(label: &str, timeout: Option<Duration>, f: F) -> Result<T, CallError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let Some(limit) = timeout else {
        return catch_unwind(AssertUnwindSafe(f))
            .map_err(|payload| CallError::Panicked(panic_message(payload.as_ref())));
    };

    let (sender, receiver) = bounded(1);
    thread::Builder::new()
        .name(format!("{}-call", label))
        .spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| panic_message(payload.as_ref()));
            // The receiver is gone if the caller already timed out.
            let _ = sender.send(outcome);
        })
        .map_err(|e| CallError::Spawn(e.to_string()))?;

    match receiver.recv_timeout(limit) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(message)) => Err(CallError::Panicked(message)),
        Err(RecvTimeoutError::Timeout) => {
            warn!("{} did not finish within {:?}, abandoning it", label, limit);
            Err(CallError::TimedOut(limit))
        }
        Err(RecvTimeoutError::Disconnected) => Err(CallError::Panicked(
            "call thread exited without a result".to_string(),
        )),
    }
}
