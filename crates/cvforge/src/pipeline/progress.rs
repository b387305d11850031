use serde::{Deserialize, Serialize};

use crate::broadcast::progress::{ProgressBroadcaster, ProgressUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Running,
    Complete,
    Error,
}

/// Progress checkpoint emitted by pipelines and batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
    pub state: ProgressState,
}

impl ProgressEvent {
    pub fn running(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
            state: ProgressState::Running,
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            percent: 100,
            message: message.into(),
            state: ProgressState::Complete,
        }
    }

    pub fn error(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
            state: ProgressState::Error,
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter, used for batch items and unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards every event to a closure.
pub struct FnProgress<F>(pub F);

impl<F> ProgressReporter for FnProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}

/// Bridges pipeline events to a [`ProgressBroadcaster`].
pub struct BroadcastProgress {
    run_id: String,
    label: String,
    broadcaster: ProgressBroadcaster,
}

impl BroadcastProgress {
    /// Tags every update with a fresh run id.
    pub fn new(label: &str, broadcaster: ProgressBroadcaster) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            label: label.to_string(),
            broadcaster,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        self.broadcaster
            .publish(ProgressUpdate::from_event(&self.run_id, &self.label, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(ProgressEvent::running(150, "x").percent, 100);
        assert_eq!(ProgressEvent::error(250, "x").percent, 100);
    }

    #[test]
    fn test_fn_progress_forwards_events() {
        let seen = Mutex::new(Vec::new());
        let progress = FnProgress(|event: ProgressEvent| seen.lock().unwrap().push(event.percent));

        progress.report(ProgressEvent::running(5, "start"));
        progress.report(ProgressEvent::complete("done"));

        assert_eq!(*seen.lock().unwrap(), vec![5, 100]);
    }

    #[test]
    fn test_broadcast_progress_tags_run_id() {
        let broadcaster = ProgressBroadcaster::default();
        let mut rx = broadcaster.subscribe();
        let progress = BroadcastProgress::new("jane", broadcaster);

        progress.report(ProgressEvent::running(40, "Validated"));

        let update = rx.try_recv().unwrap();
        assert_eq!(update.run_id, progress.run_id());
        assert_eq!(update.label, "jane");
        assert_eq!(update.message, "Validated");
    }
}
