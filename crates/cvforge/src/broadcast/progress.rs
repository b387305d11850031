//! Run progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::pipeline::progress::{ProgressEvent, ProgressState};

/// Progress update for one pipeline or batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Unique run identifier.
    pub run_id: String,
    /// Human-readable name of what is running (candidate or batch label).
    pub label: String,
    /// Overall completion, 0 to 100.
    pub percent: u8,
    /// Human-readable message describing current activity.
    pub message: String,
    pub state: ProgressState,
    /// Timestamp of this update.
    pub timestamp: DateTime<Utc>,
}

impl ProgressUpdate {
    pub fn from_event(run_id: &str, label: &str, event: ProgressEvent) -> Self {
        Self {
            run_id: run_id.to_string(),
            label: label.to_string(),
            percent: event.percent,
            message: event.message,
            state: event.state,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts progress updates to any number of subscribers.
#[derive(Clone)]
pub struct ProgressBroadcaster {
    sender: Arc<broadcast::Sender<ProgressUpdate>>,
}

impl ProgressBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an update to all subscribers.
    pub fn publish(&self, update: ProgressUpdate) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(update);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Feeds every update to `on_update` until all senders are gone, blocking
/// the calling thread. Updates lost to lag are skipped, not fatal.
///
/// Returns the number of skipped updates. Must not be called from inside an
/// async runtime.
pub fn for_each_update<F>(mut receiver: broadcast::Receiver<ProgressUpdate>, mut on_update: F) -> u64
where
    F: FnMut(ProgressUpdate),
{
    let mut skipped = 0;
    loop {
        match receiver.blocking_recv() {
            Ok(update) => on_update(update),
            Err(RecvError::Lagged(n)) => {
                debug!(skipped = n, "Progress subscriber fell behind");
                skipped += n;
            }
            Err(RecvError::Closed) => return skipped,
        }
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
