//! Broadcasting of run progress for real-time event streaming.
//!
//! Any front end (CLI, desktop shell, web server) can subscribe without the
//! pipeline knowing about it.

pub mod progress;

pub use progress::{for_each_update, ProgressBroadcaster, ProgressUpdate};
