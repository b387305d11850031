pub mod retry;

pub use retry::{RetryEvent, RetryHook, RetryPolicy, RetryingExtractor};
