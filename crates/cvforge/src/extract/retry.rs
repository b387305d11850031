use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::collab::{ExtractionRequest, Extractor};
use crate::error::{CollaboratorError, ExtractionError};

/// Bounded exponential backoff: after failed attempt `n` (1-based) the
/// extractor sleeps `base_delay * 2^n` before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Observable retry lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryEvent {
    AttemptFailed {
        schema: String,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        error: CollaboratorError,
    },
    Exhausted {
        schema: String,
        attempts: u32,
        error: CollaboratorError,
    },
    Recovered {
        schema: String,
        attempts: u32,
    },
}

pub type RetryHook = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Wraps an [`Extractor`] with [`RetryPolicy`] semantics.
///
/// Transient failures are retried until the attempt limit; permanent ones
/// surface after the first call.
#[derive(Clone)]
pub struct RetryingExtractor {
    inner: Arc<dyn Extractor>,
    policy: RetryPolicy,
    hook: Option<RetryHook>,
}

impl RetryingExtractor {
    pub fn new(inner: Arc<dyn Extractor>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: RetryHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Value, ExtractionError> {
        self.extract_with_limit(request, self.policy.max_attempts)
    }

    pub fn extract_with_limit(
        &self,
        request: &ExtractionRequest<'_>,
        attempt_limit: u32,
    ) -> Result<Value, ExtractionError> {
        let limit = attempt_limit.max(1);
        let schema = request.schema.as_str();
        let mut attempt = 1;

        loop {
            debug!(schema, attempt, limit, "Extraction attempt");

            match self.inner.extract(request) {
                Ok(value) => {
                    if attempt > 1 {
                        info!(schema, attempts = attempt, "Extraction recovered after retry");
                        self.emit(RetryEvent::Recovered {
                            schema: schema.to_string(),
                            attempts: attempt,
                        });
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    error!(schema, error = %e, "Extraction failed permanently");
                    return Err(ExtractionError::Permanent {
                        schema: schema.to_string(),
                        source: e,
                    });
                }
                Err(e) if attempt >= limit => {
                    error!(schema, attempts = attempt, error = %e, "Extraction retries exhausted");
                    self.emit(RetryEvent::Exhausted {
                        schema: schema.to_string(),
                        attempts: attempt,
                        error: e.clone(),
                    });
                    return Err(ExtractionError::Exhausted {
                        schema: schema.to_string(),
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        schema,
                        attempt,
                        limit,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Extraction attempt failed, retrying"
                    );
                    self.emit(RetryEvent::AttemptFailed {
                        schema: schema.to_string(),
                        attempt,
                        max_attempts: limit,
                        delay,
                        error: e,
                    });
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn emit(&self, event: RetryEvent) {
        if let Some(hook) = &self.hook {
            hook(&event);
        }
    }
}
