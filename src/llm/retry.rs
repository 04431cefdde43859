//! Language model retry logic
//!
//! Transient failures are retried with a fixed pause between attempts; fatal
//! ones return immediately.

use std::time::Duration;

use tracing::{info, warn};

use super::client::LanguageModel;
use super::error::LlmError;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,

    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Call `model.generate(prompt)` under `policy`.
///
/// Returns the first success, the first fatal error, or
/// [`LlmError::RetriesExhausted`] once every attempt failed transiently.
pub async fn generate_with_retry(
    model: &dyn LanguageModel,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, LlmError> {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match model.generate(prompt).await {
            Ok(text) => return Ok(text),
            Err(LlmError::Transient(msg)) => {
                last_error = msg;
                if attempt < attempts {
                    info!(
                        "Language model attempt {}/{} failed, retrying in {:?}: {}",
                        attempt, attempts, policy.backoff, last_error
                    );
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(e) => {
                warn!("Language model failed with non-retryable error: {}", e);
                return Err(e);
            }
        }
    }

    warn!("Language model failed after {} attempts", attempts);
    Err(LlmError::RetriesExhausted {
        attempts,
        last: last_error,
    })
}
