//! Language model errors

use thiserror::Error;

/// Failure of one `generate` call, classified for the retry policy
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Worth another attempt: rate limit, server error, dropped connection,
    /// timeout, truncated response stream
    #[error("Language model temporarily unavailable: {0}")]
    Transient(String),

    /// Retrying cannot help: bad key, bad request, unusable response
    #[error("Language model request failed: {0}")]
    Fatal(String),

    #[error("Language model still unavailable after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: usize, last: String },
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transient(_))
    }
}
