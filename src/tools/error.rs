//! Errors shared by the single-call tools

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Input rejected before any call was made; shown as a warning
    #[error("{0}")]
    Validation(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The remote service answered with an error or could not be reached
    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Could not load or process {what}: {reason}")]
    Data { what: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        ToolError::Validation(message.into())
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Upstream(err.to_string())
    }
}
