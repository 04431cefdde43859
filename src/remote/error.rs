//! Remote tool errors
//!
//! Command *failures* (nonzero exit, unreachable host) are not errors here:
//! they travel inside [`super::CommandResult`] so the caller can show them
//! verbatim. This enum covers what is rejected before anything is dispatched,
//! plus the upload leg of the edit round-trip.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Please provide SSH username and IP address.")]
    MissingConnection,

    #[error("Please provide a name or path for '{operation}'.")]
    MissingTarget { operation: &'static str },

    #[error("Invalid name or path: {0}")]
    InvalidTarget(String),

    #[error("Please provide {0}.")]
    MissingField(&'static str),

    #[error("Error while uploading: {0}")]
    Upload(String),

    #[error("Failed to stage edited content: {0}")]
    Staging(#[from] std::io::Error),
}

impl RemoteError {
    /// Rejected before any remote call was made
    pub fn is_validation(&self) -> bool {
        !matches!(self, RemoteError::Upload(_) | RemoteError::Staging(_))
    }
}
