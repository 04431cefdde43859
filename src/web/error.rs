//! Error type returned by route handlers

use thiserror::Error;

use super::http::Response;
use crate::remote::RemoteError;
use crate::tools::{LedgerError, ToolError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected input; the dashboard shows it as a warning
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Conflict(String),

    /// A remote host or hosted service failed
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::Conflict(_) => 409,
            ApiError::Upstream(_) => 502,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        if status >= 500 {
            tracing::warn!("Request failed ({}): {}", status, self);
        }
        Response::error(status, &self.to_string())
    }
}

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Upload(_) => ApiError::Upstream(err.to_string()),
            RemoteError::Staging(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Validation(message) => ApiError::BadRequest(message),
            ToolError::Upstream(_) | ToolError::Llm(_) => ApiError::Upstream(err.to_string()),
            ToolError::NotConfigured(_) | ToolError::Data { .. } | ToolError::Io(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Invalid(message) => ApiError::BadRequest(message),
            LedgerError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
            LedgerError::InsufficientBalance => ApiError::Conflict(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(RemoteError::MissingConnection).status(), 400);
        assert_eq!(ApiError::from(RemoteError::Upload("denied".into())).status(), 502);
        assert_eq!(ApiError::from(ToolError::validation("x")).status(), 400);
        assert_eq!(
            ApiError::from(ToolError::Llm(LlmError::Fatal("quota".into()))).status(),
            502
        );
        assert_eq!(ApiError::from(ToolError::NotConfigured("SerpApi key")).status(), 500);
        assert_eq!(ApiError::from(LedgerError::UserNotFound(3)).status(), 404);
        assert_eq!(ApiError::from(LedgerError::InsufficientBalance).status(), 409);
        assert_eq!(ApiError::from(LedgerError::Invalid("x".into())).status(), 400);
    }

    #[test]
    fn test_messages_pass_through() {
        let err = ApiError::from(RemoteError::MissingField("a container name or ID"));
        assert_eq!(err.to_string(), "Please provide a container name or ID.");
    }
}
