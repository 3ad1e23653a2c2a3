//! Error types for the summarizer service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::types::{TaskId, TaskState};

/// Result type alias for summarizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Whether a collaborator failure might succeed if tried again later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transient,
    Permanent,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transient => f.write_str("transient"),
            FailureKind::Permanent => f.write_str("permanent"),
        }
    }
}

/// Summarizer service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload rejected before a task was created
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Upload exceeds the configured size ceiling
    #[error("File too large. Maximum size is {max} bytes")]
    FileTooLarge { size: Option<u64>, max: u64 },

    /// Upload exceeds the configured page ceiling
    #[error("Document has {pages} pages, exceeds maximum of {max}")]
    TooManyPages { pages: u32, max: u32 },

    /// Unknown task identifier
    #[error("Task {0} not found")]
    TaskNotFound(String),

    /// Unreadable, empty or oversized document
    #[error("{0}")]
    Content(String),

    /// Summarization backend failure
    #[error("{kind} summarization error: {message}")]
    Summarization { kind: FailureKind, message: String },

    /// A state change was attempted on a task that no longer accepts it
    #[error("Task {task_id} is already {state}")]
    InvalidTransition { task_id: TaskId, state: TaskState },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a content error
    pub fn content(message: impl Into<String>) -> Self {
        Self::Content(message.into())
    }

    /// Create a transient summarization error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Summarization {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    /// Create a permanent summarization error
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Summarization {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for errors raised while checking an upload
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::UnsupportedFileType(_)
                | Error::FileTooLarge { .. }
                | Error::TooManyPages { .. }
        )
    }

    /// True when a retry of the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Summarization {
                kind: FailureKind::Transient,
                ..
            }
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            Error::UnsupportedFileType(msg) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", msg),
            ),
            Error::FileTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "file_too_large",
                self.to_string(),
            ),
            Error::TooManyPages { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "too_many_pages",
                self.to_string(),
            ),
            Error::TaskNotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            Error::Content(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "content_error",
                msg.clone(),
            ),
            Error::Summarization { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "summarization_error",
                self.to_string(),
            ),
            Error::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, "invalid_transition", self.to_string())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_family() {
        assert!(Error::validation("empty").is_validation());
        assert!(Error::FileTooLarge {
            size: Some(2),
            max: 1
        }.is_validation());
        assert!(Error::TooManyPages { pages: 2, max: 1 }.is_validation());
        assert!(!Error::TaskNotFound("x".into()).is_validation());
        assert!(!Error::content("bad pdf").is_validation());
    }

    #[test]
    fn test_summarization_kind_in_message() {
        let err = Error::transient("HTTP 503");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "transient summarization error: HTTP 503");

        let err = Error::permanent("HTTP 401");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_status_codes() {
        let resp = Error::TaskNotFound("abc".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = Error::FileTooLarge {
            size: Some(10),
            max: 5,
        }.into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let resp = Error::UnsupportedFileType(".txt".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_io_errors_convert_and_are_permanent() {
        fn read_missing() -> Result<Vec<u8>> {
            Ok(std::fs::read("/nonexistent/pdf-summarizer/input.pdf")?)
        }

        let err = read_missing().unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_transient());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
