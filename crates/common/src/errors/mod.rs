//! Error types for Sanity Ranker
//!
//! Provides a single error enum shared by every crate with:
//! - Distinct variants for store, feature and input failures
//! - HTTP status code mapping for the interactive API
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    InvalidInput,

    // Resource errors (4xxx)
    PaperNotFound,

    // Collaborator errors (7xxx)
    StoreUnavailable,
    FeaturesInvalid,

    // External service errors (8xxx)
    MailError,
    Timeout,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 1001,
            ErrorCode::PaperNotFound => 4002,
            ErrorCode::StoreUnavailable => 7001,
            ErrorCode::FeaturesInvalid => 7002,
            ErrorCode::MailError => 8001,
            ErrorCode::Timeout => 8002,
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    /// A collaborator store could not be opened or read
    #[error("Store unavailable ({store}): {message}")]
    StoreUnavailable { store: String, message: String },

    /// The feature snapshot violates its structural invariants
    #[error("Invalid feature snapshot: {message}")]
    FeaturesInvalid { message: String },

    #[error("Mail delivery failed: {message}")]
    Mail { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a store failure
    pub fn store(store: &str, message: impl Into<String>) -> Self {
        AppError::StoreUnavailable {
            store: store.to_string(),
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidInput { .. } => ErrorCode::InvalidInput,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            AppError::FeaturesInvalid { .. } => ErrorCode::FeaturesInvalid,
            AppError::Mail { .. } => ErrorCode::MailError,
            AppError::Timeout { .. } => ErrorCode::Timeout,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,

            AppError::PaperNotFound { .. } => StatusCode::NOT_FOUND,

            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::FeaturesInvalid { .. }
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            AppError::Mail { .. } => StatusCode::BAD_GATEWAY,

            AppError::StoreUnavailable { .. } | AppError::Timeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::store("io", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::PaperNotFound { id: "2101.00001".into() };
        assert_eq!(err.code(), ErrorCode::PaperNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_unavailable_is_server_error() {
        let err = AppError::store("papers", "file missing");
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_server_error());
        assert!(err.to_string().contains("papers"));
    }

    #[test]
    fn test_io_error_maps_to_store() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    }
}
