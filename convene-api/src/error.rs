//! Error Types for the Convene API
//!
//! This module defines error handling for the procedure layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Codes serialize as SCREAMING_SNAKE_CASE, which is also what the client
//! data layer matches on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use convene_core::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for procedure responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No session was found for the request
    Unauthorized,

    /// Input failed validation
    BadRequest,

    /// Input was not valid JSON
    ParseError,

    /// Entity absent, or owned by someone else
    NotFound,

    /// Procedure exists but was called with the wrong HTTP method
    MethodNotSupported,

    /// Persistence or other unclassified failure
    InternalServerError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::BadRequest | ErrorCode::ParseError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "You must be logged in to access this resource.",
            ErrorCode::BadRequest => "Request validation failed",
            ErrorCode::ParseError => "Input is not valid JSON",
            ErrorCode::NotFound => "Not found",
            ErrorCode::MethodNotSupported => "Method not supported for this procedure",
            ErrorCode::InternalServerError => "Internal server error",
        }
    }

    /// Wire name, as used in metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error returned by every procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (field errors for validation failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an Unauthorized error with the standard message.
    pub fn unauthorized() -> Self {
        Self::from_code(ErrorCode::Unauthorized)
    }

    /// Create a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a NotFound error for an agent.
    pub fn agent_not_found() -> Self {
        Self::not_found("Agent not found")
    }

    /// Create a NotFound error for a meeting.
    pub fn meeting_not_found() -> Self {
        Self::not_found("Meeting not found")
    }

    /// Create a NotFound error for an unknown procedure path.
    pub fn procedure_not_found(path: &str) -> Self {
        Self::not_found(format!("No procedure found on path \"{}\"", path))
    }

    /// Create a BadRequest error listing offending fields.
    pub fn validation_failed(field_errors: BTreeMap<String, Vec<String>>) -> Self {
        Self::from_code(ErrorCode::BadRequest)
            .with_details(serde_json::json!({ "fieldErrors": field_errors }))
    }

    /// Create a BadRequest error without field details.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a ParseError.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    /// Create a MethodNotSupported error.
    pub fn method_not_supported(method: &str, path: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotSupported,
            format!("Unsupported {} request to procedure at path \"{}\"", method, path),
        )
    }

    /// Create an InternalServerError with a caller-safe message.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// Field errors, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.details
            .as_ref()
            .and_then(|d| d.get("fieldErrors"))
            .and_then(|f| f.as_object())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Lets handlers outside the procedure endpoint (health, bootstrap) return
/// `ApiError` directly.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

/// Storage failures never reach the caller in detail.
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Storage operation failed");
        ApiError::from_code(ErrorCode::InternalServerError)
    }
}

/// Convert from tokio_postgres::Error to ApiError.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        ApiError::internal_error("Database operation failed")
    }
}

/// Convert from deadpool_postgres::PoolError to ApiError.
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!("Connection pool error: {:?}", err);
        ApiError::internal_error("Failed to acquire database connection")
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
