//! Error handling for the farm advisory backend
//!
//! Every error carries a stable machine code; upstream and timeout failures
//! are marked retryable so callers can tell them apart from bad input.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{AnalysisError, FieldError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Startup / wiring errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    // External service errors
    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    #[error("{0} timed out")]
    Timeout(&'static str),

    // Input errors
    #[error("Invalid input: {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("No usable data: {0}")]
    NoUsableData(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        AppError::UpstreamUnavailable {
            service,
            message: message.into(),
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamUnavailable { .. } | AppError::Timeout(_) | AppError::ModelUnavailable(_)
        )
    }
}

impl From<FieldError> for AppError {
    fn from(e: FieldError) -> Self {
        AppError::invalid_input(e.field, e.message)
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        AppError::NoUsableData(e.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, code, message, field) = match &self {
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                format!("Configuration error: {}", msg),
                None,
            ),
            AppError::ModelUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MODEL_UNAVAILABLE",
                format!("Model unavailable: {}", msg),
                None,
            ),
            AppError::UpstreamUnavailable { service, message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UPSTREAM_UNAVAILABLE",
                format!("{} is temporarily unavailable: {}", service, message),
                None,
            ),
            AppError::Timeout(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "TIMEOUT",
                format!("{} took too long; please retry", what),
                None,
            ),
            AppError::InvalidInput { field, message } => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                message.clone(),
                Some(field.clone()),
            ),
            AppError::NoUsableData(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_USABLE_DATA",
                msg.clone(),
                None,
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
                None,
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
                None,
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
                None,
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
                retryable,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;
