//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps negotiation, rating and validation errors to HTTP status codes
//! with a JSON body carrying a machine-readable code and a message.
//! Internal error details never reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use frete_core::ValidationError;
use frete_negotiation::{NegotiationError, RatingError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "VERSION_CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context. Present for version conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body exceeds the configured limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Conflict with the current state of the resource (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller's `expected_version` is stale (409).
    #[error("conflict: {message}")]
    VersionConflict {
        message: String,
        expected: u64,
        actual: u64,
    },

    /// Internal server error (500). Logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::VersionConflict { .. } => (StatusCode::CONFLICT, "VERSION_CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::VersionConflict {
                expected, actual, ..
            } => Some(serde_json::json!({
                "expected_version": expected,
                "current_version": actual,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<NegotiationError> for AppError {
    fn from(err: NegotiationError) -> Self {
        match &err {
            NegotiationError::CargoNotFound(_) | NegotiationError::ProposalNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            NegotiationError::Validation(inner) => Self::from(inner.clone()),
            NegotiationError::ConcurrencyConflict {
                expected, actual, ..
            } => Self::VersionConflict {
                message: err.to_string(),
                expected: *expected,
                actual: *actual,
            },
            NegotiationError::InvalidStateTransition { .. }
            | NegotiationError::AlreadyContracted { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl From<RatingError> for AppError {
    fn from(err: RatingError) -> Self {
        match err {
            RatingError::InvalidScore(_) | RatingError::CommentTooLong => {
                Self::Validation(err.to_string())
            }
            RatingError::NotDelivered { .. } | RatingError::AlreadyRated(_) => {
                Self::Conflict(err.to_string())
            }
            RatingError::NoContractedCarrier(_) => Self::Internal(err.to_string()),
        }
    }
}
