//! # Request Extraction & Validation
//!
//! The [`Validate`] trait for request DTOs, and helpers that turn JSON
//! rejections into [`AppError::BadRequest`].

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Business-rule checks beyond what deserialization enforces.
pub trait Validate {
    /// Returns a message describing the first violation.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping deserialization errors to 400.
///
/// Handlers take `body: Result<Json<T>, JsonRejection>` and call this so
/// that malformed input gets the structured error body.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(v)| v).map_err(|err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    })
}

/// [`extract_json`] followed by [`Validate::validate`] (422 on failure).
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse an optional JSON body. An empty body yields `T::default()`.
///
/// Used by command endpoints (`accept`, `transit`, ...) whose body only
/// carries optional fields such as `expected_version`. Handlers take
/// `body: Result<Bytes, BytesRejection>` so an oversized body still gets
/// the structured 413.
pub fn extract_optional_json<T: DeserializeOwned + Default + Validate>(
    body: Result<Bytes, BytesRejection>,
) -> Result<T, AppError> {
    let body = body.map_err(|err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    })?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(&body)
        .map_err(|err| AppError::BadRequest(format!("invalid JSON body: {err}")))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
