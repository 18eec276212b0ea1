//! # Validation Errors
//!
//! Errors raised when constructing core primitives from untrusted input
//! (request bodies, seed fixtures, replay scripts).

use thiserror::Error;

/// A primitive could not be constructed from the given input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Amount string is not a non-negative decimal with at most two places.
    #[error("invalid amount: \"{0}\" (expected a decimal such as 2300 or 2300.50)")]
    InvalidAmount(String),

    /// Amount must be strictly positive in this context.
    #[error("{field} must be greater than zero")]
    NonPositiveAmount {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Timestamp is not valid RFC 3339.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Identifier is not a valid UUID.
    #[error("invalid {kind} identifier: \"{value}\"")]
    InvalidIdentifier {
        /// Identifier namespace, e.g. `cargo`.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A required text field is empty after trimming.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A text field exceeds its length limit.
    #[error("{field} must not exceed {max} characters")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum accepted length.
        max: usize,
    },
}

/// Require a trimmed, non-empty string no longer than `max` characters.
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(())
}
