//! # Negotiation Errors
//!
//! Business-rule violations raised by the negotiation core. They are
//! surfaced to the caller as-is; nothing here is retried or swallowed.

use thiserror::Error;

use frete_core::{CargoId, ProposalId, ValidationError};

/// Errors raised by negotiation operations on a [`crate::Cargo`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// The referenced cargo does not exist.
    #[error("{0} not found")]
    CargoNotFound(CargoId),

    /// The referenced proposal does not exist (on the given cargo, or at all).
    #[error("{0} not found")]
    ProposalNotFound(ProposalId),

    /// The requested transition is not valid from the current state.
    #[error("invalid {entity} transition: {from} -> {to} ({reason})")]
    InvalidStateTransition {
        /// `"cargo"` or `"proposal"`.
        entity: &'static str,
        /// Current state name.
        from: String,
        /// Attempted target state name.
        to: String,
        /// Why the transition was refused.
        reason: String,
    },

    /// The cargo already has an accepted proposal.
    #[error("{cargo_id} already contracted with {accepted}")]
    AlreadyContracted {
        /// The contracted cargo.
        cargo_id: CargoId,
        /// The proposal that won.
        accepted: ProposalId,
    },

    /// The caller's view of the cargo is stale.
    #[error("version conflict on {cargo_id}: expected {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The cargo being modified.
        cargo_id: CargoId,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl NegotiationError {
    pub(crate) fn transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidStateTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error reports a conflict with the current state
    /// (as opposed to a missing resource or malformed input).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::InvalidStateTransition { .. }
                | Self::AlreadyContracted { .. }
                | Self::ConcurrencyConflict { .. }
        )
    }
}
