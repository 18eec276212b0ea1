//! # Proposal Lifecycle
//!
//! A proposal is a carrier's offer against a cargo.
//!
//! ```text
//!            ┌──────────▶ Accepted (terminal)
//!            │
//!   Pending ─┼──────────▶ Rejected (terminal)
//!     ▲      │               ▲
//!     │      └──▶ Countered ─┘
//!     │               │
//!     └───────────────┘  carrier accepts the counter
//! ```
//!
//! A counter-offer is modelled in place: the shipper's counter value is
//! stored on the proposal, which moves to `Countered`. If the carrier
//! accepts, the proposal takes the counter's value and deadline and returns
//! to `Pending`, awaiting the shipper's confirmation. If the carrier
//! declines, the proposal is `Rejected`.

use serde::{Deserialize, Serialize};

use frete_core::error::require_text;
use frete_core::{Amount, CargoId, CarrierId, ProposalId, Timestamp, ValidationError};

use crate::error::NegotiationError;

/// Upper bound on free-text messages.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Upper bound on the vehicle descriptor.
pub const MAX_VEHICLE_LEN: usize = 64;

/// Status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Awaiting the shipper's decision.
    Pending,
    /// Chosen by the shipper. Terminal.
    Accepted,
    /// Refused by the shipper, declined by the carrier, or auto-rejected
    /// when a sibling proposal was accepted. Terminal.
    Rejected,
    /// The shipper proposed a different value; awaiting the carrier.
    Countered,
}

impl ProposalStatus {
    /// All statuses, in declaration order.
    pub const ALL: [ProposalStatus; 4] = [
        Self::Pending,
        Self::Accepted,
        Self::Rejected,
        Self::Countered,
    ];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Countered => "countered",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// Whether the proposal is still under negotiation.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Countered)
    }

    /// States reachable in one step from this one.
    pub fn valid_transitions(&self) -> &'static [ProposalStatus] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Rejected, Self::Countered],
            Self::Countered => &[Self::Pending, Self::Rejected],
            Self::Accepted | Self::Rejected => &[],
        }
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a proposal status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTransitionRecord {
    /// Status before the transition.
    pub from: ProposalStatus,
    /// Status after the transition.
    pub to: ProposalStatus,
    /// When it happened.
    pub timestamp: Timestamp,
    /// Why, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Carrier input for a new proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    /// The submitting carrier.
    pub carrier_id: CarrierId,
    /// Offered freight value.
    pub value: Amount,
    /// Free-text message to the shipper.
    #[serde(default)]
    pub message: String,
    /// Promised delivery date.
    #[serde(default)]
    pub estimated_delivery: Option<Timestamp>,
    /// Vehicle the carrier intends to use (e.g. "truck", "bitrem").
    #[serde(default)]
    pub vehicle: Option<String>,
}

impl ProposalDraft {
    /// Check field-level constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.value.require_positive("value")?;
        if self.message.chars().count() > MAX_MESSAGE_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "message",
                max: MAX_MESSAGE_LEN,
            });
        }
        if let Some(vehicle) = &self.vehicle {
            require_text("vehicle", vehicle, MAX_VEHICLE_LEN)?;
        }
        Ok(())
    }
}

/// Shipper input for a counter-offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterOfferDraft {
    /// The value the shipper is willing to pay.
    pub value: Amount,
    /// New delivery deadline, if it changes.
    #[serde(default)]
    pub deadline: Option<Timestamp>,
    /// Message to the carrier.
    #[serde(default)]
    pub message: String,
}

impl CounterOfferDraft {
    /// Check field-level constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.value.require_positive("value")?;
        if self.message.chars().count() > MAX_MESSAGE_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "message",
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(())
    }
}

/// A counter-offer attached to a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterOffer {
    /// Counter value.
    pub value: Amount,
    /// Counter deadline.
    #[serde(default)]
    pub deadline: Option<Timestamp>,
    /// Message to the carrier.
    pub message: String,
    /// When the shipper countered.
    pub created_at: Timestamp,
}

/// A carrier's offer against a cargo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub cargo_id: CargoId,
    pub carrier_id: CarrierId,
    /// Current offered value. Replaced by the counter value when the
    /// carrier accepts a counter-offer.
    pub value: Amount,
    pub message: String,
    #[serde(default)]
    pub estimated_delivery: Option<Timestamp>,
    #[serde(default)]
    pub vehicle: Option<String>,
    pub status: ProposalStatus,
    /// The most recent counter-offer, if the shipper ever countered.
    #[serde(default)]
    pub counter_offer: Option<CounterOffer>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Ordered log of status changes.
    #[serde(default)]
    pub history: Vec<ProposalTransitionRecord>,
}

impl Proposal {
    /// Build a pending proposal from a validated draft.
    pub(crate) fn from_draft(
        id: ProposalId,
        cargo_id: CargoId,
        draft: ProposalDraft,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            cargo_id,
            carrier_id: draft.carrier_id,
            value: draft.value,
            message: draft.message.trim().to_string(),
            estimated_delivery: draft.estimated_delivery,
            vehicle: draft.vehicle.map(|v| v.trim().to_string()),
            status: ProposalStatus::Pending,
            counter_offer: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        }
    }

    /// Move to `to`, recording the change. Rejects transitions not listed
    /// in [`ProposalStatus::valid_transitions`].
    pub(crate) fn transition(
        &mut self,
        to: ProposalStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        if !self.status.valid_transitions().contains(&to) {
            let why = if self.status.is_terminal() {
                format!("{} is terminal", self.id)
            } else {
                format!("{} must be {} first", self.id, required_for(to))
            };
            return Err(NegotiationError::transition("proposal", self.status, to, why));
        }
        self.history.push(ProposalTransitionRecord {
            from: self.status,
            to,
            timestamp: now,
            reason: reason.clone(),
        });
        if to == ProposalStatus::Rejected {
            self.rejection_reason = reason;
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

/// The status a proposal must be in to move to `to`, for error messages.
fn required_for(to: ProposalStatus) -> &'static str {
    match to {
        ProposalStatus::Accepted | ProposalStatus::Countered => "pending",
        ProposalStatus::Pending => "countered",
        ProposalStatus::Rejected => "pending or countered",
    }
}
