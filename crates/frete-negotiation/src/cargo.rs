//! # Cargo Aggregate
//!
//! A cargo published by a shipper, together with every proposal carriers
//! have made against it.
//!
//! ## Status
//!
//! ```text
//! Available ──▶ Negotiating ──▶ Contracted ──▶ InTransit ──▶ Delivered
//!     │  ▲            │              │
//!     │  └────────────┤ (last open   │
//!     │               │  proposal    │
//!     ▼               ▼  rejected)   ▼
//!  Cancelled ◀────────┴──────────────┘
//! ```
//!
//! ## Invariants
//!
//! - At most one proposal is `Accepted`, and `accepted_proposal_id` names it.
//! - Once a proposal is accepted no proposal is `Pending`.
//! - `Contracted`, `InTransit` and `Delivered` cargos have an accepted proposal.
//! - `version` increases by one on every change.

use serde::{Deserialize, Serialize};

use frete_core::error::require_text;
use frete_core::{Amount, CargoId, ProposalId, ShipperId, Timestamp, ValidationError};

use crate::error::NegotiationError;
use crate::negotiation::{self, Command};
use crate::proposal::{CounterOfferDraft, Proposal, ProposalDraft, ProposalStatus};

/// Status of a cargo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CargoStatus {
    /// Published; no open proposals.
    Available,
    /// At least one proposal is open.
    Negotiating,
    /// A proposal was accepted.
    Contracted,
    /// The contracted carrier picked up the load.
    InTransit,
    /// Delivered. Terminal.
    Delivered,
    /// Withdrawn by the shipper. Terminal.
    Cancelled,
}

impl CargoStatus {
    /// All statuses, in declaration order.
    pub const ALL: [CargoStatus; 6] = [
        Self::Available,
        Self::Negotiating,
        Self::Contracted,
        Self::InTransit,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Negotiating => "negotiating",
            Self::Contracted => "contracted",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether carriers may still submit proposals.
    pub fn accepts_proposals(&self) -> bool {
        matches!(self, Self::Available | Self::Negotiating)
    }

    /// States reachable in one step from this one.
    pub fn valid_transitions(&self) -> &'static [CargoStatus] {
        match self {
            Self::Available => &[Self::Negotiating, Self::Cancelled],
            Self::Negotiating => &[Self::Available, Self::Contracted, Self::Cancelled],
            Self::Contracted => &[Self::InTransit, Self::Cancelled],
            Self::InTransit => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for CargoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a cargo status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoTransitionRecord {
    pub from: CargoStatus,
    pub to: CargoStatus,
    pub timestamp: Timestamp,
    pub reason: String,
}

/// Descriptive attributes of a cargo, as published by the shipper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoDetails {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub origin: String,
    pub destination: String,
    /// Gross weight in kilograms.
    pub weight_kg: u32,
    /// Required vehicle type (e.g. "truck", "carreta", "van").
    pub vehicle_type: String,
    /// Value the shipper offers for the freight.
    pub offered_value: Amount,
    /// Latest acceptable delivery date.
    pub deadline: Timestamp,
}

impl CargoDetails {
    /// Check field-level constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, 120)?;
        if self.description.chars().count() > 2000 {
            return Err(ValidationError::FieldTooLong {
                field: "description",
                max: 2000,
            });
        }
        require_text("origin", &self.origin, 255)?;
        require_text("destination", &self.destination, 255)?;
        require_text("vehicle_type", &self.vehicle_type, 64)?;
        if self.weight_kg == 0 {
            return Err(ValidationError::NonPositiveAmount { field: "weight_kg" });
        }
        self.offered_value.require_positive("offered_value")?;
        Ok(())
    }
}

/// A cargo and its proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo {
    pub id: CargoId,
    pub shipper_id: ShipperId,
    #[serde(flatten)]
    pub details: CargoDetails,
    pub status: CargoStatus,
    /// Proposals in submission order.
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub accepted_proposal_id: Option<ProposalId>,
    /// Optimistic-concurrency sequence number.
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub transitions: Vec<CargoTransitionRecord>,
}

impl Cargo {
    /// Publish a new cargo in the `Available` state.
    pub fn publish(
        id: CargoId,
        shipper_id: ShipperId,
        details: CargoDetails,
        now: Timestamp,
    ) -> Result<Self, NegotiationError> {
        details.validate()?;
        let details = CargoDetails {
            title: details.title.trim().to_string(),
            description: details.description.trim().to_string(),
            origin: details.origin.trim().to_string(),
            destination: details.destination.trim().to_string(),
            vehicle_type: details.vehicle_type.trim().to_string(),
            ..details
        };
        Ok(Self {
            id,
            shipper_id,
            details,
            status: CargoStatus::Available,
            proposals: Vec::new(),
            accepted_proposal_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        })
    }

    /// Look up a proposal on this cargo.
    pub fn proposal(&self, id: &ProposalId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| &p.id == id)
    }

    pub(crate) fn proposal_mut(&mut self, id: &ProposalId) -> Option<&mut Proposal> {
        self.proposals.iter_mut().find(|p| &p.id == id)
    }

    /// The accepted proposal, if any.
    pub fn accepted_proposal(&self) -> Option<&Proposal> {
        self.accepted_proposal_id
            .as_ref()
            .and_then(|id| self.proposal(id))
    }

    /// Number of proposals currently in `status`.
    pub fn count_by_status(&self, status: ProposalStatus) -> usize {
        self.proposals.iter().filter(|p| p.status == status).count()
    }

    /// Number of proposals still under negotiation.
    pub fn open_proposals(&self) -> usize {
        self.proposals.iter().filter(|p| p.status.is_open()).count()
    }

    /// Validate the aggregate invariants listed in the module docs.
    pub fn check_invariants(&self) -> Result<(), String> {
        let accepted: Vec<&Proposal> = self
            .proposals
            .iter()
            .filter(|p| p.status == ProposalStatus::Accepted)
            .collect();
        if accepted.len() > 1 {
            return Err(format!(
                "{} has {} accepted proposals",
                self.id,
                accepted.len()
            ));
        }
        if accepted.first().map(|p| p.id) != self.accepted_proposal_id {
            return Err(format!(
                "{} accepted_proposal_id does not match proposal statuses",
                self.id
            ));
        }
        if !accepted.is_empty() && self.count_by_status(ProposalStatus::Pending) > 0 {
            return Err(format!("{} has pending proposals after acceptance", self.id));
        }
        let needs_winner = matches!(
            self.status,
            CargoStatus::Contracted | CargoStatus::InTransit | CargoStatus::Delivered
        );
        if needs_winner && accepted.is_empty() {
            return Err(format!("{} is {} without an accepted proposal", self.id, self.status));
        }
        if let Some(p) = self.proposals.iter().find(|p| p.cargo_id != self.id) {
            return Err(format!("{} belongs to {}, not {}", p.id, p.cargo_id, self.id));
        }
        Ok(())
    }

    /// Move the cargo status to `to`, recording the change.
    pub(crate) fn set_status(
        &mut self,
        to: CargoStatus,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        if !self.status.valid_transitions().contains(&to) {
            let why = if self.status.is_terminal() {
                format!("{} is {}", self.id, self.status)
            } else {
                format!("{} cannot move from {}", self.id, self.status)
            };
            return Err(NegotiationError::transition("cargo", self.status, to, why));
        }
        self.transitions.push(CargoTransitionRecord {
            from: self.status,
            to,
            timestamp: now,
            reason: reason.into(),
        });
        self.status = to;
        Ok(())
    }

    /// Check `expected_version`, apply `command`, and commit the result.
    ///
    /// On error `self` is left exactly as it was.
    pub fn execute(
        &mut self,
        command: &Command,
        expected_version: Option<u64>,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        negotiation::check_version(self, expected_version)?;
        let next = negotiation::apply(self, command, now)?;
        debug_assert!(next.check_invariants().is_ok(), "{:?}", next.check_invariants());
        *self = next;
        Ok(())
    }

    /// Submit a carrier proposal. Returns the new proposal's id.
    pub fn submit_proposal(
        &mut self,
        draft: ProposalDraft,
        now: Timestamp,
    ) -> Result<ProposalId, NegotiationError> {
        let proposal_id = ProposalId::new();
        self.execute(&Command::Submit { proposal_id, draft }, None, now)?;
        Ok(proposal_id)
    }

    /// Accept a proposal, rejecting every other pending one.
    pub fn accept_proposal(
        &mut self,
        proposal_id: ProposalId,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        self.execute(&Command::Accept { proposal_id }, None, now)
    }

    /// Reject a proposal. Rejecting an already rejected proposal is a no-op.
    pub fn reject_proposal(
        &mut self,
        proposal_id: ProposalId,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        self.execute(&Command::Reject { proposal_id, reason }, None, now)
    }

    /// Counter a pending proposal with a different value.
    pub fn counter_offer(
        &mut self,
        proposal_id: ProposalId,
        offer: CounterOfferDraft,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        self.execute(&Command::Counter { proposal_id, offer }, None, now)
    }

    /// Record the carrier's answer to a counter-offer.
    pub fn respond_to_counter(
        &mut self,
        proposal_id: ProposalId,
        accept: bool,
        now: Timestamp,
    ) -> Result<(), NegotiationError> {
        self.execute(&Command::RespondToCounter { proposal_id, accept }, None, now)
    }
}
