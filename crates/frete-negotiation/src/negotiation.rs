//! # Negotiation Operations
//!
//! Every operation is a pure function from the current aggregate to the
//! next one. The input is never mutated: the function clones, applies the
//! whole change (including cascades) to the clone, and returns it. A caller
//! holding a lock commits the result by replacing the stored cargo, so a
//! failure part-way through leaves nothing half-applied.
//!
//! ## Accept and cascade
//!
//! [`apply_accept`] sets the target to `Accepted`, rejects every other
//! `Pending` proposal on the cargo, and contracts the cargo. `Rejected` and
//! `Countered` siblings are left as they are.

use serde::{Deserialize, Serialize};

use frete_core::{ProposalId, Timestamp, ValidationError};

use crate::cargo::{Cargo, CargoStatus};
use crate::error::NegotiationError;
use crate::proposal::{CounterOffer, CounterOfferDraft, Proposal, ProposalDraft, ProposalStatus};

/// Reason recorded on siblings rejected by an acceptance.
pub const CASCADE_REJECTION_REASON: &str = "another proposal was accepted";

/// Reason recorded when the carrier declines a counter-offer.
pub const COUNTER_DECLINED_REASON: &str = "counter-offer declined by carrier";

/// Reason recorded on open proposals when the cargo is cancelled.
pub const CARGO_CANCELLED_REASON: &str = "cargo cancelled";

/// A negotiation operation against one cargo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// A carrier submits a proposal. The caller chooses the id.
    Submit {
        proposal_id: ProposalId,
        draft: ProposalDraft,
    },
    /// The shipper accepts a pending proposal.
    Accept { proposal_id: ProposalId },
    /// The shipper rejects a pending or countered proposal.
    Reject {
        proposal_id: ProposalId,
        #[serde(default)]
        reason: Option<String>,
    },
    /// The shipper counters a pending proposal.
    Counter {
        proposal_id: ProposalId,
        offer: CounterOfferDraft,
    },
    /// The carrier accepts or declines a counter-offer.
    RespondToCounter { proposal_id: ProposalId, accept: bool },
    /// The contracted carrier picked up the load.
    StartTransit,
    /// The load arrived.
    MarkDelivered,
    /// The shipper withdraws the cargo.
    Cancel {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl Command {
    /// Short operation name for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Accept { .. } => "accept",
            Self::Reject { .. } => "reject",
            Self::Counter { .. } => "counter",
            Self::RespondToCounter { .. } => "respond_to_counter",
            Self::StartTransit => "start_transit",
            Self::MarkDelivered => "mark_delivered",
            Self::Cancel { .. } => "cancel",
        }
    }

    /// The proposal this command targets, if any.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            Self::Submit { proposal_id, .. }
            | Self::Accept { proposal_id }
            | Self::Reject { proposal_id, .. }
            | Self::Counter { proposal_id, .. }
            | Self::RespondToCounter { proposal_id, .. } => Some(*proposal_id),
            Self::StartTransit | Self::MarkDelivered | Self::Cancel { .. } => None,
        }
    }
}

/// Fail with [`NegotiationError::ConcurrencyConflict`] when the caller's
/// expected version does not match the stored one. `None` skips the check.
pub fn check_version(cargo: &Cargo, expected: Option<u64>) -> Result<(), NegotiationError> {
    match expected {
        Some(expected) if expected != cargo.version => Err(NegotiationError::ConcurrencyConflict {
            cargo_id: cargo.id,
            expected,
            actual: cargo.version,
        }),
        _ => Ok(()),
    }
}

/// Dispatch a [`Command`] to its `apply_*` function.
pub fn apply(cargo: &Cargo, command: &Command, now: Timestamp) -> Result<Cargo, NegotiationError> {
    match command {
        Command::Submit { proposal_id, draft } => {
            apply_submit(cargo, *proposal_id, draft.clone(), now)
        }
        Command::Accept { proposal_id } => apply_accept(cargo, *proposal_id, now),
        Command::Reject {
            proposal_id,
            reason,
        } => apply_reject(cargo, *proposal_id, reason.clone(), now),
        Command::Counter { proposal_id, offer } => {
            apply_counter(cargo, *proposal_id, offer.clone(), now)
        }
        Command::RespondToCounter {
            proposal_id,
            accept,
        } => apply_counter_response(cargo, *proposal_id, *accept, now),
        Command::StartTransit => apply_start_transit(cargo, now),
        Command::MarkDelivered => apply_deliver(cargo, now),
        Command::Cancel { reason } => apply_cancel(cargo, reason.clone(), now),
    }
}

/// Append a new `Pending` proposal.
///
/// The cargo must be `Available` or `Negotiating`. The first proposal on an
/// `Available` cargo moves it to `Negotiating`. A carrier may submit any
/// number of proposals against the same cargo.
pub fn apply_submit(
    cargo: &Cargo,
    proposal_id: ProposalId,
    draft: ProposalDraft,
    now: Timestamp,
) -> Result<Cargo, NegotiationError> {
    if !cargo.status.accepts_proposals() {
        return Err(NegotiationError::transition(
            "cargo",
            cargo.status,
            "new proposal",
            format!("{} is no longer open for proposals", cargo.id),
        ));
    }
    draft.validate()?;
    if cargo.proposal(&proposal_id).is_some() {
        return Err(NegotiationError::Validation(ValidationError::InvalidIdentifier {
            kind: "proposal",
            value: format!("{} already exists", proposal_id.as_uuid()),
        }));
    }

    let mut next = cargo.clone();
    next.proposals
        .push(Proposal::from_draft(proposal_id, cargo.id, draft, now));
    if next.status == CargoStatus::Available {
        next.set_status(CargoStatus::Negotiating, "first proposal received", now)?;
    }
    Ok(bump(next, now))
}

/// Accept `proposal_id` and reject every other pending proposal.
///
/// Fails if the cargo already has an accepted proposal, if the cargo is not
/// negotiating, or if the target is not `Pending`. Afterwards the cargo is
/// `Contracted`, has exactly one accepted proposal and no pending ones.
pub fn apply_accept(
    cargo: &Cargo,
    proposal_id: ProposalId,
    now: Timestamp,
) -> Result<Cargo, NegotiationError> {
    let target = cargo
        .proposal(&proposal_id)
        .ok_or(NegotiationError::ProposalNotFound(proposal_id))?;
    if let Some(accepted) = cargo.accepted_proposal_id {
        return Err(NegotiationError::AlreadyContracted {
            cargo_id: cargo.id,
            accepted,
        });
    }
    if target.status != ProposalStatus::Pending {
        return Err(NegotiationError::transition(
            "proposal",
            target.status,
            ProposalStatus::Accepted,
            format!("{proposal_id} must be pending"),
        ));
    }

    let mut next = cargo.clone();
    next.set_status(
        CargoStatus::Contracted,
        format!("{proposal_id} accepted"),
        now,
    )?;
    for proposal in next.proposals.iter_mut() {
        if proposal.id == proposal_id {
            proposal.transition(ProposalStatus::Accepted, None, now)?;
        } else if proposal.status == ProposalStatus::Pending {
            proposal.transition(
                ProposalStatus::Rejected,
                Some(CASCADE_REJECTION_REASON.to_string()),
                now,
            )?;
        }
    }
    next.accepted_proposal_id = Some(proposal_id);
    Ok(bump(next, now))
}

/// Reject a `Pending` or `Countered` proposal. No cascade.
///
/// Rejecting an already `Rejected` proposal returns the cargo unchanged
/// (same version). Rejecting the `Accepted` proposal fails. If this was the
/// last open proposal on a negotiating cargo, the cargo returns to
/// `Available`.
pub fn apply_reject(
    cargo: &Cargo,
    proposal_id: ProposalId,
    reason: Option<String>,
    now: Timestamp,
) -> Result<Cargo, NegotiationError> {
    let target = cargo
        .proposal(&proposal_id)
        .ok_or(NegotiationError::ProposalNotFound(proposal_id))?;
    if target.status == ProposalStatus::Rejected {
        return Ok(cargo.clone());
    }

    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let mut next = cargo.clone();
    close_proposal(&mut next, proposal_id, reason, now)?;
    Ok(bump(next, now))
}

/// Counter a `Pending` proposal with a new value (and optionally deadline).
pub fn apply_counter(
    cargo: &Cargo,
    proposal_id: ProposalId,
    offer: CounterOfferDraft,
    now: Timestamp,
) -> Result<Cargo, NegotiationError> {
    offer.validate()?;
    let mut next = cargo.clone();
    let proposal = next
        .proposal_mut(&proposal_id)
        .ok_or(NegotiationError::ProposalNotFound(proposal_id))?;
    let reason = format!("countered at {}", offer.value);
    proposal.transition(ProposalStatus::Countered, Some(reason), now)?;
    proposal.counter_offer = Some(CounterOffer {
        value: offer.value,
        deadline: offer.deadline,
        message: offer.message.trim().to_string(),
        created_at: now,
    });
    Ok(bump(next, now))
}

/// The carrier's answer to a counter-offer.
///
/// Accepting adopts the counter's value (and deadline, when given) and puts
/// the proposal back to `Pending` for the shipper to confirm. Declining
/// rejects the proposal.
pub fn apply_counter_response(
    cargo: &Cargo,
    proposal_id: ProposalId,
    accept: bool,
    now: Timestamp,
) -> Result<Cargo, NegotiationError> {
    let target = cargo
        .proposal(&proposal_id)
        .ok_or(NegotiationError::ProposalNotFound(proposal_id))?;
    if target.status != ProposalStatus::Countered {
        let to = if accept {
            ProposalStatus::Pending
        } else {
            ProposalStatus::Rejected
        };
        return Err(NegotiationError::transition(
            "proposal",
            target.status,
            to,
            format!("{proposal_id} has no counter-offer awaiting an answer"),
        ));
    }

    if accept {
        if let Some(accepted) = cargo.accepted_proposal_id {
            return Err(NegotiationError::AlreadyContracted {
                cargo_id: cargo.id,
                accepted,
            });
        }
    }

    let mut next = cargo.clone();
    if !accept {
        close_proposal(
            &mut next,
            proposal_id,
            Some(COUNTER_DECLINED_REASON.to_string()),
            now,
        )?;
        return Ok(bump(next, now));
    }

    let proposal = next
        .proposal_mut(&proposal_id)
        .ok_or(NegotiationError::ProposalNotFound(proposal_id))?;
    let counter = proposal.counter_offer.clone().ok_or_else(|| {
        NegotiationError::transition(
            "proposal",
            ProposalStatus::Countered,
            ProposalStatus::Pending,
            format!("{proposal_id} is countered but carries no counter-offer"),
        )
    })?;
    proposal.transition(
        ProposalStatus::Pending,
        Some(format!("carrier accepted counter-offer of {}", counter.value)),
        now,
    )?;
    proposal.value = counter.value;
    if counter.deadline.is_some() {
        proposal.estimated_delivery = counter.deadline;
    }
    Ok(bump(next, now))
}

/// `Contracted → InTransit`.
pub fn apply_start_transit(cargo: &Cargo, now: Timestamp) -> Result<Cargo, NegotiationError> {
    let mut next = cargo.clone();
    next.set_status(CargoStatus::InTransit, "picked up by carrier", now)?;
    Ok(bump(next, now))
}

/// `InTransit → Delivered`.
pub fn apply_deliver(cargo: &Cargo, now: Timestamp) -> Result<Cargo, NegotiationError> {
    let mut next = cargo.clone();
    next.set_status(CargoStatus::Delivered, "delivered", now)?;
    Ok(bump(next, now))
}

/// Withdraw the cargo. Every open proposal is rejected.
///
/// Allowed from `Available`, `Negotiating` and `Contracted`. An accepted
/// proposal keeps its status as a record of the cancelled contract.
pub fn apply_cancel(
    cargo: &Cargo,
    reason: Option<String>,
    now: Timestamp,
) -> Result<Cargo, NegotiationError> {
    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| CARGO_CANCELLED_REASON.to_string());
    let mut next = cargo.clone();
    next.set_status(CargoStatus::Cancelled, reason, now)?;
    for proposal in next.proposals.iter_mut().filter(|p| p.status.is_open()) {
        proposal.transition(
            ProposalStatus::Rejected,
            Some(CARGO_CANCELLED_REASON.to_string()),
            now,
        )?;
    }
    Ok(bump(next, now))
}

/// Reject one proposal and reopen the cargo if nothing is left open.
fn close_proposal(
    cargo: &mut Cargo,
    proposal_id: ProposalId,
    reason: Option<String>,
    now: Timestamp,
) -> Result<(), NegotiationError> {
    let proposal = cargo
        .proposal_mut(&proposal_id)
        .ok_or(NegotiationError::ProposalNotFound(proposal_id))?;
    proposal.transition(ProposalStatus::Rejected, reason, now)?;
    if cargo.status == CargoStatus::Negotiating && cargo.open_proposals() == 0 {
        cargo.set_status(CargoStatus::Available, "no open proposals left", now)?;
    }
    Ok(())
}

fn bump(mut cargo: Cargo, now: Timestamp) -> Cargo {
    cargo.version += 1;
    cargo.updated_at = now;
    cargo
}
