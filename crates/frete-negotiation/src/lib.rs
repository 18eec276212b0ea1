//! # frete-negotiation — Proposal Negotiation State Machine
//!
//! The one part of the marketplace with real invariants: carriers submit
//! proposals against a shipper's cargo, and the shipper accepts, rejects or
//! counters them. Accepting one proposal rejects every other pending
//! proposal on the same cargo and contracts the cargo, in one step.
//!
//! ## Modules
//!
//! - **Cargo** (`cargo.rs`): the aggregate root. Owns its proposals in
//!   submission order, carries a version number for optimistic concurrency
//!   and a cargo-status transition log.
//!
//! - **Proposal** (`proposal.rs`): `Pending → {Accepted, Rejected, Countered}`,
//!   `Countered → {Pending, Rejected}`. `Accepted` and `Rejected` are terminal.
//!
//! - **Negotiation** (`negotiation.rs`): pure `apply_*` functions of the form
//!   `(&Cargo, ...) -> Result<Cargo, NegotiationError>`. The caller commits the
//!   returned aggregate; a failed operation leaves the original untouched.
//!
//! - **Ranking** (`ranking.rs`): read-side ordering of proposals by value,
//!   carrier rating or date. Has no bearing on acceptance.
//!
//! - **Rating** (`rating.rs`): shipper ratings of carriers after delivery.
//!
//! ## Design
//!
//! States are enums with validated transitions rather than typestate types:
//! a cargo holds proposals in every state at once, so the state of a
//! proposal is data, not a type parameter.

pub mod cargo;
pub mod error;
pub mod negotiation;
pub mod proposal;
pub mod ranking;
pub mod rating;

pub use cargo::{Cargo, CargoDetails, CargoStatus, CargoTransitionRecord};
pub use error::NegotiationError;
pub use negotiation::{
    apply, apply_accept, apply_cancel, apply_counter, apply_counter_response, apply_deliver,
    apply_reject, apply_start_transit, apply_submit, check_version, Command,
};
pub use proposal::{
    CounterOffer, CounterOfferDraft, Proposal, ProposalDraft, ProposalStatus,
    ProposalTransitionRecord,
};
pub use ranking::{best_rating, best_value, rank_proposals, CarrierRatings, ProposalOrdering};
pub use rating::{rate_delivery, CarrierRating, RatingBook, RatingError, RatingSummary, Score};
