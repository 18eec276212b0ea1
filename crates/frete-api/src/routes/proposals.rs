//! # Proposal Negotiation API
//!
//! Shipper decisions on a proposal (accept, reject, counter-offer) and the
//! carrier's answer to a counter-offer. Each endpoint resolves the owning
//! cargo through the proposal index and runs one negotiation command on it.
//!
//! Accepting a proposal rejects every other pending proposal on the same
//! cargo and contracts the cargo in the same step. The response carries
//! both the proposal and the updated cargo so clients see the cascade.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use frete_core::{Amount, ProposalId};
use frete_negotiation::{Cargo, Command, CounterOfferDraft};

use super::parse_optional_timestamp;
use crate::error::AppError;
use crate::extractors::{extract_optional_json, extract_validated_json, Validate};
use crate::state::{AppState, CargoRecord, ProposalRecord};

/// Result of a negotiation command on a proposal.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NegotiationOutcome {
    pub proposal: ProposalRecord,
    pub cargo: CargoRecord,
}

impl NegotiationOutcome {
    fn new(cargo: &Cargo, proposal_id: ProposalId) -> Result<Self, AppError> {
        let proposal = cargo.proposal(&proposal_id).ok_or_else(|| {
            AppError::Internal(format!("{proposal_id} missing from {}", cargo.id))
        })?;
        Ok(Self {
            proposal: ProposalRecord::from(proposal),
            cargo: CargoRecord::from(cargo),
        })
    }
}

/// Optional body of `accept`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AcceptRequest {
    /// Fail with 409 unless the cargo is still at this version.
    pub expected_version: Option<u64>,
}

impl Validate for AcceptRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Optional body of `reject`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectRequest {
    pub reason: Option<String>,
    /// Fail with 409 unless the cargo is still at this version.
    pub expected_version: Option<u64>,
}

impl Validate for RejectRequest {
    fn validate(&self) -> Result<(), String> {
        match &self.reason {
            Some(reason) if reason.chars().count() > 500 => {
                Err("reason must not exceed 500 characters".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A shipper's counter-offer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CounterOfferRequest {
    pub value_cents: u64,
    /// New delivery deadline (RFC 3339).
    pub deadline: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Fail with 409 unless the cargo is still at this version.
    pub expected_version: Option<u64>,
}

impl CounterOfferRequest {
    fn draft(&self) -> Result<CounterOfferDraft, String> {
        let draft = CounterOfferDraft {
            value: Amount::from_cents(self.value_cents),
            deadline: parse_optional_timestamp("deadline", self.deadline.as_deref())?,
            message: self.message.clone(),
        };
        draft.validate().map_err(|e| e.to_string())?;
        Ok(draft)
    }
}

impl Validate for CounterOfferRequest {
    fn validate(&self) -> Result<(), String> {
        self.draft().map(|_| ())
    }
}

/// The carrier's answer to a counter-offer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CounterResponseRequest {
    /// `true` takes the counter terms and returns the proposal to pending;
    /// `false` rejects the proposal.
    pub accept: bool,
    /// Fail with 409 unless the cargo is still at this version.
    pub expected_version: Option<u64>,
}

impl Validate for CounterResponseRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Build the proposals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/proposals/{id}", get(get_proposal))
        .route("/v1/proposals/{id}/accept", post(accept_proposal))
        .route("/v1/proposals/{id}/reject", post(reject_proposal))
        .route("/v1/proposals/{id}/counter-offer", post(counter_offer))
        .route("/v1/proposals/{id}/counter-response", post(respond_to_counter))
}

fn run(
    state: &AppState,
    proposal_id: ProposalId,
    command: Command,
    expected_version: Option<u64>,
) -> Result<Json<NegotiationOutcome>, AppError> {
    let cargo_id = state.cargo_of(proposal_id)?;
    let cargo = state.execute(cargo_id, &command, expected_version)?;
    Ok(Json(NegotiationOutcome::new(&cargo, proposal_id)?))
}

/// GET /v1/proposals/{id} — Get a proposal.
#[utoipa::path(
    get,
    path = "/v1/proposals/{id}",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    responses(
        (status = 200, description = "Proposal found", body = ProposalRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalRecord>, AppError> {
    let proposal = state.proposal(ProposalId::from_uuid(id))?;
    Ok(Json(ProposalRecord::from(&proposal)))
}

/// POST /v1/proposals/{id}/accept — Accept a pending proposal.
#[utoipa::path(
    post,
    path = "/v1/proposals/{id}/accept",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    request_body = AcceptRequest,
    responses(
        (status = 200, description = "Proposal accepted; siblings rejected; cargo contracted", body = NegotiationOutcome),
        (status = 404, description = "Proposal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already contracted, proposal not pending, or stale version", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn accept_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<NegotiationOutcome>, AppError> {
    let req: AcceptRequest = extract_optional_json(body)?;
    let proposal_id = ProposalId::from_uuid(id);
    run(
        &state,
        proposal_id,
        Command::Accept { proposal_id },
        req.expected_version,
    )
}

/// POST /v1/proposals/{id}/reject — Reject a proposal. Idempotent.
#[utoipa::path(
    post,
    path = "/v1/proposals/{id}/reject",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Proposal rejected (or already was)", body = NegotiationOutcome),
        (status = 404, description = "Proposal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Proposal already accepted, or stale version", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn reject_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<NegotiationOutcome>, AppError> {
    let req: RejectRequest = extract_optional_json(body)?;
    let proposal_id = ProposalId::from_uuid(id);
    run(
        &state,
        proposal_id,
        Command::Reject {
            proposal_id,
            reason: req.reason,
        },
        req.expected_version,
    )
}

/// POST /v1/proposals/{id}/counter-offer — Counter a pending proposal.
#[utoipa::path(
    post,
    path = "/v1/proposals/{id}/counter-offer",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    request_body = CounterOfferRequest,
    responses(
        (status = 200, description = "Proposal countered", body = NegotiationOutcome),
        (status = 404, description = "Proposal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Proposal not pending, or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid counter-offer", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn counter_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<CounterOfferRequest>, JsonRejection>,
) -> Result<Json<NegotiationOutcome>, AppError> {
    let req = extract_validated_json(body)?;
    let offer = req.draft().map_err(AppError::Validation)?;
    let proposal_id = ProposalId::from_uuid(id);
    run(
        &state,
        proposal_id,
        Command::Counter { proposal_id, offer },
        req.expected_version,
    )
}

/// POST /v1/proposals/{id}/counter-response — Carrier accepts or declines a counter-offer.
#[utoipa::path(
    post,
    path = "/v1/proposals/{id}/counter-response",
    params(("id" = Uuid, Path, description = "Proposal ID")),
    request_body = CounterResponseRequest,
    responses(
        (status = 200, description = "Counter-offer answered", body = NegotiationOutcome),
        (status = 404, description = "Proposal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Proposal not countered, cargo already contracted, or stale version", body = crate::error::ErrorBody),
    ),
    tag = "proposals"
)]
pub async fn respond_to_counter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<CounterResponseRequest>, JsonRejection>,
) -> Result<Json<NegotiationOutcome>, AppError> {
    let req = extract_validated_json(body)?;
    let proposal_id = ProposalId::from_uuid(id);
    run(
        &state,
        proposal_id,
        Command::RespondToCounter {
            proposal_id,
            accept: req.accept,
        },
        req.expected_version,
    )
}
