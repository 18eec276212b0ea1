//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// OpenAPI document for the whole API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Frete API",
        description = "Freight marketplace negotiation service.\n\nShippers publish cargos; carriers submit proposals; shippers accept, reject or counter them. Accepting a proposal rejects every other pending proposal on the cargo and contracts it atomically. Amounts are integer centavos (BRL).",
        license(name = "AGPL-3.0-or-later")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Cargos ──────────────────────────────────────────────────────
        crate::routes::cargos::create_cargo,
        crate::routes::cargos::list_cargos,
        crate::routes::cargos::get_cargo,
        crate::routes::cargos::submit_proposal,
        crate::routes::cargos::list_proposals,
        crate::routes::cargos::best_proposals,
        crate::routes::cargos::start_transit,
        crate::routes::cargos::mark_delivered,
        crate::routes::cargos::cancel_cargo,
        crate::routes::cargos::rate_carrier,
        crate::routes::cargos::get_cargo_rating,
        // ── Proposals ───────────────────────────────────────────────────
        crate::routes::proposals::get_proposal,
        crate::routes::proposals::accept_proposal,
        crate::routes::proposals::reject_proposal,
        crate::routes::proposals::counter_offer,
        crate::routes::proposals::respond_to_counter,
        // ── Carriers ────────────────────────────────────────────────────
        crate::routes::carriers::get_carrier_rating,
    ),
    components(
        schemas(
            crate::state::CargoRecord,
            crate::state::ProposalRecord,
            crate::state::CounterOfferRecord,
            crate::state::RatingRecord,
            crate::state::CarrierRatingRecord,
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::cargos::CreateCargoRequest,
            crate::routes::cargos::SubmitProposalRequest,
            crate::routes::cargos::LifecycleRequest,
            crate::routes::cargos::RateCarrierRequest,
            crate::routes::cargos::BestProposals,
            crate::routes::proposals::NegotiationOutcome,
            crate::routes::proposals::AcceptRequest,
            crate::routes::proposals::RejectRequest,
            crate::routes::proposals::CounterOfferRequest,
            crate::routes::proposals::CounterResponseRequest,
        ),
    ),
    tags(
        (name = "cargos", description = "Cargo publication, proposal submission and ranking, delivery lifecycle, rating"),
        (name = "proposals", description = "Negotiation: accept (with cascade), reject, counter-offer, carrier response"),
        (name = "carriers", description = "Carrier reputation"),
    )
)]
pub struct ApiDoc;

/// Serves the document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
