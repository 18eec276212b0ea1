//! # Cargo API
//!
//! Publication and listing of cargos, proposal submission and ranking,
//! the post-contract lifecycle (transit, delivery, cancellation) and the
//! shipper's rating of the carrier once the cargo is delivered.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use frete_core::{Amount, CargoId, CarrierId, ProposalId, ShipperId, Timestamp};
use frete_negotiation::{
    best_rating, best_value, rank_proposals, Cargo, CargoDetails, CargoStatus, Command, Proposal,
    ProposalDraft, ProposalOrdering, ProposalStatus, Score,
};

use super::parse_optional_timestamp;
use crate::error::AppError;
use crate::extractors::{extract_optional_json, extract_validated_json, Validate};
use crate::state::{AppState, CargoRecord, ProposalRecord, RatingRecord};

/// Query parameters for `GET /v1/cargos`.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ListCargosParams {
    /// Maximum number of items to return (default: 100, max: 1000).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
    /// Only cargos in this status.
    pub status: Option<String>,
}

impl ListCargosParams {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 1000;

    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }

    fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    fn status_filter(&self) -> Result<Option<CargoStatus>, AppError> {
        self.status
            .as_deref()
            .map(|name| {
                CargoStatus::from_name(name).ok_or_else(|| {
                    AppError::Validation(format!(
                        "unknown status '{name}'. Valid statuses: {}",
                        CargoStatus::ALL.map(|s| s.as_str()).join(", ")
                    ))
                })
            })
            .transpose()
    }
}

/// Query parameters for `GET /v1/cargos/{id}/proposals`.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ListProposalsParams {
    /// value, rating, newest or oldest (default: oldest).
    pub order: Option<String>,
    /// Only proposals in this status.
    pub status: Option<String>,
}

impl ListProposalsParams {
    fn ordering(&self) -> Result<ProposalOrdering, AppError> {
        match self.order.as_deref() {
            None => Ok(ProposalOrdering::default()),
            Some(name) => ProposalOrdering::from_name(name).ok_or_else(|| {
                AppError::Validation(format!(
                    "unknown order '{name}'. Valid orders: value, rating, newest, oldest"
                ))
            }),
        }
    }

    fn status_filter(&self) -> Result<Option<ProposalStatus>, AppError> {
        self.status
            .as_deref()
            .map(|name| {
                ProposalStatus::ALL
                    .into_iter()
                    .find(|s| s.as_str() == name)
                    .ok_or_else(|| {
                        AppError::Validation(format!(
                            "unknown status '{name}'. \
                             Valid statuses: pending, accepted, rejected, countered"
                        ))
                    })
            })
            .transpose()
    }
}

/// Request to publish a cargo.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCargoRequest {
    pub shipper_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub origin: String,
    pub destination: String,
    pub weight_kg: u32,
    /// Required vehicle type, e.g. "truck", "carreta", "van".
    pub vehicle_type: String,
    pub offered_value_cents: u64,
    /// Latest acceptable delivery date (RFC 3339).
    pub deadline: String,
}

impl CreateCargoRequest {
    fn details(&self) -> Result<CargoDetails, String> {
        let deadline = Timestamp::parse(&self.deadline).map_err(|e| format!("deadline: {e}"))?;
        let details = CargoDetails {
            title: self.title.clone(),
            description: self.description.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            weight_kg: self.weight_kg,
            vehicle_type: self.vehicle_type.clone(),
            offered_value: Amount::from_cents(self.offered_value_cents),
            deadline,
        };
        details.validate().map_err(|e| e.to_string())?;
        Ok(details)
    }
}

impl Validate for CreateCargoRequest {
    fn validate(&self) -> Result<(), String> {
        self.details().map(|_| ())
    }
}

/// Request to submit a proposal against a cargo.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitProposalRequest {
    pub carrier_id: Uuid,
    pub value_cents: u64,
    #[serde(default)]
    pub message: String,
    /// Promised delivery date (RFC 3339).
    pub estimated_delivery: Option<String>,
    pub vehicle: Option<String>,
    /// Fail with 409 unless the cargo is still at this version.
    pub expected_version: Option<u64>,
}

impl SubmitProposalRequest {
    fn draft(&self) -> Result<ProposalDraft, String> {
        let draft = ProposalDraft {
            carrier_id: CarrierId::from_uuid(self.carrier_id),
            value: Amount::from_cents(self.value_cents),
            message: self.message.clone(),
            estimated_delivery: parse_optional_timestamp(
                "estimated_delivery",
                self.estimated_delivery.as_deref(),
            )?,
            vehicle: self.vehicle.clone(),
        };
        draft.validate().map_err(|e| e.to_string())?;
        Ok(draft)
    }
}

impl Validate for SubmitProposalRequest {
    fn validate(&self) -> Result<(), String> {
        self.draft().map(|_| ())
    }
}

/// Optional body of the cargo lifecycle endpoints.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LifecycleRequest {
    /// Fail with 409 unless the cargo is still at this version.
    pub expected_version: Option<u64>,
    /// Reason recorded on cancellation.
    pub reason: Option<String>,
}

impl Validate for LifecycleRequest {
    fn validate(&self) -> Result<(), String> {
        match &self.reason {
            Some(reason) if reason.chars().count() > 500 => {
                Err("reason must not exceed 500 characters".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Request to rate the carrier of a delivered cargo.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RateCarrierRequest {
    /// 1 to 5.
    pub score: u8,
    pub comment: Option<String>,
}

impl Validate for RateCarrierRequest {
    fn validate(&self) -> Result<(), String> {
        Score::new(self.score).map(|_| ()).map_err(|e| e.to_string())
    }
}

/// The strongest open proposals of a cargo.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BestProposals {
    /// Lowest value among open proposals.
    pub best_value: Option<ProposalRecord>,
    /// Open proposal whose carrier has the highest average rating. Absent
    /// when no open proposal comes from a rated carrier.
    pub best_rating: Option<ProposalRecord>,
}

/// Build the cargo router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/cargos", get(list_cargos).post(create_cargo))
        .route("/v1/cargos/{id}", get(get_cargo))
        .route(
            "/v1/cargos/{id}/proposals",
            get(list_proposals).post(submit_proposal),
        )
        .route("/v1/cargos/{id}/proposals/best", get(best_proposals))
        .route("/v1/cargos/{id}/transit", post(start_transit))
        .route("/v1/cargos/{id}/deliver", post(mark_delivered))
        .route("/v1/cargos/{id}/cancel", post(cancel_cargo))
        .route(
            "/v1/cargos/{id}/rating",
            get(get_cargo_rating).post(rate_carrier),
        )
}

/// POST /v1/cargos — Publish a cargo.
#[utoipa::path(
    post,
    path = "/v1/cargos",
    request_body = CreateCargoRequest,
    responses(
        (status = 201, description = "Cargo published", body = CargoRecord),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn create_cargo(
    State(state): State<AppState>,
    body: Result<Json<CreateCargoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CargoRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let details = req.details().map_err(AppError::Validation)?;
    let cargo = Cargo::publish(
        CargoId::new(),
        ShipperId::from_uuid(req.shipper_id),
        details,
        Timestamp::now(),
    )?;
    let record = CargoRecord::from(&cargo);
    state.insert_cargo(cargo);
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/cargos — List cargos, oldest first.
#[utoipa::path(
    get,
    path = "/v1/cargos",
    params(
        ("limit" = Option<usize>, Query, description = "Max items (default 100, max 1000)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
        ("status" = Option<String>, Query, description = "Filter by cargo status"),
    ),
    responses(
        (status = 200, description = "List of cargos", body = Vec<CargoRecord>),
        (status = 422, description = "Unknown status", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn list_cargos(
    State(state): State<AppState>,
    Query(params): Query<ListCargosParams>,
) -> Result<Json<Vec<CargoRecord>>, AppError> {
    let status = params.status_filter()?;
    let mut cargos = state.cargos.list();
    if let Some(status) = status {
        cargos.retain(|c| c.status == status);
    }
    cargos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    let records = cargos
        .iter()
        .skip(params.effective_offset())
        .take(params.effective_limit())
        .map(CargoRecord::from)
        .collect();
    Ok(Json(records))
}

/// GET /v1/cargos/{id} — Get a cargo.
#[utoipa::path(
    get,
    path = "/v1/cargos/{id}",
    params(("id" = Uuid, Path, description = "Cargo ID")),
    responses(
        (status = 200, description = "Cargo found", body = CargoRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn get_cargo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CargoRecord>, AppError> {
    let cargo = state.cargo(CargoId::from_uuid(id))?;
    Ok(Json(CargoRecord::from(&cargo)))
}

/// POST /v1/cargos/{id}/proposals — Submit a proposal.
#[utoipa::path(
    post,
    path = "/v1/cargos/{id}/proposals",
    params(("id" = Uuid, Path, description = "Cargo ID")),
    request_body = SubmitProposalRequest,
    responses(
        (status = 201, description = "Proposal submitted", body = ProposalRecord),
        (status = 404, description = "Cargo not found", body = crate::error::ErrorBody),
        (status = 409, description = "Cargo no longer accepts proposals, or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn submit_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<SubmitProposalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProposalRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let draft = req.draft().map_err(AppError::Validation)?;
    let proposal_id = ProposalId::new();
    let cargo = state.execute(
        CargoId::from_uuid(id),
        &Command::Submit { proposal_id, draft },
        req.expected_version,
    )?;
    let proposal = cargo
        .proposal(&proposal_id)
        .ok_or_else(|| AppError::Internal(format!("{proposal_id} missing after submit")))?;
    Ok((StatusCode::CREATED, Json(ProposalRecord::from(proposal))))
}

/// GET /v1/cargos/{id}/proposals — List a cargo's proposals in the requested order.
#[utoipa::path(
    get,
    path = "/v1/cargos/{id}/proposals",
    params(
        ("id" = Uuid, Path, description = "Cargo ID"),
        ("order" = Option<String>, Query, description = "value, rating, newest or oldest (default oldest)"),
        ("status" = Option<String>, Query, description = "Filter by proposal status"),
    ),
    responses(
        (status = 200, description = "Ranked proposals", body = Vec<ProposalRecord>),
        (status = 404, description = "Cargo not found", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown order or status", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn list_proposals(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListProposalsParams>,
) -> Result<Json<Vec<ProposalRecord>>, AppError> {
    let ordering = params.ordering()?;
    let status = params.status_filter()?;
    let cargo = state.cargo(CargoId::from_uuid(id))?;
    let records = {
        let book = state.ratings.read();
        rank_proposals(&cargo.proposals, ordering, &*book)
            .into_iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .map(ProposalRecord::from)
            .collect()
    };
    Ok(Json(records))
}

/// GET /v1/cargos/{id}/proposals/best — Cheapest and best-rated open proposals.
#[utoipa::path(
    get,
    path = "/v1/cargos/{id}/proposals/best",
    params(("id" = Uuid, Path, description = "Cargo ID")),
    responses(
        (status = 200, description = "Best open proposals", body = BestProposals),
        (status = 404, description = "Cargo not found", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn best_proposals(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BestProposals>, AppError> {
    let cargo = state.cargo(CargoId::from_uuid(id))?;
    let open: Vec<Proposal> = cargo
        .proposals
        .into_iter()
        .filter(|p| p.status.is_open())
        .collect();
    let best = {
        let book = state.ratings.read();
        BestProposals {
            best_value: best_value(&open).map(ProposalRecord::from),
            best_rating: best_rating(&open, &*book).map(ProposalRecord::from),
        }
    };
    Ok(Json(best))
}

/// POST /v1/cargos/{id}/transit — The contracted carrier picked up the load.
#[utoipa::path(
    post,
    path = "/v1/cargos/{id}/transit",
    params(("id" = Uuid, Path, description = "Cargo ID")),
    request_body = LifecycleRequest,
    responses(
        (status = 200, description = "Cargo in transit", body = CargoRecord),
        (status = 404, description = "Cargo not found", body = crate::error::ErrorBody),
        (status = 409, description = "Cargo is not contracted, or stale version", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn start_transit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CargoRecord>, AppError> {
    let req: LifecycleRequest = extract_optional_json(body)?;
    let cargo = state.execute(
        CargoId::from_uuid(id),
        &Command::StartTransit,
        req.expected_version,
    )?;
    Ok(Json(CargoRecord::from(&cargo)))
}

/// POST /v1/cargos/{id}/deliver — The load arrived.
#[utoipa::path(
    post,
    path = "/v1/cargos/{id}/deliver",
    params(("id" = Uuid, Path, description = "Cargo ID")),
    request_body = LifecycleRequest,
    responses(
        (status = 200, description = "Cargo delivered", body = CargoRecord),
        (status = 404, description = "Cargo not found", body = crate::error::ErrorBody),
        (status = 409, description = "Cargo is not in transit, or stale version", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CargoRecord>, AppError> {
    let req: LifecycleRequest = extract_optional_json(body)?;
    let cargo = state.execute(
        CargoId::from_uuid(id),
        &Command::MarkDelivered,
        req.expected_version,
    )?;
    Ok(Json(CargoRecord::from(&cargo)))
}

/// POST /v1/cargos/{id}/cancel — Withdraw the cargo, rejecting open proposals.
#[utoipa::path(
    post,
    path = "/v1/cargos/{id}/cancel",
    params(("id" = Uuid, Path, description = "Cargo ID")),
    request_body = LifecycleRequest,
    responses(
        (status = 200, description = "Cargo cancelled", body = CargoRecord),
        (status = 404, description = "Cargo not found", body = crate::error::ErrorBody),
        (status = 409, description = "Cargo already in transit or terminal, or stale version", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn cancel_cargo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CargoRecord>, AppError> {
    let req: LifecycleRequest = extract_optional_json(body)?;
    let cargo = state.execute(
        CargoId::from_uuid(id),
        &Command::Cancel { reason: req.reason },
        req.expected_version,
    )?;
    Ok(Json(CargoRecord::from(&cargo)))
}

/// GET /v1/cargos/{id}/rating — The rating the shipper gave for this cargo.
#[utoipa::path(
    get,
    path = "/v1/cargos/{id}/rating",
    params(("id" = Uuid, Path, description = "Cargo ID")),
    responses(
        (status = 200, description = "Rating", body = RatingRecord),
        (status = 404, description = "Cargo not found or not rated", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn get_cargo_rating(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RatingRecord>, AppError> {
    let cargo_id = CargoId::from_uuid(id);
    state.cargo(cargo_id)?;
    let book = state.ratings.read();
    book.for_cargo(&cargo_id)
        .map(|rating| Json(RatingRecord::from(rating)))
        .ok_or_else(|| AppError::NotFound(format!("{cargo_id} has not been rated")))
}

/// POST /v1/cargos/{id}/rating — Rate the carrier that delivered the cargo.
#[utoipa::path(
    post,
    path = "/v1/cargos/{id}/rating",
    params(("id" = Uuid, Path, description = "Cargo ID")),
    request_body = RateCarrierRequest,
    responses(
        (status = 201, description = "Rating recorded", body = RatingRecord),
        (status = 404, description = "Cargo not found", body = crate::error::ErrorBody),
        (status = 409, description = "Cargo not delivered, or already rated", body = crate::error::ErrorBody),
        (status = 422, description = "Score out of range", body = crate::error::ErrorBody),
    ),
    tag = "cargos"
)]
pub async fn rate_carrier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<RateCarrierRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RatingRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let score = Score::new(req.score)?;
    let rating = state.rate_carrier(CargoId::from_uuid(id), score, req.comment)?;
    Ok((StatusCode::CREATED, Json(RatingRecord::from(&rating))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{
        body_json, cargo_body, get, post_empty, post_json, proposal_body,
    };
    use tower::ServiceExt;

    fn test_app(state: &AppState) -> Router<()> {
        crate::routes::router().with_state(state.clone())
    }

    async fn create(state: &AppState, value_cents: u64) -> CargoRecord {
        let resp = test_app(state)
            .oneshot(post_json("/v1/cargos", cargo_body(value_cents)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    async fn submit(state: &AppState, cargo_id: Uuid, value_cents: u64) -> ProposalRecord {
        let resp = test_app(state)
            .oneshot(post_json(
                &format!("/v1/cargos/{cargo_id}/proposals"),
                proposal_body(value_cents),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    // ── Request validation ────────────────────────────────────────

    #[test]
    fn create_cargo_request_rejects_blank_title() {
        let mut body = cargo_body(250_000);
        body["title"] = serde_json::json!("   ");
        let req: CreateCargoRequest = serde_json::from_value(body).unwrap();
        let err = req.validate().unwrap_err();
        assert!(err.contains("title"), "got: {err}");
    }

    #[test]
    fn create_cargo_request_rejects_bad_deadline() {
        let mut body = cargo_body(250_000);
        body["deadline"] = serde_json::json!("30/11/2026");
        let req: CreateCargoRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().unwrap_err().starts_with("deadline"));
    }

    #[test]
    fn submit_request_rejects_zero_value() {
        let req: SubmitProposalRequest = serde_json::from_value(proposal_body(0)).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rate_request_bounds_score() {
        let req = RateCarrierRequest {
            score: 6,
            comment: None,
        };
        assert!(req.validate().is_err());
    }

    // ── Handlers ──────────────────────────────────────────────────

    #[tokio::test]
    async fn handler_create_cargo_returns_201() {
        let state = AppState::new();
        let record = create(&state, 250_000).await;
        assert_eq!(record.status, CargoStatus::Available);
        assert_eq!(record.offered_value_cents, 250_000);
        assert_eq!(record.version, 0);
        assert_eq!(state.cargos.len(), 1);
    }

    #[tokio::test]
    async fn handler_create_cargo_malformed_json_returns_400() {
        let state = AppState::new();
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/v1/cargos")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{\"title\":"))
            .unwrap();
        let resp = test_app(&state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn handler_get_unknown_cargo_returns_404() {
        let state = AppState::new();
        let resp = test_app(&state)
            .oneshot(get(&format!("/v1/cargos/{}", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn handler_list_cargos_filters_and_paginates() {
        let state = AppState::new();
        let first = create(&state, 100_000).await;
        create(&state, 200_000).await;
        create(&state, 300_000).await;
        submit(&state, first.id, 90_000).await;

        let resp = test_app(&state).oneshot(get("/v1/cargos?limit=2")).await.unwrap();
        let page: Vec<CargoRecord> = body_json(resp).await;
        assert_eq!(page.len(), 2);

        let resp = test_app(&state)
            .oneshot(get("/v1/cargos?status=negotiating"))
            .await
            .unwrap();
        let negotiating: Vec<CargoRecord> = body_json(resp).await;
        assert_eq!(negotiating.len(), 1);
        assert_eq!(negotiating[0].id, first.id);

        let resp = test_app(&state)
            .oneshot(get("/v1/cargos?status=lost"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn handler_submit_three_proposals_all_pending() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        for value in [230_000, 260_000, 240_000] {
            let p = submit(&state, cargo.id, value).await;
            assert_eq!(p.status, ProposalStatus::Pending);
        }
        let resp = test_app(&state)
            .oneshot(get(&format!("/v1/cargos/{}/proposals?order=value", cargo.id)))
            .await
            .unwrap();
        let ranked: Vec<ProposalRecord> = body_json(resp).await;
        let values: Vec<u64> = ranked.iter().map(|p| p.value_cents).collect();
        assert_eq!(values, vec![230_000, 240_000, 260_000]);
    }

    #[tokio::test]
    async fn handler_submit_with_stale_version_returns_409() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        let mut body = proposal_body(230_000);
        body["expected_version"] = serde_json::json!(3);
        let resp = test_app(&state)
            .oneshot(post_json(&format!("/v1/cargos/{}/proposals", cargo.id), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let err: crate::error::ErrorBody = body_json(resp).await;
        assert_eq!(err.error.code, "VERSION_CONFLICT");
    }

    #[tokio::test]
    async fn handler_list_proposals_unknown_order_returns_422() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        let resp = test_app(&state)
            .oneshot(get(&format!("/v1/cargos/{}/proposals?order=price", cargo.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn handler_transit_before_contract_returns_409() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        let resp = test_app(&state)
            .oneshot(post_empty(&format!("/v1/cargos/{}/transit", cargo.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn handler_cancel_rejects_open_proposals() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        let proposal = submit(&state, cargo.id, 230_000).await;
        let resp = test_app(&state)
            .oneshot(post_json(
                &format!("/v1/cargos/{}/cancel", cargo.id),
                serde_json::json!({"reason": "carga vendida localmente"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let record: CargoRecord = body_json(resp).await;
        assert_eq!(record.status, CargoStatus::Cancelled);
        let proposal = state.proposal(ProposalId::from_uuid(proposal.id)).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Rejected);
    }

    #[tokio::test]
    async fn handler_full_lifecycle_then_rating() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        let proposal = submit(&state, cargo.id, 240_000).await;
        state
            .execute(
                CargoId::from_uuid(cargo.id),
                &Command::Accept {
                    proposal_id: ProposalId::from_uuid(proposal.id),
                },
                None,
            )
            .unwrap();

        for step in ["transit", "deliver"] {
            let resp = test_app(&state)
                .oneshot(post_empty(&format!("/v1/cargos/{}/{step}", cargo.id)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "step {step}");
        }

        let resp = test_app(&state)
            .oneshot(post_json(
                &format!("/v1/cargos/{}/rating", cargo.id),
                serde_json::json!({"score": 5, "comment": "Entrega pontual"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let rating: RatingRecord = body_json(resp).await;
        assert_eq!(rating.carrier_id, proposal.carrier_id);

        let resp = test_app(&state)
            .oneshot(get(&format!("/v1/cargos/{}/rating", cargo.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let stored: RatingRecord = body_json(resp).await;
        assert_eq!(stored.score, 5);
        assert_eq!(stored.comment.as_deref(), Some("Entrega pontual"));

        let resp = test_app(&state)
            .oneshot(post_json(
                &format!("/v1/cargos/{}/rating", cargo.id),
                serde_json::json!({"score": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn handler_unrated_cargo_rating_returns_404() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        let resp = test_app(&state)
            .oneshot(get(&format!("/v1/cargos/{}/rating", cargo.id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn handler_best_proposals_skips_closed_and_unrated() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        let cheapest = submit(&state, cargo.id, 210_000).await;
        let rated = submit(&state, cargo.id, 240_000).await;
        submit(&state, cargo.id, 230_000).await;
        state
            .execute(
                CargoId::from_uuid(cargo.id),
                &Command::Reject {
                    proposal_id: ProposalId::from_uuid(cheapest.id),
                    reason: None,
                },
                None,
            )
            .unwrap();

        let uri = format!("/v1/cargos/{}/proposals/best", cargo.id);
        let resp = test_app(&state).oneshot(get(&uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let best: BestProposals = body_json(resp).await;
        assert_eq!(best.best_value.map(|p| p.value_cents), Some(230_000));
        assert!(best.best_rating.is_none());

        state
            .ratings
            .write()
            .record(frete_negotiation::CarrierRating {
                cargo_id: CargoId::new(),
                carrier_id: CarrierId::from_uuid(rated.carrier_id),
                shipper_id: ShipperId::new(),
                score: Score::new(4).unwrap(),
                comment: None,
                created_at: Timestamp::now(),
            })
            .unwrap();
        let resp = test_app(&state).oneshot(get(&uri)).await.unwrap();
        let best: BestProposals = body_json(resp).await;
        assert_eq!(best.best_rating.map(|p| p.id), Some(rated.id));
    }

    #[tokio::test]
    async fn handler_rating_before_delivery_returns_409() {
        let state = AppState::new();
        let cargo = create(&state, 250_000).await;
        let resp = test_app(&state)
            .oneshot(post_json(
                &format!("/v1/cargos/{}/rating", cargo.id),
                serde_json::json!({"score": 4}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
