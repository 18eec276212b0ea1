//! # Carrier API
//!
//! Read-only view of a carrier's ratings.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use frete_core::CarrierId;

use crate::error::AppError;
use crate::state::{AppState, CarrierRatingRecord};

/// Build the carriers router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/carriers/{id}/rating", get(get_carrier_rating))
}

/// GET /v1/carriers/{id}/rating — Average score and individual ratings.
///
/// Unknown carriers are not an error: they simply have no ratings.
#[utoipa::path(
    get,
    path = "/v1/carriers/{id}/rating",
    params(("id" = Uuid, Path, description = "Carrier ID")),
    responses(
        (status = 200, description = "Carrier rating summary", body = CarrierRatingRecord),
    ),
    tag = "carriers"
)]
pub async fn get_carrier_rating(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CarrierRatingRecord>, AppError> {
    let carrier_id = CarrierId::from_uuid(id);
    let book = state.ratings.read();
    let record =
        CarrierRatingRecord::new(book.summary(&carrier_id), &book.for_carrier(&carrier_id));
    Ok(Json(record))
}
