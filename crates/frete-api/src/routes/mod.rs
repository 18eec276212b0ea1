//! # API Route Modules
//!
//! | Prefix                | Module          |
//! |-----------------------|-----------------|
//! | `/v1/cargos/*`        | [`cargos`]      |
//! | `/v1/proposals/*`     | [`proposals`]   |
//! | `/v1/carriers/*`      | [`carriers`]    |

pub mod cargos;
pub mod carriers;
pub mod proposals;

use axum::Router;

use frete_core::Timestamp;

use crate::state::AppState;

/// All `/v1` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(cargos::router())
        .merge(proposals::router())
        .merge(carriers::router())
}

/// Parse an optional RFC 3339 field, naming the field in the error.
pub(crate) fn parse_optional_timestamp(
    field: &str,
    value: Option<&str>,
) -> Result<Option<Timestamp>, String> {
    value
        .map(|raw| Timestamp::parse(raw).map_err(|e| format!("{field}: {e}")))
        .transpose()
}
