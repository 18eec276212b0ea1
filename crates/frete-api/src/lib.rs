//! # frete-api — Axum API Service
//!
//! HTTP surface for the freight marketplace, built on Axum/Tower/Tokio.
//! Route handlers parse and validate requests, then delegate every state
//! change to `frete-negotiation` through [`AppState::execute`].
//!
//! ## Routes
//!
//! - `/v1/cargos/*` — publish, list, lifecycle, proposals, rating
//! - `/v1/proposals/*` — accept, reject, counter-offer, counter response
//! - `/v1/carriers/*` — carrier rating summaries
//! - `/openapi.json` — generated OpenAPI document
//! - `/metrics` — Prometheus scrape endpoint
//! - `/health/*` — liveness and readiness probes
//!
//! ## Middleware Stack (Tower)
//!
//! CorsLayer → TraceLayer → MetricsMiddleware → Handler

pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    // Request bodies are small JSON documents.
    let api = Router::new()
        .merge(routes::router())
        .merge(openapi::router())
        .route("/metrics", get(middleware::metrics::render_metrics))
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(api)
}

/// GET /health/liveness — the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/readiness — the store is in memory, so ready once serving.
async fn readiness() -> impl IntoResponse {
    (StatusCode::OK, "ready")
}
