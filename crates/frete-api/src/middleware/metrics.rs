//! # Prometheus Metrics
//!
//! Request counters and latency histograms recorded through the `metrics`
//! facade. Whatever recorder the binary installs receives them; the
//! Prometheus handle on [`AppState`] renders them at `/metrics`.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use frete_negotiation::CargoStatus;

use crate::state::AppState;

/// Record `frete_http_requests_total` and `frete_http_request_duration_seconds`
/// per route template and status.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "frete_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "frete_http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(started.elapsed().as_secs_f64());

    response
}

/// GET /metrics — Prometheus text exposition.
///
/// Domain gauges are refreshed from the store on each scrape.
pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => {
            update_domain_gauges(&state);
            (
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                handle.render(),
            )
                .into_response()
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

fn update_domain_gauges(state: &AppState) {
    let cargos = state.cargos.list();
    for status in CargoStatus::ALL {
        let count = cargos.iter().filter(|c| c.status == status).count();
        metrics::gauge!("frete_cargos", "status" => status.as_str()).set(count as f64);
    }
    metrics::gauge!("frete_carrier_ratings").set(state.ratings.read().len() as f64);
}
