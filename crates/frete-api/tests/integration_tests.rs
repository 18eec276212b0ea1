//! # Integration Tests for frete-api
//!
//! Drives the assembled application (`frete_api::app`) end to end: a full
//! negotiation from publication to rating, counter-offer rounds, version
//! conflicts, the OpenAPI document, metrics and seed bootstrap.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use frete_api::bootstrap::{apply_seed, parse_seed};
use frete_api::state::AppState;

/// Helper: build the test app over a fresh state.
fn test_app() -> (axum::Router, AppState) {
    let state = AppState::new();
    (frete_api::app(state.clone()), state)
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: read response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Helper: send a request, return status and JSON body.
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

async fn publish(app: &axum::Router, value_cents: u64) -> Value {
    let (status, cargo) = send(
        app,
        "POST",
        "/v1/cargos",
        Some(json!({
            "shipper_id": Uuid::new_v4(),
            "title": "Milho safrinha",
            "description": "Granel, lona obrigatória",
            "origin": "Rio Verde, GO",
            "destination": "Paranaguá, PR",
            "weight_kg": 32000,
            "vehicle_type": "bitrem",
            "offered_value_cents": value_cents,
            "deadline": "2026-12-01T12:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{cargo}");
    cargo
}

async fn propose(app: &axum::Router, cargo_id: &str, carrier_id: Uuid, value_cents: u64) -> Value {
    let (status, proposal) = send(
        app,
        "POST",
        &format!("/v1/cargos/{cargo_id}/proposals"),
        Some(json!({ "carrier_id": carrier_id, "value_cents": value_cents })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{proposal}");
    proposal
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

// -- Full Negotiation ---------------------------------------------------------

#[tokio::test]
async fn test_publish_negotiate_deliver_and_rate() {
    let (app, _) = test_app();
    let cargo = publish(&app, 450_000).await;
    let cargo_id = id_of(&cargo);
    assert_eq!(cargo["status"], "available");

    let winner_carrier = Uuid::new_v4();
    let winner = propose(&app, &cargo_id, winner_carrier, 420_000).await;
    let loser = propose(&app, &cargo_id, Uuid::new_v4(), 440_000).await;

    let (_, fetched) = send(&app, "GET", &format!("/v1/cargos/{cargo_id}"), None).await;
    assert_eq!(fetched["status"], "negotiating");
    assert_eq!(fetched["open_proposal_count"], 2);

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/v1/proposals/{}/accept", id_of(&winner)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["proposal"]["status"], "accepted");
    assert_eq!(outcome["cargo"]["status"], "contracted");
    assert_eq!(outcome["cargo"]["accepted_proposal_id"], winner["id"]);

    let (_, loser_now) = send(&app, "GET", &format!("/v1/proposals/{}", id_of(&loser)), None).await;
    assert_eq!(loser_now["status"], "rejected");

    // Rating before delivery is refused.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/cargos/{cargo_id}/rating"),
        Some(json!({ "score": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for step in ["transit", "deliver"] {
        let (status, body) =
            send(&app, "POST", &format!("/v1/cargos/{cargo_id}/{step}"), None).await;
        assert_eq!(status, StatusCode::OK, "{step}: {body}");
    }

    let (status, rating) = send(
        &app,
        "POST",
        &format!("/v1/cargos/{cargo_id}/rating"),
        Some(json!({ "score": 4, "comment": "Entregou no prazo" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{rating}");
    assert_eq!(rating["carrier_id"], json!(winner_carrier));

    let (_, summary) =
        send(&app, "GET", &format!("/v1/carriers/{winner_carrier}/rating"), None).await;
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["average"], 4.0);
}

#[tokio::test]
async fn test_counter_offer_round_trip_then_accept() {
    let (app, _) = test_app();
    let cargo = publish(&app, 300_000).await;
    let proposal = propose(&app, &id_of(&cargo), Uuid::new_v4(), 350_000).await;
    let proposal_id = id_of(&proposal);

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/v1/proposals/{proposal_id}/counter-offer"),
        Some(json!({ "value_cents": 320_000, "message": "Fecho em 3.200" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["proposal"]["status"], "countered");
    assert_eq!(outcome["proposal"]["counter_offer"]["value_cents"], 320_000);

    // Accepting while countered is not allowed: the carrier answers first.
    let (status, _) =
        send(&app, "POST", &format!("/v1/proposals/{proposal_id}/accept"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/v1/proposals/{proposal_id}/counter-response"),
        Some(json!({ "accept": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["proposal"]["status"], "pending");
    assert_eq!(outcome["proposal"]["value_cents"], 320_000);

    let (status, outcome) =
        send(&app, "POST", &format!("/v1/proposals/{proposal_id}/accept"), None).await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["cargo"]["status"], "contracted");
}

#[tokio::test]
async fn test_stale_expected_version_is_409_with_details() {
    let (app, _) = test_app();
    let cargo = publish(&app, 200_000).await;
    let cargo_id = id_of(&cargo);
    let proposal = propose(&app, &cargo_id, Uuid::new_v4(), 190_000).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/proposals/{}/accept", id_of(&proposal)),
        Some(json!({ "expected_version": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "VERSION_CONFLICT");
    assert_eq!(body["error"]["details"]["expected_version"], 0);
    assert_eq!(body["error"]["details"]["current_version"], 1);
}

#[tokio::test]
async fn test_cancel_rejects_open_proposals() {
    let (app, _) = test_app();
    let cargo = publish(&app, 150_000).await;
    let cargo_id = id_of(&cargo);
    let proposal = propose(&app, &cargo_id, Uuid::new_v4(), 140_000).await;

    let (status, cancelled) = send(
        &app,
        "POST",
        &format!("/v1/cargos/{cargo_id}/cancel"),
        Some(json!({ "reason": "Carga vendida FOB" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["open_proposal_count"], 0);

    let (_, proposal) =
        send(&app, "GET", &format!("/v1/proposals/{}", id_of(&proposal)), None).await;
    assert_eq!(proposal["status"], "rejected");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/cargos/{cargo_id}/proposals"),
        Some(json!({ "carrier_id": Uuid::new_v4(), "value_cents": 100_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_ids_are_404() {
    let (app, _) = test_app();
    let missing = Uuid::new_v4();
    let (status, body) = send(&app, "GET", &format!("/v1/cargos/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app, "POST", &format!("/v1/proposals/{missing}/accept"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/cargos")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// -- Surface ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_lists_negotiation_paths() {
    let (app, _) = test_app();
    let (status, doc) = send(&app, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/v1/cargos",
        "/v1/cargos/{id}/proposals",
        "/v1/proposals/{id}/accept",
        "/v1/proposals/{id}/counter-offer",
        "/v1/carriers/{id}/rating",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
}

#[tokio::test]
async fn test_metrics_unavailable_without_recorder() {
    let (app, _) = test_app();
    let (status, _) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_seeded_state_is_served() {
    let seed = parse_seed(include_str!("../fixtures/seed.yaml")).unwrap();
    let (app, state) = test_app();
    apply_seed(&state, &seed).unwrap();

    let (status, cargos) = send(&app, "GET", "/v1/cargos?status=negotiating", None).await;
    assert_eq!(status, StatusCode::OK);
    let cargos = cargos.as_array().unwrap();
    assert_eq!(cargos.len(), 1);
    assert_eq!(cargos[0]["title"], "Soja a granel");

    let (_, proposals) = send(
        &app,
        "GET",
        &format!("/v1/cargos/{}/proposals?order=value", id_of(&cargos[0])),
        None,
    )
    .await;
    let values: Vec<u64> = proposals
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["value_cents"].as_u64().unwrap())
        .collect();
    assert_eq!(values, vec![230_000, 260_000]);
}
