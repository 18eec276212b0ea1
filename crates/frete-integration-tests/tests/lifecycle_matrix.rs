//! Cargo lifecycle transition matrix, exercised through the domain crate
//! and through the HTTP API, plus cross-crate fixture checks.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use frete_api::AppState;
use frete_core::{Amount, CargoId, CarrierId, ProposalId, ShipperId, Timestamp};
use frete_negotiation::{Cargo, CargoDetails, CargoStatus, Command, ProposalDraft};

fn now() -> Timestamp {
    Timestamp::parse("2026-10-16T12:00:00Z").unwrap()
}

fn draft() -> ProposalDraft {
    ProposalDraft {
        carrier_id: CarrierId::new(),
        value: Amount::from_reais(900).unwrap(),
        message: String::new(),
        estimated_delivery: None,
        vehicle: None,
    }
}

fn submit() -> Command {
    Command::Submit {
        proposal_id: ProposalId::new(),
        draft: draft(),
    }
}

/// A cargo driven into `status` through the public operations.
fn cargo_in(status: CargoStatus) -> Cargo {
    let details = CargoDetails {
        title: "Cimento ensacado".to_string(),
        description: String::new(),
        origin: "Sete Lagoas, MG".to_string(),
        destination: "Vitória, ES".to_string(),
        weight_kg: 25_000,
        vehicle_type: "truck".to_string(),
        offered_value: Amount::from_reais(1_000).unwrap(),
        deadline: Timestamp::parse("2026-11-20T12:00:00Z").unwrap(),
    };
    let mut cargo = Cargo::publish(CargoId::new(), ShipperId::new(), details, now()).unwrap();

    let path: &[CargoStatus] = match status {
        CargoStatus::Available => &[],
        CargoStatus::Negotiating => &[CargoStatus::Negotiating],
        CargoStatus::Contracted => &[CargoStatus::Negotiating, CargoStatus::Contracted],
        CargoStatus::InTransit => &[
            CargoStatus::Negotiating,
            CargoStatus::Contracted,
            CargoStatus::InTransit,
        ],
        CargoStatus::Delivered => &[
            CargoStatus::Negotiating,
            CargoStatus::Contracted,
            CargoStatus::InTransit,
            CargoStatus::Delivered,
        ],
        CargoStatus::Cancelled => &[CargoStatus::Cancelled],
    };
    for step in path {
        let command = match step {
            CargoStatus::Negotiating => submit(),
            CargoStatus::Contracted => Command::Accept {
                proposal_id: cargo.proposals[0].id,
            },
            CargoStatus::InTransit => Command::StartTransit,
            CargoStatus::Delivered => Command::MarkDelivered,
            CargoStatus::Cancelled => Command::Cancel { reason: None },
            CargoStatus::Available => unreachable!(),
        };
        cargo.execute(&command, None, now()).unwrap();
    }
    assert_eq!(cargo.status, status);
    cargo
}

#[test]
fn lifecycle_commands_follow_the_transition_table() {
    use CargoStatus::*;

    // (from, command, resulting status or None when refused)
    let table: Vec<(CargoStatus, Command, Option<CargoStatus>)> = vec![
        (Available, submit(), Some(Negotiating)),
        (Available, Command::StartTransit, None),
        (Available, Command::MarkDelivered, None),
        (Available, Command::Cancel { reason: None }, Some(Cancelled)),
        (Negotiating, submit(), Some(Negotiating)),
        (Negotiating, Command::StartTransit, None),
        (Negotiating, Command::MarkDelivered, None),
        (Negotiating, Command::Cancel { reason: None }, Some(Cancelled)),
        (Contracted, submit(), None),
        (Contracted, Command::StartTransit, Some(InTransit)),
        (Contracted, Command::MarkDelivered, None),
        (Contracted, Command::Cancel { reason: None }, Some(Cancelled)),
        (InTransit, submit(), None),
        (InTransit, Command::StartTransit, None),
        (InTransit, Command::MarkDelivered, Some(Delivered)),
        (InTransit, Command::Cancel { reason: None }, None),
        (Delivered, submit(), None),
        (Delivered, Command::StartTransit, None),
        (Delivered, Command::MarkDelivered, None),
        (Delivered, Command::Cancel { reason: None }, None),
        (Cancelled, submit(), None),
        (Cancelled, Command::StartTransit, None),
        (Cancelled, Command::MarkDelivered, None),
        (Cancelled, Command::Cancel { reason: None }, None),
    ];

    for (from, command, expected) in table {
        let mut cargo = cargo_in(from);
        let result = cargo.execute(&command, None, now());
        match expected {
            Some(to) => {
                assert!(result.is_ok(), "{from} + {}: {result:?}", command.name());
                assert_eq!(cargo.status, to, "{from} + {}", command.name());
                if to != from {
                    assert!(from.valid_transitions().contains(&to));
                }
            }
            None => {
                let err = result.expect_err(&format!("{from} + {} should fail", command.name()));
                assert!(err.is_conflict(), "{from} + {}: {err}", command.name());
                assert_eq!(cargo.status, from);
            }
        }
    }
}

async fn post(app: &axum::Router, uri: String) -> StatusCode {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn http_lifecycle_endpoints_map_refusals_to_409() {
    let state = AppState::new();
    let app = frete_api::app(state.clone());

    let available = cargo_in(CargoStatus::Available);
    let contracted = cargo_in(CargoStatus::Contracted);
    let (available_id, contracted_id) = (available.id, contracted.id);
    state.insert_cargo(available);
    state.insert_cargo(contracted);

    let uri = |id: CargoId, op: &str| format!("/v1/cargos/{}/{op}", id.as_uuid());

    assert_eq!(post(&app, uri(available_id, "transit")).await, StatusCode::CONFLICT);
    assert_eq!(post(&app, uri(available_id, "deliver")).await, StatusCode::CONFLICT);
    assert_eq!(post(&app, uri(contracted_id, "deliver")).await, StatusCode::CONFLICT);
    assert_eq!(post(&app, uri(contracted_id, "transit")).await, StatusCode::OK);
    assert_eq!(post(&app, uri(contracted_id, "cancel")).await, StatusCode::CONFLICT);
    assert_eq!(post(&app, uri(contracted_id, "deliver")).await, StatusCode::OK);
    assert_eq!(post(&app, uri(available_id, "cancel")).await, StatusCode::OK);
    assert_eq!(post(&app, uri(CargoId::new(), "cancel")).await, StatusCode::NOT_FOUND);
}

#[test]
fn demo_fixture_passes_cli_check() {
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../frete-api/fixtures/seed.yaml");
    let summary = frete_cli::check::check_seed(&fixture).unwrap();
    assert_eq!(summary.cargos, 2);
    assert_eq!(summary.proposals, 2);
}

#[test]
fn bundled_scenario_replays_cleanly() {
    let script = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../frete-cli/scenarios/counter_then_accept.yaml");
    let text = std::fs::read_to_string(script).unwrap();
    let script = frete_cli::replay::parse_script(&text).unwrap();
    let report = frete_cli::replay::replay(&script).unwrap();
    assert_eq!(report.unmet().count(), 0);
    assert_eq!(report.cargos["soja"].status, CargoStatus::Delivered);
}
