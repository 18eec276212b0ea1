//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Cargos**: a [`Store<Cargo>`] keyed by cargo UUID. Each cargo owns its
//!   proposals, so a negotiation command touches exactly one store entry.
//! - **Proposal index**: proposal id → cargo id, for the `/v1/proposals/*`
//!   routes.
//! - **Ratings**: the [`RatingBook`] of carrier ratings.
//!
//! Every negotiation command runs through [`AppState::execute`], which
//! applies it inside [`Store::try_update`]: the read, the validation, the
//! cascade and the commit all happen under one write lock. Two concurrent
//! accepts on the same cargo are therefore serialized, and the second one
//! sees the first one's result.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use frete_core::{CargoId, ProposalId, Timestamp, ValidationError};
use frete_negotiation::{
    rate_delivery, Cargo, CargoStatus, CargoTransitionRecord, CarrierRating, Command,
    CounterOffer, NegotiationError, Proposal, ProposalStatus, ProposalTransitionRecord,
    RatingBook, RatingSummary, Score,
};

use crate::error::AppError;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory map keyed by UUID.
///
/// The lock is a `parking_lot::RwLock` and is never held across an
/// `.await`, so every method is synchronous.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Snapshot of one record.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// Snapshot of all records, in no particular order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Run `f` against the stored record under the write lock.
    ///
    /// `None` if the record does not exist. Otherwise the closure's result.
    /// A closure that fails must leave the record untouched.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Whether a record exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Configuration ------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parse `pretty` or `json` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// TCP port to bind.
    pub port: u16,
    /// YAML fixture loaded into the store at startup.
    pub seed_file: Option<PathBuf>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Default port when neither `FRETE_PORT` nor `PORT` is set.
    pub const DEFAULT_PORT: u16 = 8080;

    /// Read `FRETE_PORT` (or `PORT`), `FRETE_SEED_FILE` and
    /// `FRETE_LOG_FORMAT` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    /// Unparseable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("FRETE_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(Self::DEFAULT_PORT);
        let seed_file = lookup("FRETE_SEED_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        let log_format = lookup("FRETE_LOG_FORMAT")
            .and_then(|f| LogFormat::from_name(&f))
            .unwrap_or_default();
        Self {
            port,
            seed_file,
            log_format,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: Self::DEFAULT_PORT,
            seed_file: None,
            log_format: LogFormat::Pretty,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state. Cheap to clone: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cargos: Store<Cargo>,
    proposal_index: Arc<RwLock<HashMap<ProposalId, CargoId>>>,
    pub ratings: Arc<RwLock<RatingBook>>,
    /// Prometheus handle rendered at `/metrics`. `None` when no recorder
    /// was installed (tests, `frete check`).
    pub metrics: Option<PrometheusHandle>,
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cargos", &self.cargos.len())
            .field("proposals", &self.proposal_index.read().len())
            .field("ratings", &self.ratings.read().len())
            .field("metrics", &self.metrics.as_ref().map(|_| "[installed]"))
            .field("config", &self.config)
            .finish()
    }
}

impl AppState {
    /// Empty state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Empty state with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            cargos: Store::new(),
            proposal_index: Arc::new(RwLock::new(HashMap::new())),
            ratings: Arc::new(RwLock::new(RatingBook::new())),
            metrics: None,
            config,
        }
    }

    /// Attach the Prometheus handle served at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Store a cargo and index its proposals.
    pub fn insert_cargo(&self, cargo: Cargo) {
        {
            let mut index = self.proposal_index.write();
            for proposal in &cargo.proposals {
                index.insert(proposal.id, cargo.id);
            }
        }
        tracing::info!(cargo_id = %cargo.id, shipper_id = %cargo.shipper_id, "cargo published");
        metrics::counter!("frete_cargos_published_total").increment(1);
        self.cargos.insert(*cargo.id.as_uuid(), cargo);
    }

    /// Snapshot of a cargo.
    pub fn cargo(&self, id: CargoId) -> Result<Cargo, NegotiationError> {
        self.cargos
            .get(id.as_uuid())
            .ok_or(NegotiationError::CargoNotFound(id))
    }

    /// The cargo a proposal was submitted against.
    pub fn cargo_of(&self, proposal_id: ProposalId) -> Result<CargoId, NegotiationError> {
        self.proposal_index
            .read()
            .get(&proposal_id)
            .copied()
            .ok_or(NegotiationError::ProposalNotFound(proposal_id))
    }

    /// Snapshot of a proposal.
    pub fn proposal(&self, proposal_id: ProposalId) -> Result<Proposal, NegotiationError> {
        let cargo = self.cargo(self.cargo_of(proposal_id)?)?;
        cargo
            .proposal(&proposal_id)
            .cloned()
            .ok_or(NegotiationError::ProposalNotFound(proposal_id))
    }

    /// Apply `command` to a cargo atomically and return the committed cargo.
    pub fn execute(
        &self,
        cargo_id: CargoId,
        command: &Command,
        expected_version: Option<u64>,
    ) -> Result<Cargo, NegotiationError> {
        let started = Instant::now();
        let now = Timestamp::now();
        let apply = || {
            self.cargos
                .try_update(cargo_id.as_uuid(), |cargo: &mut Cargo| {
                    cargo.execute(command, expected_version, now)?;
                    Ok::<_, NegotiationError>(cargo.clone())
                })
                .unwrap_or(Err(NegotiationError::CargoNotFound(cargo_id)))
        };
        // Proposal ids are global: the index write lock is held across the
        // submit so the same id cannot land on two cargos.
        let result = match command {
            Command::Submit { proposal_id, .. } => {
                let mut index = self.proposal_index.write();
                if index.contains_key(proposal_id) {
                    Err(duplicate_proposal(*proposal_id))
                } else {
                    let applied = apply();
                    if applied.is_ok() {
                        index.insert(*proposal_id, cargo_id);
                    }
                    applied
                }
            }
            _ => apply(),
        };

        metrics::counter!(
            "frete_negotiation_commands_total",
            "op" => command.name(),
            "outcome" => outcome_label(&result)
        )
        .increment(1);
        metrics::histogram!("frete_negotiation_command_seconds", "op" => command.name())
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(cargo) => {
                tracing::info!(
                    cargo_id = %cargo_id,
                    op = command.name(),
                    version = cargo.version,
                    status = %cargo.status,
                    "negotiation command applied"
                );
            }
            Err(err) => {
                tracing::debug!(
                    cargo_id = %cargo_id,
                    op = command.name(),
                    error = %err,
                    "negotiation command refused"
                );
            }
        }
        result
    }

    /// Record the shipper's rating of a delivered cargo's carrier.
    pub fn rate_carrier(
        &self,
        cargo_id: CargoId,
        score: Score,
        comment: Option<String>,
    ) -> Result<CarrierRating, AppError> {
        let cargo = self.cargo(cargo_id)?;
        let rating = rate_delivery(&cargo, score, comment, Timestamp::now())?;
        self.ratings.write().record(rating.clone())?;
        tracing::info!(
            cargo_id = %cargo_id,
            carrier_id = %rating.carrier_id,
            score = rating.score.stars(),
            "carrier rated"
        );
        Ok(rating)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate_proposal(proposal_id: ProposalId) -> NegotiationError {
    NegotiationError::Validation(ValidationError::InvalidIdentifier {
        kind: "proposal",
        value: format!("{} already exists", proposal_id.as_uuid()),
    })
}

fn outcome_label(result: &Result<Cargo, NegotiationError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(NegotiationError::CargoNotFound(_) | NegotiationError::ProposalNotFound(_)) => {
            "not_found"
        }
        Err(NegotiationError::Validation(_)) => "invalid",
        Err(_) => "conflict",
    }
}

// -- API Record Types ---------------------------------------------------------
//
// Wire representations of the domain types. Amounts travel as integer
// centavos, identifiers as bare UUIDs.

/// A cargo as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CargoRecord {
    pub id: Uuid,
    pub shipper_id: Uuid,
    pub title: String,
    pub description: String,
    pub origin: String,
    pub destination: String,
    pub weight_kg: u32,
    pub vehicle_type: String,
    pub offered_value_cents: u64,
    pub deadline: DateTime<Utc>,
    /// available, negotiating, contracted, in_transit, delivered, cancelled.
    #[schema(value_type = String)]
    pub status: CargoStatus,
    pub accepted_proposal_id: Option<Uuid>,
    /// Pass back as `expected_version` to detect concurrent changes.
    pub version: u64,
    pub proposal_count: usize,
    pub open_proposal_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(value_type = Vec<Object>)]
    pub transitions: Vec<CargoTransitionRecord>,
}

impl From<&Cargo> for CargoRecord {
    fn from(cargo: &Cargo) -> Self {
        Self {
            id: *cargo.id.as_uuid(),
            shipper_id: *cargo.shipper_id.as_uuid(),
            title: cargo.details.title.clone(),
            description: cargo.details.description.clone(),
            origin: cargo.details.origin.clone(),
            destination: cargo.details.destination.clone(),
            weight_kg: cargo.details.weight_kg,
            vehicle_type: cargo.details.vehicle_type.clone(),
            offered_value_cents: cargo.details.offered_value.cents(),
            deadline: *cargo.details.deadline.as_datetime(),
            status: cargo.status,
            accepted_proposal_id: cargo.accepted_proposal_id.map(|id| *id.as_uuid()),
            version: cargo.version,
            proposal_count: cargo.proposals.len(),
            open_proposal_count: cargo.open_proposals(),
            created_at: *cargo.created_at.as_datetime(),
            updated_at: *cargo.updated_at.as_datetime(),
            transitions: cargo.transitions.clone(),
        }
    }
}

/// A counter-offer as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CounterOfferRecord {
    pub value_cents: u64,
    pub deadline: Option<DateTime<Utc>>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CounterOffer> for CounterOfferRecord {
    fn from(offer: &CounterOffer) -> Self {
        Self {
            value_cents: offer.value.cents(),
            deadline: offer.deadline.map(|d| *d.as_datetime()),
            message: offer.message.clone(),
            created_at: *offer.created_at.as_datetime(),
        }
    }
}

/// A proposal as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProposalRecord {
    pub id: Uuid,
    pub cargo_id: Uuid,
    pub carrier_id: Uuid,
    pub value_cents: u64,
    pub message: String,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub vehicle: Option<String>,
    /// pending, accepted, rejected, countered.
    #[schema(value_type = String)]
    pub status: ProposalStatus,
    pub counter_offer: Option<CounterOfferRecord>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<ProposalTransitionRecord>,
}

impl From<&Proposal> for ProposalRecord {
    fn from(p: &Proposal) -> Self {
        Self {
            id: *p.id.as_uuid(),
            cargo_id: *p.cargo_id.as_uuid(),
            carrier_id: *p.carrier_id.as_uuid(),
            value_cents: p.value.cents(),
            message: p.message.clone(),
            estimated_delivery: p.estimated_delivery.map(|d| *d.as_datetime()),
            vehicle: p.vehicle.clone(),
            status: p.status,
            counter_offer: p.counter_offer.as_ref().map(CounterOfferRecord::from),
            rejection_reason: p.rejection_reason.clone(),
            created_at: *p.created_at.as_datetime(),
            updated_at: *p.updated_at.as_datetime(),
            history: p.history.clone(),
        }
    }
}

/// A carrier rating as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingRecord {
    pub cargo_id: Uuid,
    pub carrier_id: Uuid,
    pub shipper_id: Uuid,
    /// 1 to 5.
    pub score: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&CarrierRating> for RatingRecord {
    fn from(r: &CarrierRating) -> Self {
        Self {
            cargo_id: *r.cargo_id.as_uuid(),
            carrier_id: *r.carrier_id.as_uuid(),
            shipper_id: *r.shipper_id.as_uuid(),
            score: r.score.stars(),
            comment: r.comment.clone(),
            created_at: *r.created_at.as_datetime(),
        }
    }
}

/// Aggregate rating of a carrier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CarrierRatingRecord {
    pub carrier_id: Uuid,
    pub count: usize,
    /// Mean score; absent when the carrier has no ratings.
    pub average: Option<f64>,
    pub ratings: Vec<RatingRecord>,
}

impl CarrierRatingRecord {
    /// Combine a summary with the individual ratings.
    pub fn new(summary: RatingSummary, ratings: &[&CarrierRating]) -> Self {
        Self {
            carrier_id: *summary.carrier_id.as_uuid(),
            count: summary.count,
            average: summary.average,
            ratings: ratings.iter().map(|r| RatingRecord::from(*r)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frete_core::{Amount, CarrierId, ShipperId};
    use frete_negotiation::{CargoDetails, ProposalDraft};

    fn sample_cargo() -> Cargo {
        let details = CargoDetails {
            title: "Café em grãos".to_string(),
            description: String::new(),
            origin: "Varginha, MG".to_string(),
            destination: "Santos, SP".to_string(),
            weight_kg: 24_000,
            vehicle_type: "carreta".to_string(),
            offered_value: Amount::from_reais(2500).unwrap(),
            deadline: Timestamp::parse("2026-12-01T12:00:00Z").unwrap(),
        };
        Cargo::publish(CargoId::new(), ShipperId::new(), details, Timestamp::now()).unwrap()
    }

    fn submit(carrier_id: CarrierId, reais: u64) -> Command {
        Command::Submit {
            proposal_id: ProposalId::new(),
            draft: ProposalDraft {
                carrier_id,
                value: Amount::from_reais(reais).unwrap(),
                message: String::new(),
                estimated_delivery: None,
                vehicle: None,
            },
        }
    }

    // -- Store tests ----------------------------------------------------------

    #[test]
    fn store_insert_get_and_list() {
        let store = Store::new();
        let cargo = sample_cargo();
        let id = *cargo.id.as_uuid();
        assert!(store.insert(id, cargo.clone()).is_none());
        assert_eq!(store.get(&id), Some(cargo));
        assert_eq!(store.list().len(), 1);
        assert!(store.contains(&id));
        assert!(!store.is_empty());
    }

    #[test]
    fn store_try_update_missing_returns_none() {
        let store: Store<Cargo> = Store::new();
        let result = store.try_update(&Uuid::new_v4(), |_| Ok::<(), String>(()));
        assert!(result.is_none());
    }

    #[test]
    fn store_clone_shares_underlying_data() {
        let store = Store::new();
        let clone = store.clone();
        let cargo = sample_cargo();
        clone.insert(*cargo.id.as_uuid(), cargo);
        assert_eq!(store.len(), 1);
    }

    // -- Config tests ---------------------------------------------------------

    #[test]
    fn config_from_lookup_reads_frete_variables() {
        let env = HashMap::from([
            ("FRETE_PORT", "9090"),
            ("PORT", "7070"),
            ("FRETE_SEED_FILE", "fixtures/seed.yaml"),
            ("FRETE_LOG_FORMAT", "JSON"),
        ]);
        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.port, 9090);
        assert_eq!(config.seed_file, Some(PathBuf::from("fixtures/seed.yaml")));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn config_falls_back_to_port_then_default() {
        let env = HashMap::from([("PORT", "7070")]);
        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.port, 7070);

        let config = AppConfig::from_lookup(|_| Some("not-a-port".to_string()));
        assert_eq!(config.port, AppConfig::DEFAULT_PORT);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    // -- AppState tests -------------------------------------------------------

    #[test]
    fn execute_submit_indexes_proposal() {
        let state = AppState::new();
        let cargo = sample_cargo();
        let cargo_id = cargo.id;
        state.insert_cargo(cargo);

        let command = submit(CarrierId::new(), 2300);
        let proposal_id = command.proposal_id().unwrap();
        let updated = state.execute(cargo_id, &command, Some(0)).unwrap();

        assert_eq!(updated.version, 1);
        assert_eq!(updated.status, CargoStatus::Negotiating);
        assert_eq!(state.cargo_of(proposal_id).unwrap(), cargo_id);
        assert_eq!(state.proposal(proposal_id).unwrap().status, ProposalStatus::Pending);
    }

    #[test]
    fn execute_refuses_proposal_id_taken_by_another_cargo() {
        let state = AppState::new();
        let first = sample_cargo();
        let second = sample_cargo();
        let (first_id, second_id) = (first.id, second.id);
        state.insert_cargo(first);
        state.insert_cargo(second.clone());

        let command = submit(CarrierId::new(), 2300);
        let proposal_id = command.proposal_id().unwrap();
        state.execute(first_id, &command, None).unwrap();

        let err = state.execute(second_id, &command, None).unwrap_err();
        assert!(matches!(err, NegotiationError::Validation(_)), "got: {err:?}");
        assert_eq!(state.cargo_of(proposal_id).unwrap(), first_id);
        assert_eq!(state.cargo(second_id).unwrap(), second);
    }

    #[test]
    fn execute_unknown_cargo_is_not_found() {
        let state = AppState::new();
        let missing = CargoId::new();
        let err = state.execute(missing, &Command::StartTransit, None).unwrap_err();
        assert_eq!(err, NegotiationError::CargoNotFound(missing));
    }

    #[test]
    fn execute_stale_version_leaves_cargo_unchanged() {
        let state = AppState::new();
        let cargo = sample_cargo();
        let cargo_id = cargo.id;
        state.insert_cargo(cargo.clone());

        let err = state
            .execute(cargo_id, &submit(CarrierId::new(), 2300), Some(7))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::ConcurrencyConflict { .. }));
        assert_eq!(state.cargo(cargo_id).unwrap(), cargo);
    }

    #[test]
    fn unknown_proposal_is_not_found() {
        let state = AppState::new();
        let id = ProposalId::new();
        assert_eq!(
            state.proposal(id).unwrap_err(),
            NegotiationError::ProposalNotFound(id)
        );
    }

    #[test]
    fn records_carry_cents_and_status() {
        let state = AppState::new();
        let cargo = sample_cargo();
        let cargo_id = cargo.id;
        state.insert_cargo(cargo);
        let updated = state
            .execute(cargo_id, &submit(CarrierId::new(), 2300), None)
            .unwrap();

        let record = CargoRecord::from(&updated);
        assert_eq!(record.offered_value_cents, 250_000);
        assert_eq!(record.open_proposal_count, 1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "negotiating");

        let proposal = ProposalRecord::from(&updated.proposals[0]);
        assert_eq!(proposal.value_cents, 230_000);
        assert_eq!(serde_json::to_value(&proposal).unwrap()["status"], "pending");
    }
}
