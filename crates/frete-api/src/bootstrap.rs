//! # Seed Fixture Bootstrap
//!
//! Loads a YAML fixture of cargos and their proposals into a fresh
//! [`AppState`] at startup (`FRETE_SEED_FILE`), and backs `frete check`.
//!
//! ```yaml
//! cargos:
//!   - shipper_id: 8d1e4f20-6b3a-4e7c-9f5d-1a2b3c4d5e6f
//!     title: Soja a granel
//!     origin: Sorriso, MT
//!     destination: Santos, SP
//!     weight_kg: 30000
//!     vehicle_type: carreta
//!     offered_value: "2500.00"
//!     deadline: 2026-11-30T18:00:00Z
//!     proposals:
//!       - carrier_id: 5a6b7c8d-1e2f-4a3b-8c9d-0e1f2a3b4c5d
//!         value: "2300.00"
//! ```
//!
//! Amounts are decimal reais strings. Proposals are submitted through the
//! normal negotiation path, so a fixture can never produce a cargo that
//! the API itself could not have produced.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use frete_core::{Amount, CargoId, CarrierId, ProposalId, ShipperId, Timestamp};
use frete_negotiation::{Cargo, CargoDetails, Command, NegotiationError, ProposalDraft};

use crate::state::{AppConfig, AppState};

/// Errors while loading a seed fixture.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Fixture file not found at the given path.
    #[error("seed file not found: {path}")]
    SeedNotFound { path: String },

    /// Fixture is not valid YAML or does not match the schema.
    #[error("invalid seed file {path}: {message}")]
    InvalidSeed { path: String, message: String },

    /// Two fixture cargos share an id.
    #[error("duplicate cargo id in seed: {0}")]
    DuplicateCargo(Uuid),

    /// A proposal id appears more than once across the fixture.
    #[error("duplicate proposal id in seed: {0}")]
    DuplicateProposal(Uuid),

    /// A cargo or one of its proposals was refused.
    #[error("seed cargo #{index} ({title}): {source}")]
    Cargo {
        index: usize,
        title: String,
        #[source]
        source: NegotiationError,
    },

    /// IO error reading the fixture.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level fixture document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub cargos: Vec<SeedCargo>,
}

/// A fixture cargo.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedCargo {
    /// Fixed id, so demos can link to known cargos. Random when absent.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub shipper_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub origin: String,
    pub destination: String,
    pub weight_kg: u32,
    pub vehicle_type: String,
    /// Reais, e.g. "2500.00".
    pub offered_value: String,
    /// RFC 3339.
    pub deadline: String,
    #[serde(default)]
    pub proposals: Vec<SeedProposal>,
}

/// A fixture proposal, submitted in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProposal {
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Name later `frete replay` steps use to address this proposal.
    /// Ignored when seeding the server.
    #[serde(default)]
    pub label: Option<String>,
    pub carrier_id: Uuid,
    /// Reais, e.g. "2300.00".
    pub value: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
    #[serde(default)]
    pub vehicle: Option<String>,
}

/// What a fixture put into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub cargos: usize,
    pub proposals: usize,
}

impl SeedCargo {
    /// Parse amounts and timestamps into domain details.
    pub fn details(&self) -> Result<CargoDetails, NegotiationError> {
        Ok(CargoDetails {
            title: self.title.clone(),
            description: self.description.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            weight_kg: self.weight_kg,
            vehicle_type: self.vehicle_type.clone(),
            offered_value: Amount::parse(&self.offered_value)?,
            deadline: Timestamp::parse(&self.deadline)?,
        })
    }
}

impl SeedProposal {
    /// The submit command for this proposal.
    pub fn command(&self) -> Result<Command, NegotiationError> {
        let estimated_delivery = self
            .estimated_delivery
            .as_deref()
            .map(Timestamp::parse)
            .transpose()?;
        Ok(Command::Submit {
            proposal_id: self.id.map(ProposalId::from_uuid).unwrap_or_default(),
            draft: ProposalDraft {
                carrier_id: CarrierId::from_uuid(self.carrier_id),
                value: Amount::parse(&self.value)?,
                message: self.message.clone(),
                estimated_delivery,
                vehicle: self.vehicle.clone(),
            },
        })
    }
}

/// Parse fixture YAML.
pub fn parse_seed(text: &str) -> Result<SeedFile, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

/// Read and parse a fixture file.
pub fn load_seed(path: &Path) -> Result<SeedFile, BootstrapError> {
    if !path.exists() {
        return Err(BootstrapError::SeedNotFound {
            path: path.display().to_string(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    parse_seed(&text).map_err(|e| BootstrapError::InvalidSeed {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Publish every fixture cargo and submit its proposals.
pub fn apply_seed(state: &AppState, seed: &SeedFile) -> Result<SeedSummary, BootstrapError> {
    let mut seen = HashSet::new();
    let mut seen_proposals = HashSet::new();
    let mut summary = SeedSummary::default();

    for (index, entry) in seed.cargos.iter().enumerate() {
        let wrap = |source: NegotiationError| BootstrapError::Cargo {
            index,
            title: entry.title.clone(),
            source,
        };

        let cargo_id = entry.id.map(CargoId::from_uuid).unwrap_or_default();
        if !seen.insert(cargo_id) || state.cargos.contains(cargo_id.as_uuid()) {
            return Err(BootstrapError::DuplicateCargo(*cargo_id.as_uuid()));
        }

        let details = entry.details().map_err(wrap)?;
        let cargo = Cargo::publish(
            cargo_id,
            ShipperId::from_uuid(entry.shipper_id),
            details,
            Timestamp::now(),
        )
        .map_err(wrap)?;
        state.insert_cargo(cargo);
        summary.cargos += 1;

        for proposal in &entry.proposals {
            let command = proposal.command().map_err(wrap)?;
            if let Some(proposal_id) = command.proposal_id() {
                if !seen_proposals.insert(proposal_id) || state.cargo_of(proposal_id).is_ok() {
                    return Err(BootstrapError::DuplicateProposal(*proposal_id.as_uuid()));
                }
            }
            state.execute(cargo_id, &command, None).map_err(wrap)?;
            summary.proposals += 1;
        }
    }

    Ok(summary)
}

/// Build the application state, loading `config.seed_file` when set.
pub fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    let seed_file = config.seed_file.clone();
    let state = AppState::with_config(config);

    match seed_file {
        Some(path) => {
            let seed = load_seed(&path)?;
            let summary = apply_seed(&state, &seed)?;
            tracing::info!(
                path = %path.display(),
                cargos = summary.cargos,
                proposals = summary.proposals,
                "Loaded seed fixture"
            );
        }
        None => tracing::info!("No seed fixture configured; starting empty"),
    }

    Ok(state)
}
