//! # Replay Subcommand
//!
//! Runs a YAML negotiation script against in-memory cargos and prints the
//! resulting state as JSON. Each step may state the outcome it expects,
//! so a script doubles as an executable scenario.
//!
//! ```yaml
//! start: 2026-11-01T08:00:00Z
//! cargos:
//!   soja:
//!     shipper_id: 8d1e4f20-6b3a-4e7c-9f5d-1a2b3c4d5e6f
//!     title: Soja a granel
//!     origin: Sorriso, MT
//!     destination: Santos, SP
//!     weight_kg: 30000
//!     vehicle_type: carreta
//!     offered_value: "2500.00"
//!     deadline: 2026-11-30T18:00:00Z
//! steps:
//!   - { op: submit, cargo: soja, proposal: joao, carrier: joao, value: "2700.00" }
//!   - { op: counter, proposal: joao, value: "2400.00" }
//!   - { op: respond, proposal: joao, accept: true }
//!   - { op: accept, proposal: joao }
//!   - { op: submit, cargo: soja, proposal: late, carrier: ana, value: "2000.00", expect: conflict }
//! ```
//!
//! Cargo, proposal and carrier labels are script-local names. A proposal
//! declared under `cargos.*.proposals` is addressable by steps when it
//! carries a `label`. Ids not given explicitly are minted in the order
//! labels first appear, and the clock starts at `start` and advances one
//! minute per step, so replaying the same script always prints the same
//! document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use frete_api::bootstrap::SeedCargo;
use frete_core::{Amount, CargoId, CarrierId, ProposalId, ShipperId, Timestamp};
use frete_negotiation::{Cargo, Command, CounterOfferDraft, NegotiationError, ProposalDraft};

/// Clock origin when a script does not set `start`.
pub const DEFAULT_START: &str = "2026-01-01T00:00:00Z";

const STEP_SECS: i64 = 60;

/// Arguments for the `frete replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Negotiation script (YAML).
    pub script: PathBuf,

    /// Print only the step outcomes, not the final cargos.
    #[arg(long)]
    pub steps_only: bool,
}

/// Script operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Submit,
    Accept,
    Reject,
    Counter,
    Respond,
    Transit,
    Deliver,
    Cancel,
}

/// Outcome class of a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    #[default]
    Ok,
    /// Any failure.
    Error,
    NotFound,
    Conflict,
    Invalid,
}

impl Expect {
    fn of(result: &Result<(), NegotiationError>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(NegotiationError::CargoNotFound(_) | NegotiationError::ProposalNotFound(_)) => {
                Self::NotFound
            }
            Err(NegotiationError::Validation(_)) => Self::Invalid,
            Err(_) => Self::Conflict,
        }
    }

    /// Whether an `actual` outcome satisfies this expectation.
    pub fn admits(self, actual: Self) -> bool {
        self == actual || (self == Self::Error && actual != Self::Ok)
    }
}

/// A replay script.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// RFC 3339 clock origin.
    #[serde(default)]
    pub start: Option<String>,
    /// Cargos by label, published before the first step.
    pub cargos: BTreeMap<String, SeedCargo>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted operation. Which fields apply depends on `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub op: Op,
    /// Cargo label. Required for `submit` and the cargo lifecycle ops;
    /// defaults to the proposal's cargo otherwise.
    #[serde(default)]
    pub cargo: Option<String>,
    /// Proposal label. `submit` defines it, later ops refer to it.
    #[serde(default)]
    pub proposal: Option<String>,
    /// Carrier label for `submit`.
    #[serde(default)]
    pub carrier: Option<String>,
    /// Reais, for `submit` and `counter`.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// For `reject` and `cancel`.
    #[serde(default)]
    pub reason: Option<String>,
    /// For `respond`.
    #[serde(default)]
    pub accept: Option<bool>,
    /// New delivery deadline for `counter`.
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
    #[serde(default)]
    pub expect: Expect,
}

/// What happened at one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// 1-based.
    pub step: usize,
    pub op: Op,
    pub cargo: String,
    pub expected: Expect,
    pub actual: Expect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    /// Whether the step ended as the script said it would.
    pub fn met(&self) -> bool {
        self.expected.admits(self.actual)
    }
}

/// Result of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepOutcome>,
    pub cargos: BTreeMap<String, Cargo>,
}

impl ReplayReport {
    /// Steps whose outcome differed from `expect`.
    pub fn unmet(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.met())
    }
}

struct Replayer {
    clock: Timestamp,
    minted: u128,
    cargos: BTreeMap<String, Cargo>,
    proposals: BTreeMap<String, (String, ProposalId)>,
    carriers: BTreeMap<String, CarrierId>,
}

impl Replayer {
    fn new(clock: Timestamp) -> Self {
        Self {
            clock,
            minted: 0,
            cargos: BTreeMap::new(),
            proposals: BTreeMap::new(),
            carriers: BTreeMap::new(),
        }
    }

    fn mint(&mut self) -> Uuid {
        self.minted += 1;
        Uuid::from_u128(self.minted)
    }

    fn tick(&mut self) -> Result<()> {
        self.clock = Timestamp::from_epoch_secs(self.clock.epoch_secs() + STEP_SECS)?;
        Ok(())
    }

    fn publish(&mut self, label: &str, seed: &SeedCargo) -> Result<()> {
        let id = match seed.id {
            Some(id) => CargoId::from_uuid(id),
            None => CargoId::from_uuid(self.mint()),
        };
        let details = seed.details()?;
        let shipper_id = ShipperId::from_uuid(seed.shipper_id);
        let mut cargo = Cargo::publish(id, shipper_id, details, self.clock)?;
        for proposal in &seed.proposals {
            let mut command = proposal.command()?;
            if let Command::Submit { proposal_id, .. } = &mut command {
                if proposal.id.is_none() {
                    *proposal_id = ProposalId::from_uuid(self.mint());
                }
                if let Some(name) = &proposal.label {
                    if self.proposals.contains_key(name) {
                        bail!("proposal label `{name}` is already defined");
                    }
                    self.proposals
                        .insert(name.clone(), (label.to_string(), *proposal_id));
                }
            }
            cargo.execute(&command, None, self.clock)?;
        }
        self.cargos.insert(label.to_string(), cargo);
        Ok(())
    }

    fn cargo_label(&self, step: &Step) -> Result<String> {
        let label = required(step.cargo.as_deref(), "cargo")?;
        if !self.cargos.contains_key(label) {
            bail!("unknown cargo label `{label}`");
        }
        Ok(label.to_string())
    }

    /// Resolve a proposal label to its cargo label and id.
    fn proposal_ref(&self, step: &Step) -> Result<(String, ProposalId)> {
        let label = required(step.proposal.as_deref(), "proposal")?;
        let (cargo, id) = self
            .proposals
            .get(label)
            .with_context(|| format!("unknown proposal label `{label}`"))?;
        let cargo = match &step.cargo {
            Some(_) => self.cargo_label(step)?,
            None => cargo.clone(),
        };
        Ok((cargo, *id))
    }

    fn carrier(&mut self, label: &str) -> CarrierId {
        if let Some(id) = self.carriers.get(label) {
            return *id;
        }
        let id = CarrierId::from_uuid(self.mint());
        self.carriers.insert(label.to_string(), id);
        id
    }

    /// Translate a step into a command on a labelled cargo.
    fn command(&mut self, step: &Step) -> Result<(String, Command)> {
        let resolved = match step.op {
            Op::Submit => {
                let cargo = self.cargo_label(step)?;
                let label = required(step.proposal.as_deref(), "proposal")?;
                if self.proposals.contains_key(label) {
                    bail!("proposal label `{label}` is already defined");
                }
                let carrier_id = self.carrier(required(step.carrier.as_deref(), "carrier")?);
                let value = Amount::parse(required(step.value.as_deref(), "value")?)?;
                let proposal_id = ProposalId::from_uuid(self.mint());
                self.proposals
                    .insert(label.to_string(), (cargo.clone(), proposal_id));
                let draft = ProposalDraft {
                    carrier_id,
                    value,
                    message: step.message.clone().unwrap_or_default(),
                    estimated_delivery: None,
                    vehicle: None,
                };
                (cargo, Command::Submit { proposal_id, draft })
            }
            Op::Accept => {
                let (cargo, proposal_id) = self.proposal_ref(step)?;
                (cargo, Command::Accept { proposal_id })
            }
            Op::Reject => {
                let (cargo, proposal_id) = self.proposal_ref(step)?;
                let reason = step.reason.clone();
                (cargo, Command::Reject { proposal_id, reason })
            }
            Op::Counter => {
                let (cargo, proposal_id) = self.proposal_ref(step)?;
                let offer = CounterOfferDraft {
                    value: Amount::parse(required(step.value.as_deref(), "value")?)?,
                    deadline: step.deadline.as_deref().map(Timestamp::parse).transpose()?,
                    message: step.message.clone().unwrap_or_default(),
                };
                (cargo, Command::Counter { proposal_id, offer })
            }
            Op::Respond => {
                let (cargo, proposal_id) = self.proposal_ref(step)?;
                let accept = step.accept.context("`respond` needs `accept: true|false`")?;
                (cargo, Command::RespondToCounter { proposal_id, accept })
            }
            Op::Transit => (self.cargo_label(step)?, Command::StartTransit),
            Op::Deliver => (self.cargo_label(step)?, Command::MarkDelivered),
            Op::Cancel => (
                self.cargo_label(step)?,
                Command::Cancel {
                    reason: step.reason.clone(),
                },
            ),
        };
        Ok(resolved)
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value.with_context(|| format!("missing `{field}`"))
}

/// Parse a replay script.
pub fn parse_script(text: &str) -> Result<Script> {
    serde_yaml::from_str(text).context("invalid replay script")
}

/// Run a script. Negotiation failures are recorded as step outcomes;
/// malformed steps (unknown labels, missing fields) abort the replay.
pub fn replay(script: &Script) -> Result<ReplayReport> {
    let start = Timestamp::parse(script.start.as_deref().unwrap_or(DEFAULT_START))?;
    let mut replayer = Replayer::new(start);

    for (label, seed) in &script.cargos {
        replayer
            .publish(label, seed)
            .with_context(|| format!("cargo `{label}`"))?;
    }

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let number = index + 1;
        replayer.tick()?;
        let (label, command) = replayer
            .command(step)
            .with_context(|| format!("step {number} ({:?})", step.op))?;
        let now = replayer.clock;
        let cargo = replayer
            .cargos
            .get_mut(&label)
            .with_context(|| format!("step {number}: unknown cargo label `{label}`"))?;

        let result = cargo.execute(&command, step.expected_version, now);
        if let Err(violation) = cargo.check_invariants() {
            bail!("step {number}: invariant violated on `{label}`: {violation}");
        }

        let outcome = StepOutcome {
            step: number,
            op: step.op,
            cargo: label,
            expected: step.expect,
            actual: Expect::of(&result),
            error: result.err().map(|e| e.to_string()),
        };
        tracing::debug!(
            step = number,
            op = command.name(),
            cargo = %outcome.cargo,
            actual = ?outcome.actual,
            "replayed step"
        );
        steps.push(outcome);
    }

    Ok(ReplayReport {
        steps,
        cargos: replayer.cargos,
    })
}

/// Execute `frete replay`. Exit code 2 when any step missed its `expect`.
pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read {}", args.script.display()))?;
    let script = parse_script(&text)?;
    let report = replay(&script)?;

    let output = if args.steps_only {
        serde_json::to_string_pretty(&report.steps)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{output}");

    let unmet: Vec<&StepOutcome> = report.unmet().collect();
    for step in &unmet {
        tracing::error!(
            "step {} ({:?} on `{}`): expected {:?}, got {:?}{}",
            step.step,
            step.op,
            step.cargo,
            step.expected,
            step.actual,
            step.error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default()
        );
    }
    Ok(if unmet.is_empty() { 0 } else { 2 })
}
