//! # Check Subcommand
//!
//! Validates a seed fixture by loading it into a scratch state exactly as
//! the server would at startup, then checks every resulting cargo's
//! invariants.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use frete_api::bootstrap::{apply_seed, load_seed, SeedSummary};
use frete_api::AppState;

/// Arguments for the `frete check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Seed fixture (YAML).
    pub path: PathBuf,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Load and apply a fixture to a fresh state.
pub fn check_seed(path: &std::path::Path) -> Result<SeedSummary> {
    let seed = load_seed(path)?;
    let state = AppState::new();
    let summary = apply_seed(&state, &seed)
        .with_context(|| format!("{} was refused", path.display()))?;

    for cargo in state.cargos.list() {
        if let Err(violation) = cargo.check_invariants() {
            bail!("cargo {} violates an invariant: {violation}", cargo.id);
        }
    }
    Ok(summary)
}

/// Execute `frete check`.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let summary = check_seed(&args.path)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "OK: {} ({} cargos, {} proposals)",
            args.path.display(),
            summary.cargos,
            summary.proposals
        );
    }
    Ok(0)
}
