//! # frete-cli — Command-line Tooling
//!
//! Subcommands of the `frete` binary:
//!
//! - `serve` — run the HTTP API ([`serve`]).
//! - `check` — validate a seed fixture ([`check`]).
//! - `replay` — run a negotiation script and print the result ([`replay`]).
//!
//! Each module exposes an `Args` struct for clap and a `run_*` function
//! returning the process exit code.

pub mod check;
pub mod replay;
pub mod serve;
