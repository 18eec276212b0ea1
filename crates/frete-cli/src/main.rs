//! # frete CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use frete_cli::check::{run_check, CheckArgs};
use frete_cli::replay::{run_replay, ReplayArgs};
use frete_cli::serve::{run_serve, ServeArgs};

/// Frete marketplace tooling.
#[derive(Parser, Debug)]
#[command(name = "frete", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// Ignored by `serve`, which reads `RUST_LOG`.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server.
    Serve(ServeArgs),

    /// Validate a seed fixture.
    Check(CheckArgs),

    /// Run a negotiation script and print the resulting state as JSON.
    Replay(ReplayArgs),
}

fn init_cli_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Serve(args) => run_serve(args),
        Commands::Check(args) => {
            init_cli_tracing(cli.verbose);
            run_check(args)
        }
        Commands::Replay(args) => {
            init_cli_tracing(cli.verbose);
            run_replay(args)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
