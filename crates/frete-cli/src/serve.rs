//! # Serve Subcommand
//!
//! Runs the HTTP API. Flags fall back to the same environment variables
//! the `frete-api` binary reads.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use frete_api::state::{AppConfig, LogFormat};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Arguments for the `frete serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// TCP port to bind.
    #[arg(long, env = "FRETE_PORT", default_value_t = AppConfig::DEFAULT_PORT)]
    pub port: u16,

    /// YAML seed fixture loaded at startup.
    #[arg(long, env = "FRETE_SEED_FILE")]
    pub seed: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "FRETE_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

impl ServeArgs {
    /// Server configuration for these flags.
    pub fn config(&self) -> AppConfig {
        AppConfig {
            port: self.port,
            seed_file: self.seed.clone(),
            log_format: self.log_format.into(),
        }
    }
}

/// Execute `frete serve`. Installs its own tracing subscriber.
pub fn run_serve(args: &ServeArgs) -> Result<u8> {
    let config = args.config();
    frete_api::server::init_tracing(config.log_format);
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(frete_api::server::serve(config))?;
    Ok(0)
}
