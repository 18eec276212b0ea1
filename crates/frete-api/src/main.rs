//! # frete-api — Binary Entry Point
//!
//! Starts the HTTP server. Configuration comes from the environment:
//! `FRETE_PORT` (or `PORT`), `FRETE_SEED_FILE`, `FRETE_LOG_FORMAT` and
//! `RUST_LOG`.

use frete_api::server::{init_tracing, serve};
use frete_api::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(config.log_format);
    serve(config).await
}
