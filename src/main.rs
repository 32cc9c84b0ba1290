//! Ledger gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!   Client Request     │  ┌────────┐    ┌─────────┐    ┌──────────────┐   │
//!   ───────────────────┼─▶│  http  │───▶│ gateway │───▶│ transaction  │───┼──▶ Ledger node
//!                      │  │ server │    │ context │    │  submitter   │   │
//!                      │  └────────┘    └────┬────┘    └──────┬───────┘   │
//!                      │                     │                │ signer    │
//!                      │                     ▼                ▼           │
//!                      │               ┌──────────┐    ┌──────────────┐   │
//!                      │               │  health  │    │    audit     │   │
//!                      │               │aggregator│    │  recorder +  │   │
//!                      │               └──────────┘    │  reconciler  │   │
//!                      │                               └──────────────┘   │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ledger_gateway::config::load_config;
use ledger_gateway::lifecycle;
use ledger_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "ledger-gateway", version, about = "REST gateway for a ledger storage contract")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ledger-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rpc_url = %config.ledger.rpc_url,
        network_id = config.ledger.network_id,
        "Configuration loaded"
    );

    if let Err(e) = lifecycle::run(config).await {
        tracing::error!(error = %e, "Gateway stopped with error");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
