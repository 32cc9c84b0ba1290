//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (reconciler, metrics)
//! - Bind the listener last, then serve until a signal arrives
//! - Release the signing key on the way out
//!
//! Any startup error is fatal.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::{LocalAuditStore, StoreError};
use crate::blockchain::{BlockchainError, RpcLedgerClient, Signer};
use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Signer unavailable: {0}")]
    Signer(BlockchainError),

    #[error("Ledger client: {0}")]
    Ledger(BlockchainError),

    #[error("Audit store: {0}")]
    Store(#[from] StoreError),

    #[error("Listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Construct the gateway context from configuration.
///
/// The signing key must be present in the environment.
pub async fn build_gateway(config: GatewayConfig) -> Result<Arc<Gateway>, StartupError> {
    let signer = Arc::new(Signer::from_env(config.ledger.network_id).map_err(StartupError::Signer)?);

    let ledger = RpcLedgerClient::new(config.ledger.clone())
        .await
        .map_err(StartupError::Ledger)?;

    let store = LocalAuditStore::from_path(config.store.path.as_deref())?;
    tracing::info!(path = ?config.store.path, "Audit store ready");

    if config.contract.address.is_none() {
        tracing::warn!("No contract address configured; reads and writes will be refused");
    }

    Ok(Arc::new(Gateway::new(
        config,
        Arc::new(ledger),
        signer,
        Arc::new(store),
    )))
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let reconciler_enabled = config.reconciler.enabled;
    let bind_address = config.listener.bind_address.clone();
    let gateway = build_gateway(config).await?;
    let shutdown = Shutdown::new();

    let reconciler_task = if reconciler_enabled {
        let reconciler = gateway.reconciler().clone();
        Some(tokio::spawn(reconciler.run(shutdown.subscribe())))
    } else {
        tracing::info!("Audit reconciler disabled");
        None
    };

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    let server = HttpServer::new(gateway.clone());
    let served = server.run(listener, shutdown.signalled()).await;

    // Server errors also stop background tasks.
    shutdown.trigger();
    if let Some(task) = reconciler_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Reconciler task failed");
        }
    }

    gateway.close();
    tracing::info!(
        unrecorded = gateway.reconciler().pending_count(),
        "Signing key released"
    );

    served?;
    Ok(())
}
