//! Individual dependency probes.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::audit::store::AuditStore;
use crate::blockchain::client::LedgerClient;
use crate::health::state::ProbeResult;

/// One isolated health check.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Key under which the result is reported.
    fn name(&self) -> &'static str;

    async fn check(&self) -> ProbeResult;
}

/// Healthy when both block height and peer count can be read.
pub struct LedgerProbe {
    ledger: Arc<dyn LedgerClient>,
    network_id: u64,
}

impl LedgerProbe {
    pub fn new(ledger: Arc<dyn LedgerClient>, network_id: u64) -> Self {
        Self { ledger, network_id }
    }
}

#[async_trait]
impl Probe for LedgerProbe {
    fn name(&self) -> &'static str {
        "ledger"
    }

    async fn check(&self) -> ProbeResult {
        let (block, peers) = tokio::join!(self.ledger.block_number(), self.ledger.peer_count());

        match (block, peers) {
            (Ok(block), Ok(peers)) => ProbeResult::healthy("connected")
                .with("blockNumber", block.to_string())
                .with("peerCount", peers.to_string())
                .with("networkId", self.network_id.to_string()),
            (Err(e), _) | (_, Err(e)) => ProbeResult::unhealthy(e.to_string()),
        }
    }
}

/// Healthy when the store answers a trivial query.
pub struct StoreProbe {
    store: Arc<dyn AuditStore>,
}

impl StoreProbe {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Probe for StoreProbe {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn check(&self) -> ProbeResult {
        match self.store.ping().await {
            Ok(clock) => ProbeResult::healthy("connected").with("timestamp", clock),
            Err(e) => ProbeResult::unhealthy(e.to_string()),
        }
    }
}

/// Local check for a configured contract address. Never unhealthy.
pub struct ContractProbe {
    address: Option<Address>,
}

impl ContractProbe {
    pub fn new(address: Option<Address>) -> Self {
        Self { address }
    }
}

#[async_trait]
impl Probe for ContractProbe {
    fn name(&self) -> &'static str {
        "contract"
    }

    async fn check(&self) -> ProbeResult {
        match self.address {
            Some(address) => ProbeResult::healthy("configured").with("address", address.to_string()),
            None => ProbeResult::not_configured("Contract address not set in configuration"),
        }
    }
}
