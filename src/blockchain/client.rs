//! Ledger RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoint (primary + failovers)
//! - Query chain state (block number, peers, balances, receipts)
//! - Estimate, call and broadcast
//! - Handle timeouts and network errors gracefully
//!
//! The `LedgerClient` trait is the seam the submitter, health probes and
//! tests depend on; `RpcLedgerClient` is the alloy-backed implementation.

use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256, U64};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, CallMessage, ChainId, LedgerConfig, ReceiptSummary,
};

/// Capability surface of a remote ledger node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Chain id reported by the node.
    async fn chain_id(&self) -> BlockchainResult<ChainId>;

    /// Latest block height.
    async fn block_number(&self) -> BlockchainResult<u64>;

    /// Number of peers connected to the node.
    async fn peer_count(&self) -> BlockchainResult<u64>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> BlockchainResult<u128>;

    /// Balance of an account in wei.
    async fn balance(&self, address: Address) -> BlockchainResult<U256>;

    /// Transaction count including pending transactions.
    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64>;

    /// Execute a read-only call.
    async fn call(&self, message: CallMessage) -> BlockchainResult<Bytes>;

    /// Estimate gas for a call. A node-side rejection surfaces as `Rejected`.
    async fn estimate_gas(&self, message: CallMessage) -> BlockchainResult<u64>;

    /// Broadcast signed transaction bytes.
    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash>;

    /// Receipt for a transaction, `None` while it is pending.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ReceiptSummary>>;
}

/// Ledger RPC client wrapper with failover support.
#[derive(Clone)]
pub struct RpcLedgerClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: LedgerConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl RpcLedgerClient {
    /// Create a new ledger client.
    ///
    /// Fails only on an unparseable primary URL; an unreachable node is
    /// tolerated so the gateway can start and report itself degraded.
    pub async fn new(config: LedgerConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(ProviderBuilder::new().connect_http(primary_url).erased());

        // 2. Add failover providers
        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse::<url::Url>() {
                providers.push(ProviderBuilder::new().connect_http(url).erased());
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    network_id = config.network_id,
                    "Ledger client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Ledger client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.chain_id().await?;
        if chain_id.0 != self.config.network_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.network_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Run `op` against each provider in order until one answers.
    ///
    /// A JSON-RPC error response is the node's verdict on the request itself
    /// and is returned immediately instead of being retried elsewhere.
    async fn with_failover<T, F, Fut>(&self, method: &'static str, op: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut last_error = None;

        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(payload) = e.as_error_resp() {
                        tracing::debug!(provider_idx = i, method, code = payload.code, "Node rejected request");
                        return Err(BlockchainError::Rejected(payload.message.to_string()));
                    }
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                    last_error = Some(BlockchainError::Rpc(format!(
                        "All RPC providers failed ({}): {}",
                        method, e
                    )));
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                    last_error = Some(BlockchainError::Timeout(self.config.rpc_timeout_secs));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| BlockchainError::Rpc(format!("All RPC providers failed ({})", method))))
    }
}

fn to_request(message: &CallMessage) -> TransactionRequest {
    let request = TransactionRequest::default()
        .with_to(message.to)
        .with_input(message.data.clone());
    match message.from {
        Some(from) => request.with_from(from),
        None => request,
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    async fn peer_count(&self) -> BlockchainResult<u64> {
        let count: U64 = self
            .with_failover("net_peerCount", |p| async move {
                p.raw_request::<_, U64>(Cow::Borrowed("net_peerCount"), ()).await
            })
            .await?;
        Ok(count.to::<u64>())
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("eth_getBalance", |p| async move { p.get_balance(address).await })
            .await
    }

    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.with_failover("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn call(&self, message: CallMessage) -> BlockchainResult<Bytes> {
        let request = to_request(&message);
        self.with_failover("eth_call", |p| {
            let request = request.clone();
            async move { p.call(request).await }
        })
        .await
    }

    async fn estimate_gas(&self, message: CallMessage) -> BlockchainResult<u64> {
        let request = to_request(&message);
        self.with_failover("eth_estimateGas", |p| {
            let request = request.clone();
            async move { p.estimate_gas(request).await }
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        self.with_failover("eth_sendRawTransaction", |p| {
            let raw = raw.clone();
            async move {
                let pending = p.send_raw_transaction(&raw).await?;
                Ok::<_, TransportError>(*pending.tx_hash())
            }
        })
        .await
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ReceiptSummary>> {
        let receipt = self
            .with_failover("eth_getTransactionReceipt", |p| async move {
                p.get_transaction_receipt(tx_hash).await
            })
            .await?;

        Ok(receipt.map(|r| ReceiptSummary {
            tx_hash: r.transaction_hash,
            block_number: r.block_number.unwrap_or_default(),
            gas_used: r.gas_used,
            success: r.status(),
        }))
    }
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("network_id", &self.config.network_id)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
