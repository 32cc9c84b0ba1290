//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use ledger_gateway::audit::{
    AuditRecord, AuditStore, DeploymentRecord, DeploymentStatus, LocalAuditStore, NewDeployment,
    NewTransactionRecord, StoreError,
};
use ledger_gateway::blockchain::types::{BlockchainError, BlockchainResult, CallMessage, ChainId, ReceiptSummary};
use ledger_gateway::blockchain::{LedgerClient, Signer, SubmitSettings, TransactionSubmitter};
use ledger_gateway::config::GatewayConfig;
use ledger_gateway::{Gateway, HttpServer, Shutdown};

/// Anvil's first account.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const NETWORK_ID: u64 = 1337;
pub const GAS_USED: u64 = 21_000;

pub fn contract_address() -> Address {
    Address::repeat_byte(0x5e)
}

#[derive(Default)]
struct ChainState {
    value: U256,
    block: u64,
    nonce: u64,
    receipts: HashMap<TxHash, ReceiptSummary>,
    /// Nonces in the order the node accepted them.
    accepted: Vec<u64>,
}

/// In-process ledger that mines every accepted transaction into its own block.
///
/// It enforces strict nonce ordering like a real node, so a submitter that
/// reuses or skips a nonce is rejected.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<ChainState>,
    pub estimate_reverts: AtomicBool,
    pub revert_on_chain: AtomicBool,
    /// Hide receipts until cleared; mined transactions stay mined.
    pub withhold_receipts: AtomicBool,
    pub unreachable: AtomicBool,
    /// Accept the transaction but answer as a node that already had it.
    pub answer_already_known: AtomicBool,
    pub broadcast_delay_ms: AtomicU64,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn value(&self) -> U256 {
        self.state.lock().value
    }

    pub fn accepted_nonces(&self) -> Vec<u64> {
        self.state.lock().accepted.clone()
    }

    /// Advance the chain head without including anything.
    pub fn mine_empty_blocks(&self, count: u64) {
        self.state.lock().block += count;
    }

    fn check_up(&self) -> BlockchainResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rpc("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.check_up()?;
        Ok(ChainId(NETWORK_ID))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.check_up()?;
        Ok(self.state.lock().block)
    }

    async fn peer_count(&self) -> BlockchainResult<u64> {
        self.check_up()?;
        Ok(3)
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.check_up()?;
        Ok(1_000_000_000)
    }

    async fn balance(&self, _address: Address) -> BlockchainResult<U256> {
        self.check_up()?;
        Ok(U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64)))
    }

    async fn pending_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        self.check_up()?;
        Ok(self.state.lock().nonce)
    }

    async fn call(&self, _message: CallMessage) -> BlockchainResult<Bytes> {
        self.check_up()?;
        let value = self.state.lock().value;
        Ok(Bytes::from(value.to_be_bytes::<32>().to_vec()))
    }

    async fn estimate_gas(&self, _message: CallMessage) -> BlockchainResult<u64> {
        self.check_up()?;
        if self.estimate_reverts.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rejected("execution reverted".into()));
        }
        Ok(GAS_USED + 5_000)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        self.check_up()?;
        let delay = self.broadcast_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let mut buf: &[u8] = &raw;
        let envelope = TxEnvelope::decode_2718(&mut buf)
            .map_err(|e| BlockchainError::Rejected(format!("invalid transaction: {}", e)))?;
        let hash = *envelope.tx_hash();
        let input = envelope.input().clone();

        let mut state = self.state.lock();
        if envelope.nonce() != state.nonce {
            return Err(BlockchainError::Rejected(format!(
                "nonce too low: next nonce {}, tx nonce {}",
                state.nonce,
                envelope.nonce()
            )));
        }

        state.nonce += 1;
        state.block += 1;
        state.accepted.push(envelope.nonce());

        let success = !self.revert_on_chain.load(Ordering::SeqCst);
        if success && input.len() >= 36 {
            state.value = U256::from_be_slice(&input[4..36]);
        }

        let block_number = state.block;
        state.receipts.insert(
            hash,
            ReceiptSummary {
                tx_hash: hash,
                block_number,
                gas_used: GAS_USED,
                success,
            },
        );
        if self.answer_already_known.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rejected("already known".into()));
        }
        Ok(hash)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ReceiptSummary>> {
        self.check_up()?;
        if self.withhold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.state.lock().receipts.get(&tx_hash).copied())
    }
}

/// Audit store whose writes and liveness check can be made to fail.
pub struct FlakyStore {
    inner: LocalAuditStore,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_ping: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LocalAuditStore::in_memory(),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_ping: AtomicBool::new(false),
        })
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(())
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for FlakyStore {
    async fn insert_transaction(&self, record: NewTransactionRecord) -> Result<AuditRecord, StoreError> {
        self.check_writes()?;
        self.inner.insert_transaction(record).await
    }

    async fn find_transaction(&self, tx_hash: TxHash) -> Result<Option<AuditRecord>, StoreError> {
        self.check_writes()?;
        self.inner.find_transaction(tx_hash).await
    }

    async fn transaction_history(
        &self,
        contract: Address,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        self.check_reads()?;
        self.inner.transaction_history(contract, limit, offset).await
    }

    async fn transaction_count(&self, contract: Address) -> Result<u64, StoreError> {
        self.check_reads()?;
        self.inner.transaction_count(contract).await
    }

    async fn insert_deployment(&self, deployment: NewDeployment) -> Result<DeploymentRecord, StoreError> {
        self.check_writes()?;
        self.inner.insert_deployment(deployment).await
    }

    async fn deployments(&self, status: DeploymentStatus) -> Result<Vec<DeploymentRecord>, StoreError> {
        self.inner.deployments(status).await
    }

    async fn ping(&self) -> Result<u64, StoreError> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.ping().await
    }
}

/// Config tuned for fast tests.
pub fn test_config(contract: Option<Address>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.contract.address = contract.map(|a| a.to_string());
    config.ledger.network_id = NETWORK_ID;
    config.ledger.receipt_timeout_secs = 1;
    config.ledger.receipt_poll_interval_ms = 10;
    config.health.probe_timeout_secs = 1;
    config.reconciler.interval_ms = 20;
    config
}

pub fn test_signer() -> Arc<Signer> {
    Arc::new(Signer::from_private_key(TEST_PRIVATE_KEY, NETWORK_ID).unwrap())
}

pub fn submitter(ledger: Arc<MockLedger>) -> TransactionSubmitter {
    let config = test_config(Some(contract_address()));
    TransactionSubmitter::new(ledger, test_signer(), SubmitSettings::from(&config.ledger))
}

pub struct TestGateway {
    pub gateway: Arc<Gateway>,
    pub ledger: Arc<MockLedger>,
    pub store: Arc<FlakyStore>,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_json(&self, path: &str) -> (u16, serde_json::Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Boot the gateway on an ephemeral port against a fresh mock ledger and store.
pub async fn spawn_gateway(contract: Option<Address>) -> TestGateway {
    spawn_gateway_with(contract, |_| {}).await
}

pub async fn spawn_gateway_with(
    contract: Option<Address>,
    tweak: impl FnOnce(&mut GatewayConfig),
) -> TestGateway {
    let ledger = MockLedger::new();
    let store = FlakyStore::new();
    let mut config = test_config(contract);
    tweak(&mut config);
    let gateway = Arc::new(Gateway::new(
        config,
        ledger.clone(),
        test_signer(),
        store.clone(),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(gateway.clone());
    tokio::spawn(server.run(listener, shutdown.signalled()));

    TestGateway {
        gateway,
        ledger,
        store,
        addr,
        client: reqwest::Client::new(),
        shutdown,
    }
}
