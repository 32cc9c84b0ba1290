//! The gateway context: every dependency an operation needs, built once at
//! startup and shared by reference.
//!
//! # Data Flow
//! ```text
//! write_value → TransactionSubmitter → AuditRecorder
//!                                     ↳ on store failure: AuditReconciler
//! read_value  → LedgerClient
//! history     → AuditRecorder
//! check       → AuditRecorder + LedgerClient
//! health      → HealthAggregator
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;

use crate::audit::store::{now_millis, AuditStore};
use crate::audit::{AuditReconciler, AuditRecord, AuditRecorder, DeploymentRecord, DeploymentStatus};
use crate::blockchain::client::LedgerClient;
use crate::blockchain::contract::{self, CallRequest};
use crate::blockchain::types::{CallMessage, SubmissionOutcome};
use crate::blockchain::{Signer, SubmitSettings, TransactionSubmitter};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::health::{HealthAggregator, HealthReport};

/// Current on-chain value.
#[derive(Debug, Clone, Serialize)]
pub struct StoredValue {
    pub value: String,
    pub timestamp: u64,
}

/// Result of a write. `audit_pending` is set when the transaction was mined
/// but its audit record has not been written yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<u64>,
    pub audit_pending: bool,
}

impl WriteReceipt {
    fn new(outcome: &SubmissionOutcome, value: U256, audit_id: Option<u64>) -> Self {
        Self {
            transaction_hash: outcome.transaction_hash,
            block_number: outcome.block_number,
            gas_used: outcome.gas_used,
            value: value.to_string(),
            audit_id,
            audit_pending: audit_id.is_none(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub id: u64,
    pub rpc_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub address: Address,
    /// Ether-formatted balance, or an error string.
    pub balance: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub address: Address,
    pub name: String,
    pub network: NetworkInfo,
    pub account: AccountInfo,
    /// Decimal value, or an error string.
    pub current_value: String,
    pub transaction_count: u64,
}

/// Newest audited value against the chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub recorded_value: Option<String>,
    pub on_chain_value: String,
    pub in_sync: bool,
    pub last_recorded_at: Option<u64>,
    pub last_tx_hash: Option<TxHash>,
    pub pending_audits: usize,
}

pub struct Gateway {
    config: GatewayConfig,
    contract: Option<Address>,
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<Signer>,
    submitter: TransactionSubmitter,
    recorder: Arc<AuditRecorder>,
    reconciler: Arc<AuditReconciler>,
    health: HealthAggregator,
}

impl Gateway {
    /// Wire the context from already-constructed collaborators.
    ///
    /// The contract address must have passed config validation; an
    /// unparseable value is treated as absent.
    pub fn new(
        config: GatewayConfig,
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<Signer>,
        store: Arc<dyn AuditStore>,
    ) -> Self {
        let contract = config
            .contract
            .address
            .as_deref()
            .and_then(|a| a.parse::<Address>().ok());

        let submitter = TransactionSubmitter::new(
            ledger.clone(),
            signer.clone(),
            SubmitSettings::from(&config.ledger),
        );
        let recorder = Arc::new(AuditRecorder::new(store.clone()));
        let reconciler = Arc::new(AuditReconciler::new(
            recorder.clone(),
            Duration::from_millis(config.reconciler.interval_ms),
        ));
        let health = HealthAggregator::for_dependencies(
            ledger.clone(),
            config.ledger.network_id,
            store,
            contract,
            Duration::from_secs(config.health.probe_timeout_secs),
        );

        Self {
            config,
            contract,
            ledger,
            signer,
            submitter,
            recorder,
            reconciler,
            health,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn signer(&self) -> &Arc<Signer> {
        &self.signer
    }

    pub fn recorder(&self) -> &Arc<AuditRecorder> {
        &self.recorder
    }

    pub fn reconciler(&self) -> &Arc<AuditReconciler> {
        &self.reconciler
    }

    fn contract(&self) -> Result<Address, GatewayError> {
        self.contract.ok_or_else(|| {
            GatewayError::Configuration("Contract address not configured".into())
        })
    }

    async fn fetch_value(&self, contract: Address) -> Result<U256, GatewayError> {
        let raw = self
            .ledger
            .call(CallMessage {
                from: Some(self.signer.address()),
                to: contract,
                data: contract::encode_get(),
            })
            .await
            .map_err(GatewayError::from_ledger)?;
        contract::decode_get(&raw).map_err(GatewayError::from_ledger)
    }

    pub async fn read_value(&self) -> Result<StoredValue, GatewayError> {
        let contract = self.contract()?;
        let value = self.fetch_value(contract).await?;
        Ok(StoredValue {
            value: value.to_string(),
            timestamp: now_millis(),
        })
    }

    /// Submit a write and record it.
    ///
    /// A store failure after the transaction is mined does not fail the
    /// write: the outcome is handed to the reconciler and the receipt is
    /// returned with `audit_pending` set.
    /// Submit `value` and record the mined outcome.
    ///
    /// Submission and recording run on their own task. Dropping the caller
    /// (e.g. an HTTP request timeout) after broadcast does not abandon the
    /// write; it still ends in the audit store or the reconciler.
    pub async fn write_value(self: &Arc<Self>, value: U256) -> Result<WriteReceipt, GatewayError> {
        let contract = self.contract()?;
        let gateway = Arc::clone(self);

        let task = tokio::spawn(async move { gateway.commit(contract, value).await });
        match task.await {
            Ok(result) => result,
            Err(e) => Err(GatewayError::Internal(format!("write task failed: {}", e))),
        }
    }

    async fn commit(&self, contract: Address, value: U256) -> Result<WriteReceipt, GatewayError> {
        let request = CallRequest::set(value);
        let outcome = self.submitter.submit(contract, &request).await?;

        match self.recorder.record(&outcome, contract, &request).await {
            Ok(id) => Ok(WriteReceipt::new(&outcome, value, Some(id))),
            Err(e) => {
                tracing::error!(
                    tx_hash = %outcome.transaction_hash,
                    error = %e,
                    "Transaction mined but audit write failed"
                );
                let receipt = WriteReceipt::new(&outcome, value, None);
                self.reconciler.enqueue(outcome, contract, request);
                Ok(receipt)
            }
        }
    }

    pub async fn history(&self, limit: usize, offset: usize) -> Result<Vec<AuditRecord>, GatewayError> {
        let contract = self.contract()?;
        Ok(self.recorder.history(contract, limit, offset).await?)
    }

    /// Number of audit records for the configured contract.
    pub async fn history_total(&self) -> Result<u64, GatewayError> {
        let contract = self.contract()?;
        Ok(self.recorder.count(contract).await?)
    }

    /// Contract, network and account details. Balance and value lookups
    /// degrade to an error string.
    pub async fn info(&self) -> Result<ContractInfo, GatewayError> {
        let contract = self.contract()?;
        let account = self.signer.address();

        let (balance, value, count) = tokio::join!(
            self.ledger.balance(account),
            self.fetch_value(contract),
            self.recorder.count(contract),
        );

        Ok(ContractInfo {
            address: contract,
            name: self.config.contract.name.clone(),
            network: NetworkInfo {
                id: self.config.ledger.network_id,
                rpc_url: self.config.ledger.rpc_url.clone(),
            },
            account: AccountInfo {
                address: account,
                balance: balance
                    .map(format_ether)
                    .unwrap_or_else(|_| "Error fetching balance".into()),
            },
            current_value: value
                .map(|v| v.to_string())
                .unwrap_or_else(|_| "Error fetching value".into()),
            transaction_count: count?,
        })
    }

    /// Compare the newest audit record with the on-chain value.
    pub async fn check(&self) -> Result<ConsistencyReport, GatewayError> {
        let contract = self.contract()?;
        let latest = self.recorder.latest(contract).await?;
        let on_chain = self.fetch_value(contract).await?.to_string();

        let recorded_value = latest
            .as_ref()
            .and_then(|r| r.input_value())
            .map(str::to_string);

        Ok(ConsistencyReport {
            in_sync: recorded_value.as_deref() == Some(on_chain.as_str()),
            recorded_value,
            on_chain_value: on_chain,
            last_recorded_at: latest.as_ref().map(|r| r.timestamp),
            last_tx_hash: latest.map(|r| r.tx_hash),
            pending_audits: self.reconciler.pending_count(),
        })
    }

    pub async fn health(&self) -> HealthReport {
        self.health.report().await
    }

    pub async fn deployments(&self) -> Result<Vec<DeploymentRecord>, GatewayError> {
        Ok(self.recorder.deployments_of(DeploymentStatus::Active).await?)
    }

    /// Release the signing key. Later writes fail with `KeyUnavailable`.
    pub fn close(&self) {
        self.signer.close();
    }
}
