//! Transaction submission: encode, estimate, price, sign, broadcast, confirm.
//!
//! # Responsibilities
//! - Drive one logical write end-to-end against the ledger
//! - Serialize submissions from the signing account (single-writer lane)
//! - Allocate nonces inside the lane
//! - Bound the receipt wait
//!
//! No step is retried here. A failed step surfaces immediately and the
//! caller decides whether to submit again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, TxHash, U256};
use tokio::sync::Mutex;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::client::LedgerClient;
use crate::blockchain::contract::CallRequest;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, CallMessage, ConfirmationStatus, LedgerConfig,
    ReceiptSummary, SubmissionOutcome, UnsignedTransaction,
};
use crate::blockchain::wallet::Signer;
use crate::error::GatewayError;
use crate::observability::metrics;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Tunables for the submission pipeline.
#[derive(Debug, Clone)]
pub struct SubmitSettings {
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
    pub confirmation_blocks: u32,
    pub gas_price_multiplier: f64,
    pub max_gas_price_gwei: u64,
}

impl From<&LedgerConfig> for SubmitSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
            poll_interval: Duration::from_millis(config.receipt_poll_interval_ms),
            confirmation_blocks: config.confirmation_blocks,
            gas_price_multiplier: config.gas_price_multiplier,
            max_gas_price_gwei: config.max_gas_price_gwei,
        }
    }
}

/// Next nonce this process intends to use, if known.
#[derive(Debug, Default)]
struct NonceCursor {
    next: Option<u64>,
}

impl NonceCursor {
    /// The node's pending count wins unless we have already used it.
    fn allocate(&self, chain_pending: u64) -> u64 {
        self.next.map_or(chain_pending, |next| next.max(chain_pending))
    }
}

/// Executes writes from the gateway's single account.
pub struct TransactionSubmitter {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<Signer>,
    settings: SubmitSettings,
    /// Held for the whole submission: one in-flight write per account.
    lane: Mutex<NonceCursor>,
}

impl TransactionSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, signer: Arc<Signer>, settings: SubmitSettings) -> Self {
        Self {
            ledger,
            signer,
            settings,
            lane: Mutex::new(NonceCursor::default()),
        }
    }

    /// The submitting account.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Submit `request` to `contract` and wait for it to be mined.
    pub async fn submit(
        &self,
        contract: Address,
        request: &CallRequest,
    ) -> Result<SubmissionOutcome, GatewayError> {
        let started = Instant::now();
        let result = self.run_pipeline(contract, request).await;

        match &result {
            Ok(outcome) => {
                metrics::record_submission("mined", started);
                tracing::info!(
                    tx_hash = %outcome.transaction_hash,
                    block_number = outcome.block_number,
                    gas_used = outcome.gas_used,
                    nonce = outcome.nonce,
                    method = %request.method,
                    "Transaction mined"
                );
            }
            Err(e) => {
                metrics::record_submission(e.kind(), started);
                tracing::warn!(error = %e, method = %request.method, "Submission failed");
            }
        }

        result
    }

    async fn run_pipeline(
        &self,
        contract: Address,
        request: &CallRequest,
    ) -> Result<SubmissionOutcome, GatewayError> {
        let from = self.signer.address();

        // 1. Encode
        let data = request.encode();

        let mut lane = self.lane.lock().await;

        // 2. Estimate
        let gas = self
            .ledger
            .estimate_gas(CallMessage {
                from: Some(from),
                to: contract,
                data: data.clone(),
            })
            .await
            .map_err(estimation_error)?;

        // 3. Price
        let node_price = self.ledger.gas_price().await.map_err(GatewayError::from_ledger)?;
        let gas_price = adjust_gas_price(node_price, &self.settings).map_err(GatewayError::from_ledger)?;

        let chain_pending = self
            .ledger
            .pending_nonce(from)
            .await
            .map_err(GatewayError::from_ledger)?;
        let nonce = lane.allocate(chain_pending);

        // 4. Sign
        let signed = self
            .signer
            .sign(UnsignedTransaction {
                from,
                to: contract,
                data,
                gas,
                gas_price,
                nonce,
                value: U256::ZERO,
            })
            .map_err(GatewayError::from_ledger)?;

        tracing::debug!(
            tx_hash = %signed.hash,
            nonce,
            gas,
            gas_price,
            "Broadcasting transaction"
        );

        // 5. Broadcast
        match self.ledger.send_raw_transaction(signed.raw).await {
            Ok(hash) => {
                if hash != signed.hash {
                    tracing::warn!(expected = %signed.hash, reported = %hash, "Node reported a different transaction hash");
                }
                lane.next = Some(nonce + 1);
            }
            // The node already holds these exact bytes, e.g. a failover
            // endpoint after the primary accepted them and then timed out.
            Err(BlockchainError::Rejected(msg)) if is_already_known(&msg) => {
                tracing::info!(tx_hash = %signed.hash, "Node already holds transaction");
                lane.next = Some(nonce + 1);
            }
            Err(e) => {
                lane.next = None;
                return Err(broadcast_error(e));
            }
        }

        // 6. Await receipt
        let receipt = self
            .wait_for_confirmation(signed.hash)
            .await
            .map_err(GatewayError::from_ledger)?;

        Ok(SubmissionOutcome {
            transaction_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            success: receipt.success,
            nonce,
        })
    }

    /// Wait until `tx_hash` is mined with the configured depth.
    ///
    /// Poll failures are logged and retried until the deadline; a mined
    /// receipt with failed status ends the wait with `Reverted`.
    pub async fn wait_for_confirmation(&self, tx_hash: TxHash) -> BlockchainResult<ReceiptSummary> {
        let required = self.settings.confirmation_blocks;

        let result = timeout(self.settings.receipt_timeout, async {
            let mut ticker = interval(self.settings.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.confirmation_status(tx_hash, required).await {
                    Ok(ConfirmationStatus::Confirmed(receipt)) => return Ok(receipt),
                    Ok(ConfirmationStatus::Failed(receipt)) => {
                        return Err(BlockchainError::Reverted {
                            tx_hash: receipt.tx_hash,
                        })
                    }
                    Ok(ConfirmationStatus::Pending) => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    }
                    Ok(ConfirmationStatus::Confirming { current, required }) => {
                        tracing::debug!(
                            tx_hash = %tx_hash,
                            confirmations = current,
                            required,
                            "Waiting for confirmations"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed");
                    }
                }
            }
        })
        .await;

        match result {
            Ok(status) => status,
            Err(_) => Err(BlockchainError::ReceiptTimeout {
                tx_hash,
                secs: self.settings.receipt_timeout.as_secs(),
            }),
        }
    }

    async fn confirmation_status(
        &self,
        tx_hash: TxHash,
        required: u32,
    ) -> BlockchainResult<ConfirmationStatus> {
        let receipt = match self.ledger.transaction_receipt(tx_hash).await? {
            Some(r) => r,
            None => return Ok(ConfirmationStatus::Pending),
        };

        if !receipt.success {
            return Ok(ConfirmationStatus::Failed(receipt));
        }
        if required == 0 {
            return Ok(ConfirmationStatus::Confirmed(receipt));
        }

        let current_block = self.ledger.block_number().await?;
        let confirmations =
            u32::try_from(current_block.saturating_sub(receipt.block_number)).unwrap_or(u32::MAX);
        if confirmations >= required {
            Ok(ConfirmationStatus::Confirmed(receipt))
        } else {
            Ok(ConfirmationStatus::Confirming {
                current: confirmations,
                required,
            })
        }
    }
}

/// Apply the ceiling and the multiplier to the node's gas price.
fn adjust_gas_price(node_price: u128, settings: &SubmitSettings) -> BlockchainResult<u128> {
    let price_gwei = node_price / WEI_PER_GWEI;
    if price_gwei > settings.max_gas_price_gwei as u128 {
        return Err(BlockchainError::GasPriceTooHigh {
            current_gwei: price_gwei as u64,
            max_gwei: settings.max_gas_price_gwei,
        });
    }
    Ok((node_price as f64 * settings.gas_price_multiplier) as u128)
}

fn estimation_error(err: BlockchainError) -> GatewayError {
    match err {
        BlockchainError::Rejected(msg) => GatewayError::Estimation(msg),
        other => GatewayError::from_ledger(other),
    }
}

fn broadcast_error(err: BlockchainError) -> GatewayError {
    match err {
        BlockchainError::Rejected(msg) if is_sequence_conflict(&msg) => GatewayError::SequenceConflict(msg),
        other => GatewayError::from_ledger(other),
    }
}

fn is_sequence_conflict(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["nonce", "underpriced"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn is_already_known(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already known") || message.contains("already imported")
}
