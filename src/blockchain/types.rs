//! Ledger-facing types and the ledger error taxonomy.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::Serialize;
use thiserror::Error;

pub use crate::config::schema::LedgerConfig;

/// EIP-155 chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or transport failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node answered with a JSON-RPC error (e.g. execution would revert).
    #[error("Node rejected request: {0}")]
    Rejected(String),

    /// A single RPC call overran its deadline.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Included with failed status.
    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    /// No receipt within the bounded wait.
    #[error("No receipt for {tx_hash} after {secs} seconds")]
    ReceiptTimeout { tx_hash: TxHash, secs: u64 },

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Key material was never loaded or has been released.
    #[error("Signing key unavailable")]
    KeyUnavailable,

    /// Node price above the configured ceiling.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Node reports a different chain than configured.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Return data could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for ledger operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// A read-only call or an estimation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMessage {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

/// The parts of a receipt the gateway cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub success: bool,
}

/// Outcome of a mined write. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub success: bool,
    pub nonce: u64,
}

/// Transaction fields handed to the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub gas: u64,
    pub gas_price: u128,
    pub nonce: u64,
    pub value: U256,
}

/// Signed, EIP-2718 encoded transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub raw: Bytes,
}

/// Where a broadcast transaction is in its receipt wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// No receipt yet.
    Pending,
    /// Included, still short of the required depth.
    Confirming { current: u32, required: u32 },
    /// Included at the required depth with success status.
    Confirmed(ReceiptSummary),
    /// Included with failed status.
    Failed(ReceiptSummary),
}
