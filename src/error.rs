//! Gateway-level error taxonomy.
//!
//! Each component fails locally with its own typed error; this enum is
//! what operations hand to callers. The HTTP mapping lives in
//! `http::response`.

use thiserror::Error;

use crate::audit::types::StoreError;
use crate::blockchain::types::BlockchainError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Required configuration is missing (e.g. no contract address).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The node refused to estimate the call; it would revert.
    #[error("Gas estimation failed: {0}")]
    Estimation(String),

    /// The node rejected the signed transaction.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The transaction was mined but execution failed.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Ledger or store unreachable.
    #[error("Network error: {0}")]
    Network(String),

    /// A bounded wait elapsed.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The account's sequence number collided with another transaction.
    #[error("Sequence conflict: {0}")]
    SequenceConflict(String),

    /// Node gas price above the configured ceiling.
    #[error("{0}")]
    GasPriceTooHigh(String),

    /// Signing key not loaded or already released.
    #[error("Signing key unavailable")]
    KeyUnavailable,

    /// Audit store rejected or could not perform the operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The operation's task died before producing a result.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Generic mapping for ledger errors outside the submission pipeline.
    pub fn from_ledger(err: BlockchainError) -> Self {
        match err {
            BlockchainError::Rpc(msg) => GatewayError::Network(msg),
            BlockchainError::Rejected(msg) => GatewayError::Rejected(msg),
            BlockchainError::Timeout(secs) => {
                GatewayError::Timeout(format!("RPC call exceeded {} seconds", secs))
            }
            BlockchainError::Reverted { tx_hash } => GatewayError::Reverted(tx_hash.to_string()),
            e @ BlockchainError::ReceiptTimeout { .. } => GatewayError::Timeout(e.to_string()),
            BlockchainError::KeyUnavailable => GatewayError::KeyUnavailable,
            e @ BlockchainError::GasPriceTooHigh { .. } => GatewayError::GasPriceTooHigh(e.to_string()),
            e @ (BlockchainError::ChainMismatch { .. } | BlockchainError::Wallet(_)) => {
                GatewayError::Configuration(e.to_string())
            }
            e @ BlockchainError::Decode(_) => GatewayError::Network(e.to_string()),
        }
    }

    /// Stable machine-readable label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "configuration",
            GatewayError::Validation(_) => "validation",
            GatewayError::Estimation(_) => "estimation",
            GatewayError::Rejected(_) => "rejected",
            GatewayError::Reverted(_) => "reverted",
            GatewayError::Network(_) => "network",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::SequenceConflict(_) => "sequence_conflict",
            GatewayError::GasPriceTooHigh(_) => "gas_price",
            GatewayError::KeyUnavailable => "key_unavailable",
            GatewayError::Store(_) => "store",
            GatewayError::Internal(_) => "internal",
        }
    }
}
