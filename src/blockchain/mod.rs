//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key custody, signing)
//! Config (RPC URLs, timeouts)
//!     → client.rs (RPC connection with timeouts and failover)
//! Write request
//!     → contract.rs (call encoding)
//!     → transaction.rs (estimate, price, sign, broadcast, confirm)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when the ledger is unreachable

pub mod client;
pub mod contract;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{LedgerClient, RpcLedgerClient};
pub use contract::{CallRequest, WriteMethod};
pub use transaction::{SubmitSettings, TransactionSubmitter};
pub use types::{BlockchainError, BlockchainResult, ChainId, SubmissionOutcome};
pub use wallet::Signer;
