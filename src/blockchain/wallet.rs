//! Key custody and transaction signing.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized
//! - `Signer::close` drops the key; the secp256k1 key zeroizes on drop

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind};
use alloy::signers::local::PrivateKeySigner;
use parking_lot::RwLock;

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, SignedTransaction, UnsignedTransaction,
};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "GATEWAY_SIGNER_PRIVATE_KEY";

/// Holds the service's single signing key for the lifetime of the process.
///
/// Only the derived address and signatures leave this type.
pub struct Signer {
    /// The key, `None` once released.
    key: RwLock<Option<PrivateKeySigner>>,
    /// Address derived at load time; stays readable after `close`.
    address: Address,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Signer {
    /// Create a signer from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let key: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let address = key.address();

        tracing::info!(
            address = %address,
            chain_id = chain_id,
            "Signer initialized"
        );

        Ok(Self {
            key: RwLock::new(Some(key)),
            address,
            chain_id,
        })
    }

    /// Load the signer from `GATEWAY_SIGNER_PRIVATE_KEY`.
    pub fn from_env(chain_id: u64) -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, chain_id)
    }

    /// The account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Chain ID this signer is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Whether key material is still held.
    pub fn is_loaded(&self) -> bool {
        self.key.read().is_some()
    }

    /// Sign a legacy (EIP-155) transaction and return its encoded bytes.
    pub fn sign(&self, unsigned: UnsignedTransaction) -> BlockchainResult<SignedTransaction> {
        if unsigned.from != self.address {
            return Err(BlockchainError::Wallet(format!(
                "Transaction sender {} does not match signer {}",
                unsigned.from, self.address
            )));
        }

        let guard = self.key.read();
        let key = guard.as_ref().ok_or(BlockchainError::KeyUnavailable)?;

        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: unsigned.nonce,
            gas_price: unsigned.gas_price,
            gas_limit: unsigned.gas,
            to: TxKind::Call(unsigned.to),
            value: unsigned.value,
            input: unsigned.data,
        };

        let signature = key
            .sign_transaction_sync(&mut tx)
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let raw = TxEnvelope::from(signed).encoded_2718();

        Ok(SignedTransaction {
            hash,
            raw: Bytes::from(raw),
        })
    }

    /// Release the key material. Subsequent `sign` calls fail with
    /// `KeyUnavailable`.
    pub fn close(&self) {
        if self.key.write().take().is_some() {
            tracing::info!(address = %self.address, "Signing key released");
        }
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
