//! Audit record types and store errors.

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by an audit store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write violates a uniqueness or integrity rule.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// On-chain status stored with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
}

/// A transaction record before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransactionRecord {
    pub tx_hash: TxHash,
    pub contract_address: Address,
    pub method_name: String,
    pub input_data: serde_json::Value,
    pub block_number: u64,
    pub gas_used: u64,
    pub status: TxStatus,
}

/// Append-only audit entry for a mined write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: u64,
    pub tx_hash: TxHash,
    pub contract_address: Address,
    pub method_name: String,
    pub input_data: serde_json::Value,
    pub block_number: u64,
    pub gas_used: u64,
    pub status: TxStatus,
    /// Unix milliseconds assigned by the store.
    pub timestamp: u64,
}

impl AuditRecord {
    /// The `value` field of the stored input, if present.
    pub fn input_value(&self) -> Option<&str> {
        self.input_data.get("value").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    #[default]
    Active,
    Inactive,
}

/// A contract deployment before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeployment {
    pub contract_name: String,
    pub contract_address: Address,
    pub deployer_address: Address,
    pub deployment_tx_hash: TxHash,
    pub deployment_block_number: u64,
    pub abi: serde_json::Value,
    pub bytecode: String,
    pub network_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: u64,
    pub contract_name: String,
    pub contract_address: Address,
    pub deployer_address: Address,
    pub deployment_tx_hash: TxHash,
    pub deployment_block_number: u64,
    pub abi: serde_json::Value,
    pub bytecode: String,
    pub network_id: u64,
    pub status: DeploymentStatus,
    /// Unix milliseconds assigned by the store.
    pub deployment_timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serde_uses_schema_names() {
        let record = AuditRecord {
            id: 1,
            tx_hash: TxHash::ZERO,
            contract_address: Address::ZERO,
            method_name: "set".into(),
            input_data: serde_json::json!({ "value": "42" }),
            block_number: 1,
            gas_used: 21000,
            status: TxStatus::Success,
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["method_name"], "set");
        assert_eq!(json["status"], "success");
        assert_eq!(record.input_value(), Some("42"));
    }
}
