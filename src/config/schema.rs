//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the ledger gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// Ledger node connection and submission settings.
    pub ledger: LedgerConfig,

    /// Target contract settings.
    pub contract: ContractConfig,

    /// Audit store settings.
    pub store: StoreConfig,

    /// Health probe settings.
    pub health: HealthConfig,

    /// Audit reconciliation settings.
    pub reconciler: ReconcilerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 180,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Ledger node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Network (chain) identifier used for EIP-155 signing.
    pub network_id: u64,

    /// Deadline for a single RPC request in seconds.
    pub rpc_timeout_secs: u64,

    /// Maximum time to wait for a receipt after broadcast, in seconds.
    pub receipt_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,

    /// Blocks required on top of the inclusion block (0 = receipt is enough).
    pub confirmation_blocks: u32,

    /// Gas price multiplier (1.0 = node price, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            network_id: 1337,
            rpc_timeout_secs: 10,
            receipt_timeout_secs: 120,
            receipt_poll_interval_ms: 1000,
            confirmation_blocks: 0,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
        }
    }
}

/// Target contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Deployed contract address. Absence is a valid, reported state.
    pub address: Option<String>,

    /// Human readable contract name.
    pub name: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: None,
            name: "SimpleStorage".to_string(),
        }
    }
}

/// Audit store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file. When unset the store lives in memory only.
    pub path: Option<String>,
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Per-probe deadline in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 5,
        }
    }
}

/// Background audit reconciliation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Enable the backfill task.
    pub enabled: bool,

    /// Retry interval in milliseconds.
    pub interval_ms: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.ledger.network_id, 1337);
        assert!(config.contract.address.is_none());
        assert!(config.reconciler.enabled);
    }

    #[test]
    fn test_partial_section_override() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [ledger]
            rpc_url = "http://besu:8545"
            receipt_timeout_secs = 30

            [contract]
            address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.rpc_url, "http://besu:8545");
        assert_eq!(config.ledger.receipt_timeout_secs, 30);
        assert_eq!(config.ledger.rpc_timeout_secs, 10);
        assert_eq!(
            config.contract.address.as_deref(),
            Some("0x5FbDB2315678afecb367f032d93F642f64180aa3")
        );
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
