//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const RPC_URL_ENV_VAR: &str = "GATEWAY_RPC_URL";
pub const NETWORK_ID_ENV_VAR: &str = "GATEWAY_NETWORK_ID";
pub const CONTRACT_ADDRESS_ENV_VAR: &str = "GATEWAY_CONTRACT_ADDRESS";
pub const STORE_PATH_ENV_VAR: &str = "GATEWAY_STORE_PATH";
pub const BIND_ADDRESS_ENV_VAR: &str = "GATEWAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment override {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    let config = apply_env_overrides(config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment values onto a parsed configuration.
///
/// `lookup` abstracts the environment so overrides can be tested without
/// touching process state.
pub fn apply_env_overrides<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(RPC_URL_ENV_VAR) {
        config.ledger.rpc_url = url;
    }
    if let Some(raw) = lookup(NETWORK_ID_ENV_VAR) {
        config.ledger.network_id = raw.trim().parse().map_err(|e| ConfigError::Env {
            var: NETWORK_ID_ENV_VAR,
            message: format!("'{}': {}", raw, e),
        })?;
    }
    if let Some(address) = lookup(CONTRACT_ADDRESS_ENV_VAR) {
        let address = address.trim();
        config.contract.address = if address.is_empty() {
            None
        } else {
            Some(address.to_string())
        };
    }
    if let Some(path) = lookup(STORE_PATH_ENV_VAR) {
        config.store.path = Some(path);
    }
    if let Some(bind) = lookup(BIND_ADDRESS_ENV_VAR) {
        config.listener.bind_address = bind;
    }
    Ok(config)
}
