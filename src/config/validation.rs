//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multiplier > 0)
//! - Check that URLs and addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use alloy::primitives::Address;

use crate::config::schema::GatewayConfig;

/// RPC round trips before the receipt wait starts: estimate, price, nonce, broadcast.
const SUBMIT_RPC_CALLS: u64 = 4;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }

    let ledger = &config.ledger;
    if url::Url::parse(&ledger.rpc_url).is_err() {
        errors.push(ValidationError::new(
            "ledger.rpc_url",
            format!("'{}' is not a valid URL", ledger.rpc_url),
        ));
    }
    for url in &ledger.failover_urls {
        if url::Url::parse(url).is_err() {
            errors.push(ValidationError::new(
                "ledger.failover_urls",
                format!("'{}' is not a valid URL", url),
            ));
        }
    }
    if ledger.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.rpc_timeout_secs", "must be > 0"));
    }
    if ledger.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.receipt_timeout_secs", "must be > 0"));
    }
    if ledger.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new("ledger.receipt_poll_interval_ms", "must be > 0"));
    }
    let write_budget = ledger
        .receipt_timeout_secs
        .saturating_add(ledger.rpc_timeout_secs.saturating_mul(SUBMIT_RPC_CALLS));
    if config.listener.request_timeout_secs <= write_budget {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            format!(
                "must exceed the write budget of {}s (receipt timeout plus {} RPC timeouts)",
                write_budget, SUBMIT_RPC_CALLS
            ),
        ));
    }
    if !(ledger.gas_price_multiplier.is_finite() && ledger.gas_price_multiplier > 0.0) {
        errors.push(ValidationError::new("ledger.gas_price_multiplier", "must be a positive number"));
    }

    if let Some(address) = &config.contract.address {
        if address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                "contract.address",
                format!("'{}' is not a valid address", address),
            ));
        }
    }

    if config.health.probe_timeout_secs == 0 {
        errors.push(ValidationError::new("health.probe_timeout_secs", "must be > 0"));
    }
    if config.reconciler.enabled && config.reconciler.interval_ms == 0 {
        errors.push(ValidationError::new("reconciler.interval_ms", "must be > 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
