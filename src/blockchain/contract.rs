//! Call encoding for the single storage contract the gateway fronts.
//!
//! The surface is fixed: `get()` reads the stored value, `set(uint256)`
//! writes it. No general ABI handling lives here.

use std::fmt;

use alloy::primitives::{Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde::Serialize;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

sol! {
    interface ISimpleStorage {
        function get() external view returns (uint256);
        function set(uint256 x) external;
    }
}

/// State-changing methods of the storage contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMethod {
    Set,
}

impl WriteMethod {
    pub fn name(&self) -> &'static str {
        match self {
            WriteMethod::Set => "set",
        }
    }
}

impl fmt::Display for WriteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single logical write, built per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub method: WriteMethod,
    pub value: U256,
}

impl CallRequest {
    pub fn set(value: U256) -> Self {
        Self {
            method: WriteMethod::Set,
            value,
        }
    }

    /// ABI-encoded call data.
    pub fn encode(&self) -> Bytes {
        match self.method {
            WriteMethod::Set => ISimpleStorage::setCall { x: self.value }.abi_encode().into(),
        }
    }

    /// Structured input persisted alongside the audit record.
    pub fn input_payload(&self) -> serde_json::Value {
        serde_json::json!({ "value": self.value.to_string() })
    }
}

/// Call data for `get()`.
pub fn encode_get() -> Bytes {
    ISimpleStorage::getCall {}.abi_encode().into()
}

/// Decode the return data of `get()`.
pub fn decode_get(data: &[u8]) -> BlockchainResult<U256> {
    ISimpleStorage::getCall::abi_decode_returns(data)
        .map_err(|e| BlockchainError::Decode(format!("get() returned malformed data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_encoding_has_selector_and_word() {
        let data = CallRequest::set(U256::from(42)).encode();
        assert_eq!(&data[..4], ISimpleStorage::setCall::SELECTOR.as_slice());
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 42);
    }

    #[test]
    fn test_get_selector() {
        // keccak256("get()")[..4]
        assert_eq!(encode_get().as_ref(), &[0x6d, 0x4c, 0xe6, 0x3c]);
    }

    #[test]
    fn test_decode_get_word() {
        let word = U256::from(42).to_be_bytes::<32>();
        assert_eq!(decode_get(&word).unwrap(), U256::from(42));
    }

    #[test]
    fn test_decode_get_rejects_short_data() {
        assert!(matches!(decode_get(&[0x01, 0x02]), Err(BlockchainError::Decode(_))));
    }

    #[test]
    fn test_input_payload_is_decimal_string() {
        let request = CallRequest::set(U256::from(42));
        assert_eq!(request.input_payload(), serde_json::json!({ "value": "42" }));
        assert_eq!(request.method.to_string(), "set");
    }
}
