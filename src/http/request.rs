//! Request identification and input validation.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID when the client did not send one
//! - Parse and bound caller input before it reaches the gateway
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Validation failures never reach the ledger or the store

use alloy::primitives::U256;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use serde::Deserialize;
use serde_json::value::RawValue;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::audit::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use crate::error::GatewayError;

pub const X_REQUEST_ID: &str = "x-request-id";

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Request ID source for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> &str {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Raw pagination query; values are checked by `page`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl HistoryQuery {
    /// Resolve to `(limit, offset)` with defaults 10 and 0.
    pub fn page(&self) -> Result<(usize, usize), GatewayError> {
        let limit = match self.limit.as_deref() {
            None => DEFAULT_HISTORY_LIMIT,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|l| (1..=MAX_HISTORY_LIMIT).contains(l))
                .ok_or_else(|| {
                    GatewayError::Validation(format!(
                        "\"limit\" must be an integer between 1 and {}",
                        MAX_HISTORY_LIMIT
                    ))
                })?,
        };

        let offset = match self.offset.as_deref() {
            None => 0,
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                GatewayError::Validation("\"offset\" must be a non-negative integer".into())
            })?,
        };

        Ok((limit, offset))
    }
}

#[derive(Deserialize)]
struct SetValueBody<'a> {
    #[serde(borrow, default)]
    value: Option<&'a RawValue>,
}

/// Parse `{"value": ...}` into a `uint256`.
///
/// Accepts a JSON integer or a string of decimal digits. The literal is
/// read as written so integers past `u64::MAX` keep their precision.
pub fn parse_set_value(body: &RawValue) -> Result<U256, GatewayError> {
    let invalid = || GatewayError::Validation("\"value\" must be an integer greater than or equal to 0".into());

    let parsed: SetValueBody<'_> = serde_json::from_str(body.get())
        .map_err(|e| GatewayError::Validation(format!("invalid request body: {}", e)))?;
    let raw = parsed
        .value
        .ok_or_else(|| GatewayError::Validation("\"value\" is required".into()))?
        .get()
        .trim();

    let digits = if raw.starts_with('"') {
        serde_json::from_str::<String>(raw).map_err(|_| invalid())?
    } else {
        raw.to_string()
    };
    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    U256::from_str_radix(digits, 10).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        assert_eq!(HistoryQuery::default().page().unwrap(), (10, 0));
    }

    #[test]
    fn test_page_bounds() {
        let q = HistoryQuery {
            limit: Some("100".into()),
            offset: Some("5".into()),
        };
        assert_eq!(q.page().unwrap(), (100, 5));

        for bad in ["0", "101", "-1", "ten"] {
            let q = HistoryQuery {
                limit: Some(bad.into()),
                offset: None,
            };
            assert!(matches!(q.page(), Err(GatewayError::Validation(_))), "{bad}");
        }

        let q = HistoryQuery {
            limit: None,
            offset: Some("-3".into()),
        };
        assert!(q.page().is_err());
    }

    fn body(text: &str) -> Box<RawValue> {
        RawValue::from_string(text.to_string()).unwrap()
    }

    #[test]
    fn test_set_value() {
        assert_eq!(parse_set_value(&body(r#"{"value": 42}"#)).unwrap(), U256::from(42));
        assert_eq!(parse_set_value(&body(r#"{"value": 0}"#)).unwrap(), U256::ZERO);
        assert_eq!(parse_set_value(&body(r#"{"value": "7"}"#)).unwrap(), U256::from(7));

        for bad in [
            "{}",
            r#"{"value": null}"#,
            r#"{"value": -1}"#,
            r#"{"value": 1.5}"#,
            r#"{"value": 1e3}"#,
            r#"{"value": "0x10"}"#,
            r#"{"value": true}"#,
        ] {
            assert!(matches!(parse_set_value(&body(bad)), Err(GatewayError::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn test_set_value_beyond_u64() {
        let two_pow_64 = U256::from(u64::MAX) + U256::from(1);
        assert_eq!(parse_set_value(&body(r#"{"value": 18446744073709551616}"#)).unwrap(), two_pow_64);
        assert_eq!(
            parse_set_value(&body(&format!(r#"{{"value": {}}}"#, U256::MAX))).unwrap(),
            U256::MAX
        );

        // One past uint256.
        let too_big = format!(r#"{{"value": "{}"}}"#, "9".repeat(78));
        assert!(parse_set_value(&body(&too_big)).is_err());
    }

    #[test]
    fn test_uuid_request_id() {
        let request = Request::new(());
        let id = MakeRequestUuidV4.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
