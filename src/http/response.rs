//! Response envelope and error → status mapping.
//!
//! Every JSON body except `/health` uses
//! `{ success, data | error, details, kind }`. `/health` returns the bare
//! report so monitors can read it without unwrapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::audit::StoreError;
use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            pagination: None,
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            success: true,
            data: Some(data),
            pagination: Some(pagination),
        }
    }

    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        self.with_status(StatusCode::OK)
    }
}

/// A failed operation, ready to render.
#[derive(Debug)]
pub struct ApiError {
    /// What the caller was trying to do, e.g. "Failed to set value".
    pub context: &'static str,
    pub error: GatewayError,
}

impl ApiError {
    pub fn new(context: &'static str, error: GatewayError) -> Self {
        Self { context, error }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    details: String,
    kind: &'static str,
}

/// HTTP status for each error category.
pub fn status_for(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::Validation(_)
        | GatewayError::Estimation(_)
        | GatewayError::Reverted(_)
        | GatewayError::Rejected(_) => StatusCode::BAD_REQUEST,
        GatewayError::SequenceConflict(_) => StatusCode::CONFLICT,
        GatewayError::Network(_)
        | GatewayError::GasPriceTooHigh(_)
        | GatewayError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Configuration(_)
        | GatewayError::KeyUnavailable
        | GatewayError::Store(_)
        | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        if status.is_server_error() {
            tracing::error!(error = %self.error, kind = self.error.kind(), "{}", self.context);
        } else {
            tracing::warn!(error = %self.error, kind = self.error.kind(), "{}", self.context);
        }

        let body = ErrorBody {
            success: false,
            error: self.context,
            details: self.error.to_string(),
            kind: self.error.kind(),
        };
        (status, Json(body)).into_response()
    }
}
