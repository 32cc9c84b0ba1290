//! REST handlers. Each one validates input, calls one gateway operation and
//! renders the result.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::value::RawValue;

use crate::error::GatewayError;
use crate::http::request::{parse_set_value, HistoryQuery, RequestIdExt};
use crate::http::response::{ApiError, ApiResponse, Pagination};
use crate::http::server::AppState;

pub async fn get_value(State(state): State<AppState>) -> Result<Response, ApiError> {
    let value = state
        .gateway
        .read_value()
        .await
        .map_err(|e| ApiError::new("Failed to get stored value", e))?;
    Ok(ApiResponse::ok(value).into_response())
}

pub async fn set_value(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Box<RawValue>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) =
        body.map_err(|e| ApiError::new("Validation error", GatewayError::Validation(e.body_text())))?;
    let value = parse_set_value(&body).map_err(|e| ApiError::new("Validation error", e))?;

    tracing::debug!(request_id = %headers.request_id(), value = %value, "Write requested");

    let receipt = state
        .gateway
        .write_value(value)
        .await
        .map_err(|e| ApiError::new("Failed to set value", e))?;

    let status = if receipt.audit_pending {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    Ok(ApiResponse::ok(receipt).with_status(status))
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    let (limit, offset) = query.page().map_err(|e| ApiError::new("Validation error", e))?;

    let records = state
        .gateway
        .history(limit, offset)
        .await
        .map_err(|e| ApiError::new("Failed to get transaction history", e))?;
    let total = state
        .gateway
        .history_total()
        .await
        .map_err(|e| ApiError::new("Failed to get transaction history", e))?;

    Ok(ApiResponse::paginated(records, Pagination { limit, offset, total }).into_response())
}

pub async fn get_info(State(state): State<AppState>) -> Result<Response, ApiError> {
    let info = state
        .gateway
        .info()
        .await
        .map_err(|e| ApiError::new("Failed to get contract info", e))?;
    Ok(ApiResponse::ok(info).into_response())
}

pub async fn check_sync(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state
        .gateway
        .check()
        .await
        .map_err(|e| ApiError::new("Failed to check consistency", e))?;
    Ok(ApiResponse::ok(report).into_response())
}

pub async fn get_deployments(State(state): State<AppState>) -> Result<Response, ApiError> {
    let deployments = state
        .gateway
        .deployments()
        .await
        .map_err(|e| ApiError::new("Failed to get deployments", e))?;
    Ok(ApiResponse::ok(deployments).into_response())
}

/// Bare report: 200 when ok, 503 when degraded.
pub async fn health(State(state): State<AppState>) -> Response {
    let report = state.gateway.health().await;
    let status = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "success": false, "error": "Not found" })),
    )
        .into_response()
}
