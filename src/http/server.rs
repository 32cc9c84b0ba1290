//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Serve on a listener until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::gateway::Gateway;
use crate::http::handlers;
use crate::http::request::{request_id_header, MakeRequestUuidV4};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let listener = gateway.config().listener.clone();
        let router = Self::build_router(&listener, AppState { gateway });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/simple-storage",
                get(handlers::get_value).post(handlers::set_value),
            )
            .route("/simple-storage/history", get(handlers::get_history))
            .route("/simple-storage/info", get(handlers::get_info))
            .route("/simple-storage/check", get(handlers::check_sync))
            .route("/deployments", get(handlers::get_deployments))
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuidV4))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes, TxHash, U256};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::audit::LocalAuditStore;
    use crate::blockchain::types::{BlockchainError, BlockchainResult, CallMessage, ChainId, ReceiptSummary};
    use crate::blockchain::{LedgerClient, Signer};
    use crate::config::GatewayConfig;

    /// Every call fails as if the node were down.
    struct OfflineLedger;

    fn down<T>() -> BlockchainResult<T> {
        Err(BlockchainError::Rpc("connection refused".into()))
    }

    #[async_trait]
    impl LedgerClient for OfflineLedger {
        async fn chain_id(&self) -> BlockchainResult<ChainId> { down() }
        async fn block_number(&self) -> BlockchainResult<u64> { down() }
        async fn peer_count(&self) -> BlockchainResult<u64> { down() }
        async fn gas_price(&self) -> BlockchainResult<u128> { down() }
        async fn balance(&self, _: Address) -> BlockchainResult<U256> { down() }
        async fn pending_nonce(&self, _: Address) -> BlockchainResult<u64> { down() }
        async fn call(&self, _: CallMessage) -> BlockchainResult<Bytes> { down() }
        async fn estimate_gas(&self, _: CallMessage) -> BlockchainResult<u64> { down() }
        async fn send_raw_transaction(&self, _: Bytes) -> BlockchainResult<TxHash> { down() }
        async fn transaction_receipt(&self, _: TxHash) -> BlockchainResult<Option<ReceiptSummary>> { down() }
    }

    fn router() -> Router {
        let mut config = GatewayConfig::default();
        config.contract.address = Some(Address::repeat_byte(0x01).to_string());
        config.health.probe_timeout_secs = 1;

        let signer = Signer::from_private_key(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            config.ledger.network_id,
        )
        .unwrap();
        let gateway = Gateway::new(
            config,
            Arc::new(OfflineLedger),
            Arc::new(signer),
            Arc::new(LocalAuditStore::in_memory()),
        );
        HttpServer::new(Arc::new(gateway)).router()
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_envelope() {
        let res = router()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_health_degraded_when_ledger_down() {
        let res = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let res = router()
            .oneshot(
                Request::post("/simple-storage")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_read_with_ledger_down_is_503() {
        let res = router()
            .oneshot(Request::get("/simple-storage").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
