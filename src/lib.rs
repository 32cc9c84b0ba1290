//! Ledger gateway library: submits contract writes to a remote ledger node,
//! records mined outcomes, and reports composite health.

pub mod audit;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
