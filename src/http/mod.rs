//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, input validation)
//!     → handlers.rs (one gateway operation per route)
//!     → response.rs (envelope, error → status)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, RequestIdExt, X_REQUEST_ID};
pub use response::{status_for, ApiError, ApiResponse};
pub use server::{AppState, HttpServer};
