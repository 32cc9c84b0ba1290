//! Composite health reporting.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → aggregator.rs (spawn each probe with its own deadline)
//!         → probes.rs: ledger (block height + peers)
//!         → probes.rs: store (ping)
//!         → probes.rs: contract (local config check)
//!     → state.rs (merge into HealthReport)
//! ```
//!
//! # Design Decisions
//! - One probe failing, panicking or stalling never aborts the others
//! - Overall status depends on ledger and store only
//! - A degraded report informs operators; it does not block reads or writes

pub mod aggregator;
pub mod probes;
pub mod state;

pub use aggregator::HealthAggregator;
pub use probes::{ContractProbe, LedgerProbe, Probe, StoreProbe};
pub use state::{HealthReport, OverallStatus, ProbeResult, ProbeState, ProbeStatus};
