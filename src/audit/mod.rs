//! Audit recording subsystem.
//!
//! # Data Flow
//! ```text
//! Mined SubmissionOutcome + CallRequest
//!     → recorder.rs (map to record, idempotent by tx hash)
//!     → store.rs (append, query)
//!
//! Audit write failed after the chain write succeeded:
//!     → reconciler.rs (park outcome, retry until recorded)
//! ```
//!
//! # Design Decisions
//! - Records are append-only; nothing here updates or deletes them
//! - Only mined, successful outcomes are recorded
//! - No transaction spans the chain write and the audit write

pub mod reconciler;
pub mod recorder;
pub mod store;
pub mod types;

pub use reconciler::AuditReconciler;
pub use recorder::{AuditRecorder, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use store::{AuditStore, LocalAuditStore};
pub use types::{
    AuditRecord, DeploymentRecord, DeploymentStatus, NewDeployment, NewTransactionRecord,
    StoreError, TxStatus,
};
