//! Backfill of mined writes whose audit record could not be written.
//!
//! A chain write and its audit write are independent. When the second one
//! fails the outcome is parked here and retried on an interval until the
//! store accepts it. Recording is keyed by transaction hash, so a retry that
//! races a successful write is harmless.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time;

use crate::audit::recorder::AuditRecorder;
use crate::blockchain::contract::CallRequest;
use crate::blockchain::types::SubmissionOutcome;
use crate::observability::metrics;

/// An outcome still waiting for its audit record.
#[derive(Debug, Clone)]
pub struct PendingAudit {
    pub outcome: SubmissionOutcome,
    pub contract: Address,
    pub request: CallRequest,
    pub attempts: u32,
}

pub struct AuditReconciler {
    recorder: Arc<AuditRecorder>,
    pending: DashMap<TxHash, PendingAudit>,
    interval: Duration,
}

impl AuditReconciler {
    pub fn new(recorder: Arc<AuditRecorder>, interval: Duration) -> Self {
        Self {
            recorder,
            pending: DashMap::new(),
            interval,
        }
    }

    /// Park an outcome for later recording.
    pub fn enqueue(&self, outcome: SubmissionOutcome, contract: Address, request: CallRequest) {
        let tx_hash = outcome.transaction_hash;
        self.pending.entry(tx_hash).or_insert(PendingAudit {
            outcome,
            contract,
            request,
            attempts: 0,
        });
        metrics::record_reconciler_pending(self.pending.len());
        tracing::warn!(tx_hash = %tx_hash, "Audit write deferred to reconciler");
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, tx_hash: &TxHash) -> bool {
        self.pending.contains_key(tx_hash)
    }

    /// Try to record every parked outcome once. Returns how many were written.
    pub async fn reconcile_once(&self) -> usize {
        let batch: Vec<PendingAudit> = self.pending.iter().map(|r| r.value().clone()).collect();
        let mut written = 0;

        for item in batch {
            let tx_hash = item.outcome.transaction_hash;
            match self.recorder.record(&item.outcome, item.contract, &item.request).await {
                Ok(id) => {
                    self.pending.remove(&tx_hash);
                    metrics::record_backfill();
                    written += 1;
                    tracing::info!(tx_hash = %tx_hash, id, "Backfilled audit record");
                }
                Err(e) => {
                    if let Some(mut entry) = self.pending.get_mut(&tx_hash) {
                        entry.attempts += 1;
                        tracing::warn!(
                            tx_hash = %tx_hash,
                            attempts = entry.attempts,
                            error = %e,
                            "Audit backfill failed"
                        );
                    }
                }
            }
        }

        metrics::record_reconciler_pending(self.pending.len());
        written
    }

    /// Run until shutdown, retrying parked outcomes every interval.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Audit reconciler starting");
        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.pending.is_empty() {
                        self.reconcile_once().await;
                    }
                }
                _ = shutdown.recv() => {
                    if !self.pending.is_empty() {
                        tracing::warn!(pending = self.pending.len(), "Reconciler stopping with unrecorded outcomes");
                    }
                    break;
                }
            }
        }
    }
}
