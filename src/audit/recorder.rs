//! Maps mined submission outcomes onto audit records and serves history.

use std::sync::Arc;

use alloy::primitives::Address;

use crate::audit::store::AuditStore;
use crate::audit::types::{
    AuditRecord, DeploymentRecord, DeploymentStatus, NewDeployment, NewTransactionRecord,
    StoreError, TxStatus,
};
use crate::blockchain::contract::CallRequest;
use crate::blockchain::types::SubmissionOutcome;
use crate::observability::metrics;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 100;

pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Persist the audit record for a mined outcome and return its id.
    ///
    /// Keyed by transaction hash: recording the same outcome twice returns
    /// the existing id. Failure here never touches the chain transaction.
    pub async fn record(
        &self,
        outcome: &SubmissionOutcome,
        contract: Address,
        request: &CallRequest,
    ) -> Result<u64, StoreError> {
        if !outcome.success {
            return Err(StoreError::Constraint(format!(
                "{} did not execute successfully",
                outcome.transaction_hash
            )));
        }

        if let Some(existing) = self.store.find_transaction(outcome.transaction_hash).await? {
            metrics::record_audit_write("duplicate");
            return Ok(existing.id);
        }

        let record = NewTransactionRecord {
            tx_hash: outcome.transaction_hash,
            contract_address: contract,
            method_name: request.method.name().to_string(),
            input_data: request.input_payload(),
            block_number: outcome.block_number,
            gas_used: outcome.gas_used,
            status: TxStatus::Success,
        };

        match self.store.insert_transaction(record).await {
            Ok(stored) => {
                metrics::record_audit_write("written");
                tracing::debug!(id = stored.id, tx_hash = %stored.tx_hash, "Audit record written");
                Ok(stored.id)
            }
            Err(StoreError::Constraint(msg)) => {
                // A concurrent writer may have recorded the same hash.
                match self.store.find_transaction(outcome.transaction_hash).await? {
                    Some(existing) => Ok(existing.id),
                    None => {
                        metrics::record_audit_write("failed");
                        Err(StoreError::Constraint(msg))
                    }
                }
            }
            Err(e) => {
                metrics::record_audit_write("failed");
                Err(e)
            }
        }
    }

    /// Records for `contract`, newest first.
    pub async fn history(
        &self,
        contract: Address,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        self.store.transaction_history(contract, limit, offset).await
    }

    /// Most recent record for `contract`.
    pub async fn latest(&self, contract: Address) -> Result<Option<AuditRecord>, StoreError> {
        Ok(self.store.transaction_history(contract, 1, 0).await?.into_iter().next())
    }

    pub async fn count(&self, contract: Address) -> Result<u64, StoreError> {
        self.store.transaction_count(contract).await
    }

    pub async fn record_deployment(&self, deployment: NewDeployment) -> Result<u64, StoreError> {
        let stored = self.store.insert_deployment(deployment).await?;
        tracing::info!(
            contract_name = %stored.contract_name,
            contract_address = %stored.contract_address,
            "Deployment recorded"
        );
        Ok(stored.id)
    }

    /// Deployments with `status`, newest first.
    pub async fn deployments_of(&self, status: DeploymentStatus) -> Result<Vec<DeploymentRecord>, StoreError> {
        self.store.deployments(status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::store::LocalAuditStore;
    use alloy::primitives::{TxHash, U256};

    fn outcome(byte: u8) -> SubmissionOutcome {
        SubmissionOutcome {
            transaction_hash: TxHash::repeat_byte(byte),
            block_number: 1,
            gas_used: 21000,
            success: true,
            nonce: 0,
        }
    }

    fn recorder() -> AuditRecorder {
        AuditRecorder::new(Arc::new(LocalAuditStore::in_memory()))
    }

    #[tokio::test]
    async fn test_record_is_idempotent_by_hash() {
        let recorder = recorder();
        let contract = Address::repeat_byte(0x01);
        let request = CallRequest::set(U256::from(42));

        let first = recorder.record(&outcome(1), contract, &request).await.unwrap();
        let second = recorder.record(&outcome(1), contract, &request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(recorder.count(contract).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_refuses_failed_outcome() {
        let recorder = recorder();
        let mut failed = outcome(2);
        failed.success = false;

        let result = recorder
            .record(&failed, Address::ZERO, &CallRequest::set(U256::from(1)))
            .await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_latest_tracks_newest_write() {
        let recorder = recorder();
        let contract = Address::repeat_byte(0x01);
        assert!(recorder.latest(contract).await.unwrap().is_none());

        recorder.record(&outcome(1), contract, &CallRequest::set(U256::from(1))).await.unwrap();
        recorder.record(&outcome(2), contract, &CallRequest::set(U256::from(2))).await.unwrap();

        let latest = recorder.latest(contract).await.unwrap().unwrap();
        assert_eq!(latest.input_value(), Some("2"));
        assert_eq!(latest.method_name, "set");
    }

    #[tokio::test]
    async fn test_deployments_of_active() {
        let recorder = recorder();
        let id = recorder
            .record_deployment(NewDeployment {
                contract_name: "SimpleStorage".into(),
                contract_address: Address::repeat_byte(0xaa),
                deployer_address: Address::repeat_byte(0xbb),
                deployment_tx_hash: TxHash::repeat_byte(0xcc),
                deployment_block_number: 3,
                abi: serde_json::json!([]),
                bytecode: "0x".into(),
                network_id: 1337,
            })
            .await
            .unwrap();

        let active = recorder.deployments_of(DeploymentStatus::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, id);
    }
}
