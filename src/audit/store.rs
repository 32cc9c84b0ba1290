//! Audit persistence.
//!
//! `AuditStore` is the seam the recorder and the health probe depend on.
//! `LocalAuditStore` keeps both tables in memory and, when given a path,
//! snapshots them to a JSON file after every append.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::audit::types::{
    AuditRecord, DeploymentRecord, DeploymentStatus, NewDeployment, NewTransactionRecord,
    StoreError,
};

/// Durable append/query of transaction and deployment records.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a transaction record. Duplicate `tx_hash` is a constraint violation.
    async fn insert_transaction(&self, record: NewTransactionRecord) -> Result<AuditRecord, StoreError>;

    async fn find_transaction(&self, tx_hash: TxHash) -> Result<Option<AuditRecord>, StoreError>;

    /// Records for `contract`, newest first.
    async fn transaction_history(
        &self,
        contract: Address,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AuditRecord>, StoreError>;

    async fn transaction_count(&self, contract: Address) -> Result<u64, StoreError>;

    async fn insert_deployment(&self, deployment: NewDeployment) -> Result<DeploymentRecord, StoreError>;

    /// Deployments with `status`, newest first.
    async fn deployments(&self, status: DeploymentStatus) -> Result<Vec<DeploymentRecord>, StoreError>;

    /// Trivial liveness query; returns the store clock in unix milliseconds.
    async fn ping(&self) -> Result<u64, StoreError>;
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Tables {
    next_id: u64,
    transactions: Vec<AuditRecord>,
    deployments: Vec<DeploymentRecord>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process audit store with optional JSON snapshot persistence.
pub struct LocalAuditStore {
    tables: RwLock<Tables>,
    path: Option<PathBuf>,
}

impl LocalAuditStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            path: None,
        }
    }

    /// Open a snapshot-backed store, loading the file if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let tables: Tables = serde_json::from_reader(reader)?;
            tracing::info!(
                path = %path.display(),
                transactions = tables.transactions.len(),
                deployments = tables.deployments.len(),
                "Loaded audit snapshot"
            );
            tables
        } else {
            Tables::default()
        };

        Ok(Self {
            tables: RwLock::new(tables),
            path: Some(path),
        })
    }

    /// Build from config: snapshot-backed when a path is given.
    pub fn from_path(path: Option<&str>) -> Result<Self, StoreError> {
        match path {
            Some(path) => Self::open(path),
            None => Ok(Self::in_memory()),
        }
    }

    fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, tables)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for LocalAuditStore {
    async fn insert_transaction(&self, record: NewTransactionRecord) -> Result<AuditRecord, StoreError> {
        let mut tables = self.tables.write();

        if tables.transactions.iter().any(|r| r.tx_hash == record.tx_hash) {
            return Err(StoreError::Constraint(format!(
                "duplicate tx_hash {}",
                record.tx_hash
            )));
        }

        let stored = AuditRecord {
            id: tables.allocate_id(),
            tx_hash: record.tx_hash,
            contract_address: record.contract_address,
            method_name: record.method_name,
            input_data: record.input_data,
            block_number: record.block_number,
            gas_used: record.gas_used,
            status: record.status,
            timestamp: now_millis(),
        };
        tables.transactions.push(stored.clone());

        if let Err(e) = self.persist(&tables) {
            tables.transactions.pop();
            return Err(e);
        }
        Ok(stored)
    }

    async fn find_transaction(&self, tx_hash: TxHash) -> Result<Option<AuditRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .transactions
            .iter()
            .find(|r| r.tx_hash == tx_hash)
            .cloned())
    }

    async fn transaction_history(
        &self,
        contract: Address,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        let tables = self.tables.read();
        let mut records: Vec<&AuditRecord> = tables
            .transactions
            .iter()
            .filter(|r| r.contract_address == contract)
            .collect();
        records.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));

        Ok(records
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn transaction_count(&self, contract: Address) -> Result<u64, StoreError> {
        Ok(self
            .tables
            .read()
            .transactions
            .iter()
            .filter(|r| r.contract_address == contract)
            .count() as u64)
    }

    async fn insert_deployment(&self, deployment: NewDeployment) -> Result<DeploymentRecord, StoreError> {
        let mut tables = self.tables.write();

        let stored = DeploymentRecord {
            id: tables.allocate_id(),
            contract_name: deployment.contract_name,
            contract_address: deployment.contract_address,
            deployer_address: deployment.deployer_address,
            deployment_tx_hash: deployment.deployment_tx_hash,
            deployment_block_number: deployment.deployment_block_number,
            abi: deployment.abi,
            bytecode: deployment.bytecode,
            network_id: deployment.network_id,
            status: DeploymentStatus::Active,
            deployment_timestamp: now_millis(),
        };
        tables.deployments.push(stored.clone());

        if let Err(e) = self.persist(&tables) {
            tables.deployments.pop();
            return Err(e);
        }
        Ok(stored)
    }

    async fn deployments(&self, status: DeploymentStatus) -> Result<Vec<DeploymentRecord>, StoreError> {
        let tables = self.tables.read();
        let mut records: Vec<DeploymentRecord> = tables
            .deployments
            .iter()
            .filter(|d| d.status == status)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (b.deployment_timestamp, b.id).cmp(&(a.deployment_timestamp, a.id))
        });
        Ok(records)
    }

    async fn ping(&self) -> Result<u64, StoreError> {
        if let Some(path) = &self.path {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            fs::metadata(dir).map_err(|e| {
                StoreError::Unavailable(format!("{}: {}", dir.display(), e))
            })?;
        }
        Ok(now_millis())
    }
}

impl std::fmt::Debug for LocalAuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAuditStore")
            .field("path", &self.path)
            .field("transactions", &self.tables.read().transactions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::TxStatus;

    fn record(hash_byte: u8, contract: Address, value: u64) -> NewTransactionRecord {
        NewTransactionRecord {
            tx_hash: TxHash::repeat_byte(hash_byte),
            contract_address: contract,
            method_name: "set".into(),
            input_data: serde_json::json!({ "value": value.to_string() }),
            block_number: hash_byte as u64,
            gas_used: 21000,
            status: TxStatus::Success,
        }
    }

    fn deployment(name: &str) -> NewDeployment {
        NewDeployment {
            contract_name: name.into(),
            contract_address: Address::repeat_byte(0xaa),
            deployer_address: Address::repeat_byte(0xbb),
            deployment_tx_hash: TxHash::repeat_byte(0xcc),
            deployment_block_number: 1,
            abi: serde_json::json!([]),
            bytecode: "0x6080".into(),
            network_id: 1337,
        }
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_paginated() {
        let store = LocalAuditStore::in_memory();
        let contract = Address::repeat_byte(0x01);
        for i in 1..=5u8 {
            store.insert_transaction(record(i, contract, i as u64)).await.unwrap();
        }
        store
            .insert_transaction(record(9, Address::repeat_byte(0x02), 9))
            .await
            .unwrap();

        let page = store.transaction_history(contract, 2, 1).await.unwrap();
        let values: Vec<_> = page.iter().filter_map(|r| r.input_value()).collect();
        assert_eq!(values, vec!["4", "3"]);
        assert_eq!(store.transaction_count(contract).await.unwrap(), 5);

        let again = store.transaction_history(contract, 2, 1).await.unwrap();
        assert_eq!(page, again);
    }

    #[tokio::test]
    async fn test_duplicate_hash_is_constraint_violation() {
        let store = LocalAuditStore::in_memory();
        let contract = Address::repeat_byte(0x01);
        store.insert_transaction(record(1, contract, 1)).await.unwrap();

        let err = store.insert_transaction(record(1, contract, 2)).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.transaction_count(contract).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let contract = Address::repeat_byte(0x01);

        {
            let store = LocalAuditStore::open(&path).unwrap();
            store.insert_transaction(record(1, contract, 42)).await.unwrap();
            store.insert_deployment(deployment("SimpleStorage")).await.unwrap();
        }

        let reopened = LocalAuditStore::open(&path).unwrap();
        let found = reopened
            .find_transaction(TxHash::repeat_byte(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.input_value(), Some("42"));

        // ids keep increasing across restarts
        let next = reopened.insert_transaction(record(2, contract, 7)).await.unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_deployments_filter_by_status() {
        let store = LocalAuditStore::in_memory();
        store.insert_deployment(deployment("A")).await.unwrap();
        store.insert_deployment(deployment("B")).await.unwrap();

        let active = store.deployments(DeploymentStatus::Active).await.unwrap();
        let names: Vec<_> = active.iter().map(|d| d.contract_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert!(store.deployments(DeploymentStatus::Inactive).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ping_fails_when_snapshot_dir_missing() {
        let store = LocalAuditStore::open("/nonexistent-gateway-dir/audit.json").unwrap();
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        assert!(LocalAuditStore::in_memory().ping().await.is_ok());
    }
}
