//! Persisted deployment records.
//!
//! One pretty-printed JSON file per network and contract:
//! `{deployments_dir}/{network}/{Contract}.json`.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DeployError, DeployResult};

/// The network a run targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{name} (chain id {chain_id})")]
pub struct NetworkIdentity {
    pub name: String,
    pub chain_id: u64,
}

/// A deployed proxy and the implementation it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub network: NetworkIdentity,
    /// Stable address users interact with.
    pub proxy_address: Address,
    /// Current logic contract. Only changed by an upgrade.
    pub implementation_address: Address,
    /// Hash of the implementation inputs, see [`crate::DeploymentHash`].
    pub bytecode_hash: String,
    pub abi: Value,
    pub deployed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded_at: Option<DateTime<Utc>>,
}

/// Directory of deployment records.
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    root: PathBuf,
}

impl DeploymentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, network: &str, contract_name: &str) -> PathBuf {
        self.root.join(network).join(format!("{contract_name}.json"))
    }

    /// Load the record for `contract_name` on `network`, if one was ever saved.
    pub fn load(
        &self,
        network: &str,
        contract_name: &str,
    ) -> DeployResult<Option<DeploymentRecord>> {
        let path = self.record_path(network, contract_name);
        if !path.exists() {
            return Ok(None);
        }
        load_record(&path).map(Some)
    }

    /// Load the record for `contract_name` on the connected `network`.
    ///
    /// Records are filed by network name, so a record saved while that name pointed at
    /// another chain is rejected rather than reused.
    pub fn load_for(
        &self,
        network: &NetworkIdentity,
        contract_name: &str,
    ) -> DeployResult<Option<DeploymentRecord>> {
        let Some(record) = self.load(&network.name, contract_name)? else {
            return Ok(None);
        };

        if record.network.chain_id != network.chain_id {
            return Err(DeployError::config(format!(
                "{contract_name} record for network '{}' was saved on chain id {} but the node \
                 reports {}; point the network at the right node or move {}",
                network.name,
                record.network.chain_id,
                network.chain_id,
                self.record_path(&network.name, contract_name).display()
            )));
        }
        Ok(Some(record))
    }

    /// Save a record, replacing any previous one for the same network and contract.
    pub fn save(&self, record: &DeploymentRecord) -> DeployResult<PathBuf> {
        let path = self.record_path(&record.network.name, &record.contract_name);
        let parent = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(|e| DeployError::store(parent, e))?;

        let json =
            serde_json::to_string_pretty(record).map_err(|e| DeployError::store(&path, e))?;
        std::fs::write(&path, json).map_err(|e| DeployError::store(&path, e))?;

        tracing::debug!(path = %path.display(), "Deployment record saved");
        Ok(path)
    }

    /// All records saved for `network`, sorted by contract name.
    pub fn list(&self, network: &str) -> DeployResult<Vec<DeploymentRecord>> {
        let dir = self.root.join(network);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| DeployError::store(&dir, e))?;
        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| DeployError::store(&dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                records.push(load_record(&path)?);
            }
        }
        records.sort_by(|a, b| a.contract_name.cmp(&b.contract_name));
        Ok(records)
    }
}

fn load_record(path: &Path) -> DeployResult<DeploymentRecord> {
    let content = std::fs::read_to_string(path).map_err(|e| DeployError::store(path, e))?;
    serde_json::from_str(&content).map_err(|e| DeployError::store(path, e))
}
