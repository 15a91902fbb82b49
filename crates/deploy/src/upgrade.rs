//! Repointing an existing proxy to a new implementation.

use alloy_core::primitives::Address;
use chrono::Utc;

use crate::{
    ChainClient, ContractArtifact, DeployError, DeployResult, DeploymentHash, DeploymentRecord,
    DeploymentStore, NetworkIdentity, ProxyMode, calldata, proxy::deploy_implementation,
};

/// Result of an upgrade run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOutcome {
    pub record: DeploymentRecord,
    /// Implementation the proxy pointed to before this run.
    pub previous_implementation: Address,
    /// False when the implementation was already current and nothing was sent.
    pub upgraded: bool,
}

/// Deploys new logic and repoints the proxy to it, keeping the proxy address and storage.
///
/// Never registers the stake pool again.
pub struct UpgradeOrchestrator<'a, C> {
    chain: &'a C,
    store: &'a DeploymentStore,
    network: &'a NetworkIdentity,
}

impl<'a, C: ChainClient> UpgradeOrchestrator<'a, C> {
    pub fn new(chain: &'a C, store: &'a DeploymentStore, network: &'a NetworkIdentity) -> Self {
        Self {
            chain,
            store,
            network,
        }
    }

    /// Upgrade the proxy recorded for `contract` on this network.
    ///
    /// `deployer` must be the proxy owner.
    pub async fn upgrade(
        &self,
        contract: &ContractArtifact,
        deployer: Address,
        mode: &ProxyMode,
    ) -> DeployResult<UpgradeOutcome> {
        if *mode != ProxyMode::Upgrade {
            return Err(DeployError::config(
                "upgrade requires upgrade mode; initializers only run on first deploy",
            ));
        }

        let mut record = self
            .store
            .load_for(self.network, &contract.name)?
            .ok_or_else(|| DeployError::NoExistingProxy {
                contract: contract.name.clone(),
                network: self.network.name.clone(),
            })?;
        let previous_implementation = record.implementation_address;

        let bytecode_hash = DeploymentHash::from_artifact(contract).compute_hash();
        if record.bytecode_hash == bytecode_hash {
            tracing::info!(
                contract = %contract.name,
                proxy = %record.proxy_address,
                implementation = %previous_implementation,
                "Implementation already up to date, nothing to upgrade"
            );
            return Ok(UpgradeOutcome {
                record,
                previous_implementation,
                upgraded: false,
            });
        }

        tracing::info!(
            contract = %contract.name,
            network = %self.network,
            proxy = %record.proxy_address,
            deployer = %deployer,
            "Upgrading proxy..."
        );

        let implementation = deploy_implementation(self.chain, deployer, contract).await?;
        let receipt = self
            .chain
            .send_transaction(
                deployer,
                record.proxy_address,
                calldata::encode_upgrade_to(implementation),
            )
            .await?;

        record.implementation_address = implementation;
        record.bytecode_hash = bytecode_hash;
        record.abi = contract.abi.clone();
        record.upgraded_at = Some(Utc::now());
        self.store.save(&record)?;

        tracing::info!(
            contract = %contract.name,
            proxy = %record.proxy_address,
            previous_implementation = %previous_implementation,
            implementation = %implementation,
            tx_hash = %receipt.transaction_hash,
            "Proxy upgraded"
        );

        Ok(UpgradeOutcome {
            record,
            previous_implementation,
            upgraded: true,
        })
    }
}
