//! Idempotent deploy-or-reuse of the upgradeable proxy.

use alloy_core::primitives::Address;
use chrono::Utc;

use crate::{
    AccountRoles, ChainClient, ContractArtifact, DeployError, DeployResult, DeploymentHash,
    DeploymentRecord, DeploymentStore, NetworkIdentity, calldata,
};

/// How an entry point drives the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMode {
    /// Create the proxy if missing, calling `method()` once through its constructor.
    Initialize { method: String },
    /// Repoint an existing proxy to new logic.
    Upgrade,
}

/// What a deploy call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeployStatus {
    /// The proxy was created by this call.
    Fresh,
    /// A proxy with the same implementation already existed; nothing was sent.
    Reused,
    /// A proxy exists but the implementation inputs changed; nothing was sent and an
    /// upgrade is required to apply the change.
    Outdated,
}

/// A deployment record tagged with how this call obtained it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDeployment {
    pub record: DeploymentRecord,
    pub status: DeployStatus,
}

impl ProxyDeployment {
    pub fn is_fresh(&self) -> bool {
        self.status == DeployStatus::Fresh
    }
}

/// Deploys the proxy and implementation, or reuses what a previous run deployed.
pub struct ProxyDeployer<'a, C> {
    chain: &'a C,
    store: &'a DeploymentStore,
    network: &'a NetworkIdentity,
}

impl<'a, C: ChainClient> ProxyDeployer<'a, C> {
    pub fn new(chain: &'a C, store: &'a DeploymentStore, network: &'a NetworkIdentity) -> Self {
        Self {
            chain,
            store,
            network,
        }
    }

    /// Deploy `contract` behind `proxy`, or return the existing deployment.
    ///
    /// No record: the implementation is deployed, then the proxy is created with the
    /// initializer calldata so creation and initialization are one transaction.
    /// Existing record: returned as is without sending anything, tagged
    /// [`DeployStatus::Reused`] when the implementation hash matches and
    /// [`DeployStatus::Outdated`] otherwise.
    pub async fn deploy(
        &self,
        contract: &ContractArtifact,
        proxy: &ContractArtifact,
        roles: &AccountRoles,
        mode: &ProxyMode,
    ) -> DeployResult<ProxyDeployment> {
        let ProxyMode::Initialize { method } = mode else {
            return Err(DeployError::config(
                "deploy requires an initializer; use the upgrade entry point to repoint a proxy",
            ));
        };

        let bytecode_hash = DeploymentHash::from_artifact(contract).compute_hash();

        if let Some(record) = self.store.load_for(self.network, &contract.name)? {
            let status = if record.bytecode_hash == bytecode_hash {
                tracing::info!(
                    contract = %contract.name,
                    network = %self.network,
                    proxy = %record.proxy_address,
                    "Reusing existing deployment, bytecode unchanged"
                );
                DeployStatus::Reused
            } else {
                tracing::warn!(
                    contract = %contract.name,
                    network = %self.network,
                    proxy = %record.proxy_address,
                    deployed_hash = %record.bytecode_hash,
                    current_hash = %bytecode_hash,
                    "Bytecode changed since deployment, run upgrade to apply it"
                );
                DeployStatus::Outdated
            };
            return Ok(ProxyDeployment { record, status });
        }

        tracing::info!(
            contract = %contract.name,
            network = %self.network,
            deployer = %roles.deployer,
            initializer = %method,
            "No existing deployment, deploying proxy..."
        );

        let implementation = deploy_implementation(self.chain, roles.deployer, contract).await?;

        let init_code = calldata::encode_proxy_creation(
            &proxy.bytecode,
            implementation,
            roles.deployer,
            calldata::encode_initializer(method),
        );
        let receipt = self.chain.deploy_contract(roles.deployer, init_code).await?;
        let proxy_address = created_address(receipt.contract_address, &proxy.name)?;

        tracing::info!(
            contract = %contract.name,
            proxy = %proxy_address,
            implementation = %implementation,
            tx_hash = %receipt.transaction_hash,
            "Proxy deployed and initialized"
        );

        let record = DeploymentRecord {
            contract_name: contract.name.clone(),
            network: self.network.clone(),
            proxy_address,
            implementation_address: implementation,
            bytecode_hash,
            abi: contract.abi.clone(),
            deployed_at: Utc::now(),
            upgraded_at: None,
        };
        self.store.save(&record)?;

        Ok(ProxyDeployment {
            record,
            status: DeployStatus::Fresh,
        })
    }
}

/// Deploy the implementation contract and return its address.
pub(crate) async fn deploy_implementation<C: ChainClient>(
    chain: &C,
    from: Address,
    contract: &ContractArtifact,
) -> DeployResult<Address> {
    tracing::info!(contract = %contract.name, "Deploying implementation...");
    let receipt = chain
        .deploy_contract(from, contract.bytecode.clone())
        .await?;
    let address = created_address(receipt.contract_address, &contract.name)?;
    tracing::info!(
        contract = %contract.name,
        implementation = %address,
        tx_hash = %receipt.transaction_hash,
        "Implementation deployed"
    );
    Ok(address)
}

fn created_address(address: Option<Address>, name: &str) -> DeployResult<Address> {
    address.ok_or_else(|| {
        DeployError::Network(format!("creation receipt for {name} has no contract address"))
    })
}
