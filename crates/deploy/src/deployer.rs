use alloy_core::primitives::Address;

use crate::{
    AccountResolver, AccountRoles, ChainClient, ContractArtifact, DeployConfig, DeployError,
    DeployResult, DeploymentStore, HdWallet, JsonRpcChain, NetworkIdentity, PostDeployInitializer,
    ProxyDeployer, ProxyDeployment, ProxyMode, Registration, UpgradeOrchestrator, UpgradeOutcome,
};

/// Everything a deploy run did.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub network: NetworkIdentity,
    pub roles: AccountRoles,
    pub deployment: ProxyDeployment,
    pub registration: Option<Registration>,
}

impl DeployReport {
    /// Address users interact with.
    pub fn contract_address(&self) -> Address {
        self.deployment.record.proxy_address
    }
}

/// Main deployer that runs the deploy and upgrade entry points against one network.
///
/// All configuration is passed in at construction; nothing is read from the environment.
pub struct Deployer<C> {
    config: DeployConfig,
    network_name: String,
    chain: C,
}

impl Deployer<JsonRpcChain> {
    /// Connect to the network named `network_name` in `config` over JSON-RPC.
    ///
    /// Networks with an `hd_wallet` sign locally with accounts derived from `mnemonic`,
    /// which is then required. Other networks use the node's own signers and ignore it.
    pub fn connect(
        config: DeployConfig,
        network_name: &str,
        mnemonic: Option<&str>,
    ) -> DeployResult<Self> {
        let network = config.network(network_name)?;
        let mut chain = JsonRpcChain::new(network.url.clone())?;

        if let Some(hd_wallet) = network.hd_wallet {
            let phrase = mnemonic.ok_or_else(|| {
                DeployError::config(format!(
                    "network '{network_name}' signs with an HD wallet but no mnemonic was \
                     provided (set HDWALLET_MNEMONIC)"
                ))
            })?;
            chain = chain.with_wallet(HdWallet::from_mnemonic(phrase, hd_wallet.count)?);
        }

        tracing::info!(
            network = network_name,
            url = %chain.url(),
            local_signer = chain.is_local_signer(),
            "Connecting to network"
        );
        Ok(Self::new(config, network_name, chain))
    }
}

impl<C: ChainClient> Deployer<C> {
    pub fn new(config: DeployConfig, network_name: impl Into<String>, chain: C) -> Self {
        Self {
            config,
            network_name: network_name.into(),
            chain,
        }
    }

    pub fn store(&self) -> DeploymentStore {
        DeploymentStore::new(&self.config.deployments_dir)
    }

    /// Identify the target network, checking the node's chain id against the configured one.
    pub async fn network_identity(&self) -> DeployResult<NetworkIdentity> {
        let chain_id = self.chain.chain_id().await?;

        let expected = self
            .config
            .networks
            .get(&self.network_name)
            .and_then(|network| network.chain_id);
        if let Some(expected) = expected.filter(|expected| *expected != chain_id) {
            return Err(DeployError::config(format!(
                "network '{}' is configured for chain id {expected} but the node reports \
                 {chain_id}",
                self.network_name
            )));
        }

        Ok(NetworkIdentity {
            name: self.network_name.clone(),
            chain_id,
        })
    }

    /// Run the deploy entry point: resolve accounts, deploy or reuse the proxy and, on a
    /// fresh deploy to a chain with a configured pool, register it.
    pub async fn deploy(&self) -> DeployResult<DeployReport> {
        tracing::info!("Starting deployment process...");

        let network = self.network_identity().await?;
        let roles = AccountResolver::new(&self.config.named_accounts)
            .resolve_from(&self.chain)
            .await?;

        let contract = ContractArtifact::load(&self.config.artifacts_dir, &self.config.contract)?;
        let proxy =
            ContractArtifact::load(&self.config.artifacts_dir, &self.config.proxy_contract)?;

        let store = self.store();
        let mode = ProxyMode::Initialize {
            method: self.config.initializer.clone(),
        };
        let deployment = ProxyDeployer::new(&self.chain, &store, &network)
            .deploy(&contract, &proxy, &roles, &mode)
            .await?;

        let pool = self.config.stake_pools.lookup(network.chain_id);
        let registration = PostDeployInitializer::new(&self.chain)
            .run(
                deployment.record.proxy_address,
                roles.admin,
                pool,
                deployment.is_fresh(),
            )
            .await?;

        let report = DeployReport {
            network,
            roles,
            deployment,
            registration,
        };
        log_report(&report);

        Ok(report)
    }

    /// Run the upgrade entry point for the configured contract.
    ///
    /// The upgrade is sent by the resolved deployer, which owns the proxy.
    pub async fn upgrade(&self) -> DeployResult<UpgradeOutcome> {
        tracing::info!("Starting upgrade process...");

        let network = self.network_identity().await?;
        let deployer = AccountResolver::new(&self.config.named_accounts)
            .resolve_deployer_from(&self.chain)
            .await?;
        let contract = ContractArtifact::load(&self.config.artifacts_dir, &self.config.contract)?;

        let store = self.store();
        let outcome = UpgradeOrchestrator::new(&self.chain, &store, &network)
            .upgrade(&contract, deployer, &ProxyMode::Upgrade)
            .await?;

        tracing::info!("✓ Upgrade complete!");
        tracing::info!("Contract:               {}", outcome.record.proxy_address);
        tracing::info!("Previous implementation: {}", outcome.previous_implementation);
        tracing::info!("Current implementation:  {}", outcome.record.implementation_address);

        Ok(outcome)
    }
}

fn log_report(report: &DeployReport) {
    let record = &report.deployment.record;

    tracing::info!("✓ Deployment complete!");
    tracing::info!("");
    tracing::info!("Network:        {}", report.network);
    tracing::info!("Deployer:       {}", report.roles.deployer);
    if report.roles.admin_defaulted {
        tracing::info!("Admin account:  {} (defaulted to first signer)", report.roles.admin);
    } else {
        tracing::info!("Admin account:  {}", report.roles.admin);
    }
    tracing::info!(
        "{} ({}): {}",
        record.contract_name,
        report.deployment.status,
        report.contract_address()
    );
    tracing::info!("Implementation: {}", record.implementation_address);
    match &report.registration {
        Some(registration) => tracing::info!("{registration}"),
        None => tracing::info!("Stake pool:     not registered in this run"),
    }
}
