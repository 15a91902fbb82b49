//! svlx-deploy - Deployment library for the upgradeable SVLX contract.
//!
//! This crate deploys the contract behind a proxy, reuses the deployment on later
//! runs, registers the chain's stake pool once after a fresh deploy and upgrades the
//! proxy to new logic.

mod accounts;
pub use accounts::{AccountResolver, AccountRoles};

mod artifact;
pub use artifact::ContractArtifact;

pub mod calldata;

mod chain;
pub use chain::{ChainClient, TxReceipt};

mod config;
pub use config::{
    AccountRef, CONFIG_FILENAME, DeployConfig, ENV_PREFIX, HdWalletConfig, NamedAccounts,
    NetworkConfig,
};

mod deployer;
pub use deployer::{DeployReport, Deployer};

mod deployment_hash;
pub use deployment_hash::DeploymentHash;

mod error;
pub use error::{DeployError, DeployResult};

mod initializer;
pub use initializer::{PostDeployInitializer, Registration};

mod network_table;
pub use network_table::{NetworkConfigTable, StakePoolConfig};

mod proxy;
pub use proxy::{DeployStatus, ProxyDeployer, ProxyDeployment, ProxyMode};

pub mod rpc;
pub use rpc::JsonRpcChain;

mod store;
pub use store::{DeploymentRecord, DeploymentStore, NetworkIdentity};

mod upgrade;
pub use upgrade::{UpgradeOrchestrator, UpgradeOutcome};

mod wallet;
pub use wallet::{HdWallet, LegacyTransaction};
