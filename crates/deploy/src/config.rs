//! Run configuration, loaded once at startup and passed explicitly to the orchestrators.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{DeployError, DeployResult, NetworkConfigTable};

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Svlx.toml";

/// Prefix of environment variables overriding the configuration file.
pub const ENV_PREFIX: &str = "SVLX_";

/// Reference to an account: an index into the connected signer list, or a literal address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountRef {
    Index(usize),
    Address(Address),
}

/// Role to account mapping resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAccounts {
    /// Account sending the deploy transactions. Defaults to the first signer.
    pub deployer: AccountRef,
    /// Account authorized to register the stake pool. Defaults to the first signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_account: Option<AccountRef>,
}

impl Default for NamedAccounts {
    fn default() -> Self {
        Self {
            deployer: AccountRef::Index(0),
            admin_account: None,
        }
    }
}

/// Default number of accounts derived from an HD wallet mnemonic.
pub const DEFAULT_HD_WALLET_COUNT: u32 = 20;

fn default_hd_wallet_count() -> u32 {
    DEFAULT_HD_WALLET_COUNT
}

/// Signers derived locally from the HD wallet mnemonic instead of held by the node.
///
/// The mnemonic itself is never part of the configuration file; it is supplied at run
/// time (`HDWALLET_MNEMONIC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdWalletConfig {
    /// Number of accounts derived, in derivation order.
    #[serde(default = "default_hd_wallet_count")]
    pub count: u32,
}

impl Default for HdWalletConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_HD_WALLET_COUNT,
        }
    }
}

/// A target network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    pub url: Url,
    /// Expected chain id. When set, it must match what the endpoint reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Sign locally with accounts derived from a mnemonic. Unset means the node holds
    /// the keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hd_wallet: Option<HdWalletConfig>,
}

/// Complete configuration of a deploy or upgrade run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Name of the logic contract artifact.
    pub contract: String,
    /// Name of the proxy contract artifact.
    pub proxy_contract: String,
    /// One-time initializer invoked through the proxy constructor.
    pub initializer: String,
    /// Directory holding compiled `<Name>.json` artifacts.
    pub artifacts_dir: PathBuf,
    /// Directory holding persisted deployment records.
    pub deployments_dir: PathBuf,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    #[serde(default)]
    pub named_accounts: NamedAccounts,
    #[serde(default)]
    pub stake_pools: NetworkConfigTable,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            contract: "SVLX".to_string(),
            proxy_contract: "EIP173Proxy".to_string(),
            initializer: "initialize".to_string(),
            artifacts_dir: PathBuf::from("artifacts"),
            deployments_dir: PathBuf::from("deployments"),
            networks: BTreeMap::new(),
            named_accounts: NamedAccounts::default(),
            stake_pools: NetworkConfigTable::default(),
        }
    }
}

impl DeployConfig {
    /// Load the configuration from defaults, a TOML file and `SVLX_` environment variables,
    /// in increasing order of precedence.
    ///
    /// When `path` is `None`, `Svlx.toml` in the working directory is used if present.
    /// An explicit path that does not exist is an error. A directory resolves to the
    /// `Svlx.toml` inside it.
    pub fn load(path: Option<&Path>) -> DeployResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(DeployError::config(format!(
                        "configuration file or directory not found: {}",
                        path.display()
                    )));
                }
                let file = if path.is_dir() {
                    path.join(CONFIG_FILENAME)
                } else {
                    path.to_path_buf()
                };
                figment = figment.merge(Toml::file(file));
            }
            None => figment = figment.merge(Toml::file(CONFIG_FILENAME)),
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| DeployError::config(e.to_string()))?;

        tracing::debug!(
            contract = %config.contract,
            networks = config.networks.len(),
            stake_pools = config.stake_pools.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Parse a configuration from a TOML string layered over the defaults.
    pub fn from_toml_str(content: &str) -> DeployResult<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(content))
            .extract()
            .map_err(|e| DeployError::config(e.to_string()))
    }

    /// Look up a target network by name.
    pub fn network(&self, name: &str) -> DeployResult<&NetworkConfig> {
        self.networks.get(name).ok_or_else(|| {
            let known = self.networks.keys().cloned().collect::<Vec<_>>().join(", ");
            DeployError::config(format!("unknown network '{name}' (configured: {known})"))
        })
    }
}
