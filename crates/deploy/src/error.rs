//! Error taxonomy for deploy and upgrade runs.
//!
//! Every variant is fatal to the run. A chain id missing from the stake pool
//! table is not an error: [`crate::NetworkConfigTable::lookup`] returns `None`.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the library operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors surfaced by a deploy or upgrade run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// No deployer or admin could be resolved, or the configuration is inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// RPC transport or provider failure.
    #[error("network error: {0}")]
    Network(String),

    /// An on-chain call was rejected. The message is the node's, verbatim.
    #[error("transaction reverted: {0}")]
    TransactionRevert(String),

    /// Upgrade was requested but no proxy was ever deployed for this contract here.
    #[error("no existing proxy for {contract} on network {network}, nothing to upgrade")]
    NoExistingProxy { contract: String, network: String },

    /// A compiled artifact could not be read or is malformed.
    #[error("artifact error in {path}: {message}")]
    Artifact { path: PathBuf, message: String },

    /// A deployment record could not be read or written.
    #[error("deployment store error in {path}: {message}")]
    Store { path: PathBuf, message: String },
}

impl DeployError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Artifact {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn store(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Store {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
