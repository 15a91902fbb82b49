//! The network seam consumed by the orchestrators.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};

use crate::DeployResult;

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Set when the transaction created a contract.
    pub contract_address: Option<Address>,
}

/// Connection to a target chain.
///
/// Every call blocks the run until the node accepts or rejects it. Transaction
/// methods resolve only once the transaction is mined, so at most one transaction is
/// ever outstanding. Implementations map RPC failures to
/// [`DeployError::Network`](crate::DeployError::Network) and rejected or failed
/// transactions to [`DeployError::TransactionRevert`](crate::DeployError::TransactionRevert).
pub trait ChainClient: Send + Sync {
    /// The chain id reported by the node.
    fn chain_id(&self) -> impl Future<Output = DeployResult<u64>> + Send;

    /// Addresses of the available signers, in order: node-held keys or a local wallet.
    fn accounts(&self) -> impl Future<Output = DeployResult<Vec<Address>>> + Send;

    /// Send a contract creation transaction and wait for it to be mined.
    fn deploy_contract(
        &self,
        from: Address,
        init_code: Bytes,
    ) -> impl Future<Output = DeployResult<TxReceipt>> + Send;

    /// Send a call transaction and wait for it to be mined.
    fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> impl Future<Output = DeployResult<TxReceipt>> + Send;
}
