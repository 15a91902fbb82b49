//! One-time stake pool registration after a fresh deploy.

use alloy_core::primitives::Address;
use derive_more::Display;

use crate::{ChainClient, DeployResult, StakePoolConfig, TxReceipt, calldata};

/// A successful `addPool` call.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("Registered stake pool {pool} on {contract}")]
pub struct Registration {
    pub receipt: TxReceipt,
    pub contract: Address,
    pub pool: Address,
}

/// Registers the stake pool on a freshly deployed contract.
pub struct PostDeployInitializer<'a, C> {
    chain: &'a C,
}

impl<'a, C: ChainClient> PostDeployInitializer<'a, C> {
    pub fn new(chain: &'a C) -> Self {
        Self { chain }
    }

    /// Call `addPool(pool)` on `contract` from `admin`.
    ///
    /// Sent only when a pool is configured for the chain and the deploy was fresh.
    /// A reused deploy was registered by the run that created it, and the contract
    /// rejects a second registration. Reverts are returned as is.
    pub async fn run(
        &self,
        contract: Address,
        admin: Address,
        pool: Option<StakePoolConfig>,
        fresh: bool,
    ) -> DeployResult<Option<Registration>> {
        let Some(StakePoolConfig { pool }) = pool else {
            tracing::info!(
                contract = %contract,
                "No stake pool configured for this chain, skipping registration"
            );
            return Ok(None);
        };

        if !fresh {
            tracing::info!(
                contract = %contract,
                pool = %pool,
                "Contract was not freshly deployed, skipping stake pool registration"
            );
            return Ok(None);
        }

        tracing::info!(
            contract = %contract,
            pool = %pool,
            admin = %admin,
            "Registering stake pool..."
        );

        let receipt = self
            .chain
            .send_transaction(admin, contract, calldata::encode_add_pool(pool))
            .await?;

        let registration = Registration {
            receipt,
            contract,
            pool,
        };
        tracing::info!(tx_hash = %registration.receipt.transaction_hash, "{registration}");

        Ok(Some(registration))
    }
}
