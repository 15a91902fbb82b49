//! Chain id to stake pool lookup table.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;
use derive_more::Deref;
use serde::{Deserialize, Serialize};

/// Address of an external staking pool contract to register after a fresh deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StakePoolConfig {
    pub pool: Address,
}

/// Stake pool table keyed by chain id.
///
/// Loaded from the `[stake_pools]` section of the configuration, where keys are
/// chain ids written as strings (TOML table keys are always strings):
///
/// ```toml
/// [stake_pools]
/// 106 = "0x7f7697E82be5d7F41De6b283Ca562e4D79a4F74a"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, StakePoolConfig>", into = "BTreeMap<String, StakePoolConfig>")]
pub struct NetworkConfigTable(BTreeMap<u64, StakePoolConfig>);

impl NetworkConfigTable {
    pub fn new(pools: impl IntoIterator<Item = (u64, StakePoolConfig)>) -> Self {
        Self(pools.into_iter().collect())
    }

    /// Look up the stake pool for `chain_id`.
    ///
    /// Total: an unknown chain id yields `None` so deployments to networks without a
    /// pool can proceed and skip registration.
    pub fn lookup(&self, chain_id: u64) -> Option<StakePoolConfig> {
        let pool = self.0.get(&chain_id).copied();
        if pool.is_none() {
            tracing::debug!(chain_id, "No stake pool configured for chain");
        }
        pool
    }
}

impl TryFrom<BTreeMap<String, StakePoolConfig>> for NetworkConfigTable {
    type Error = String;

    fn try_from(raw: BTreeMap<String, StakePoolConfig>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(key, pool)| {
                key.trim()
                    .parse::<u64>()
                    .map(|chain_id| (chain_id, pool))
                    .map_err(|e| format!("invalid chain id '{key}' in stake pool table: {e}"))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}

impl From<NetworkConfigTable> for BTreeMap<String, StakePoolConfig> {
    fn from(table: NetworkConfigTable) -> Self {
        table
            .0
            .into_iter()
            .map(|(chain_id, pool)| (chain_id.to_string(), pool))
            .collect()
    }
}
