//! Local signing with accounts derived from an HD wallet mnemonic.
//!
//! Public nodes hold no keys, so transactions to them are signed here as EIP-155
//! legacy transactions and submitted with `eth_sendRawTransaction`.

use std::fmt;

use alloy_core::{
    primitives::{Address, B256, Bytes, U256, keccak256},
    rlp::{Encodable, Header},
};
use alloy_signer_local::{MnemonicBuilder, coins_bip39::English};
use k256::ecdsa::{RecoveryId, Signature, SigningKey};

use crate::{DeployError, DeployResult};

/// An unsigned EIP-155 legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn encode_fields(&self, out: &mut Vec<u8>) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        match self.to {
            Some(to) => to.encode(out),
            None => Bytes::new().encode(out),
        }
        self.value.encode(out);
        self.input.encode(out);
    }

    /// Hash the sender signs. It commits to the chain id, so the signed transaction
    /// cannot be replayed on another chain.
    pub fn signing_hash(&self) -> B256 {
        let mut payload = Vec::new();
        self.encode_fields(&mut payload);
        self.chain_id.encode(&mut payload);
        0u8.encode(&mut payload);
        0u8.encode(&mut payload);
        keccak256(rlp_list(&payload))
    }

    fn encode_signed(&self, signature: &Signature, recovery_id: RecoveryId) -> Bytes {
        let (r, s) = signature.split_bytes();
        let v = self.chain_id * 2 + 35 + u64::from(recovery_id.to_byte());

        let mut payload = Vec::new();
        self.encode_fields(&mut payload);
        v.encode(&mut payload);
        U256::from_be_slice(&r).encode(&mut payload);
        U256::from_be_slice(&s).encode(&mut payload);
        rlp_list(&payload).into()
    }
}

fn rlp_list(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut out);
    out.extend_from_slice(payload);
    out
}

/// Ethereum address of a secp256k1 key.
fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..])
}

/// Signer keys in derivation order.
#[derive(Clone)]
pub struct HdWallet {
    accounts: Vec<(Address, SigningKey)>,
}

impl HdWallet {
    /// Derive the first `count` accounts of `phrase` on the default Ethereum path
    /// (`m/44'/60'/0'/0/{index}`).
    pub fn from_mnemonic(phrase: &str, count: u32) -> DeployResult<Self> {
        if count == 0 {
            return Err(DeployError::config("an HD wallet must derive at least one account"));
        }

        let keys = (0..count)
            .map(|index| {
                MnemonicBuilder::<English>::default()
                    .phrase(phrase)
                    .index(index)
                    .and_then(|builder| builder.build())
                    .map(|signer| signer.credential().clone())
                    .map_err(|e| {
                        DeployError::config(format!("cannot derive HD wallet account {index}: {e}"))
                    })
            })
            .collect::<DeployResult<Vec<_>>>()?;

        let wallet = Self::from_keys(keys);
        tracing::debug!(accounts = wallet.accounts.len(), "HD wallet derived");
        Ok(wallet)
    }

    pub fn from_keys(keys: impl IntoIterator<Item = SigningKey>) -> Self {
        Self {
            accounts: keys.into_iter().map(|key| (address_of(&key), key)).collect(),
        }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.accounts.iter().map(|(address, _)| *address).collect()
    }

    /// Sign `tx` with the key of `from`, returning the raw transaction.
    pub fn sign_transaction(&self, from: Address, tx: &LegacyTransaction) -> DeployResult<Bytes> {
        let key = self
            .accounts
            .iter()
            .find_map(|(address, key)| (*address == from).then_some(key))
            .ok_or_else(|| DeployError::config(format!("no HD wallet key for sender {from}")))?;

        let (signature, recovery_id) = key
            .sign_prehash_recoverable(tx.signing_hash().as_slice())
            .map_err(|e| {
                DeployError::config(format!("failed to sign transaction from {from}: {e}"))
            })?;

        Ok(tx.encode_signed(&signature, recovery_id))
    }
}

impl fmt::Debug for HdWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdWallet")
            .field("addresses", &self.addresses())
            .finish_non_exhaustive()
    }
}
