//! ABI encoding of the calls the orchestrators send.

use alloy_core::{
    primitives::{Address, Bytes, keccak256},
    sol_types::SolValue,
};

/// Signature of the stake pool registration entry point.
pub const ADD_POOL_SIGNATURE: &str = "addPool(address)";

/// Signature of the proxy repoint entry point (EIP-173 proxy, owner only).
pub const UPGRADE_TO_SIGNATURE: &str = "upgradeTo(address)";

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for an initializer taking no arguments, e.g. `initialize()`.
pub fn encode_initializer(method: &str) -> Bytes {
    Bytes::copy_from_slice(&selector(&format!("{method}()")))
}

/// Calldata for `addPool(address)`.
pub fn encode_add_pool(pool: Address) -> Bytes {
    encode_call(ADD_POOL_SIGNATURE, pool.abi_encode())
}

/// Calldata for `upgradeTo(address)`.
pub fn encode_upgrade_to(implementation: Address) -> Bytes {
    encode_call(UPGRADE_TO_SIGNATURE, implementation.abi_encode())
}

/// Creation code of the proxy:
/// `constructor(address implementation, address owner, bytes data)`.
///
/// The constructor delegates `data` to the implementation, so the proxy is created
/// and initialized in the same transaction.
pub fn encode_proxy_creation(
    proxy_bytecode: &Bytes,
    implementation: Address,
    owner: Address,
    init_data: Bytes,
) -> Bytes {
    let args = (implementation, owner, init_data).abi_encode_params();
    let mut code = Vec::with_capacity(proxy_bytecode.len() + args.len());
    code.extend_from_slice(proxy_bytecode);
    code.extend_from_slice(&args);
    code.into()
}

fn encode_call(signature: &str, args: Vec<u8>) -> Bytes {
    let mut data = Vec::with_capacity(4 + args.len());
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(&args);
    data.into()
}

/// Decode the address argument of a single-address call to `signature`.
pub fn decode_address_arg(data: &[u8], signature: &str) -> Option<Address> {
    if data.len() != 36 || data[..4] != selector(signature) {
        return None;
    }
    Some(Address::from_slice(&data[16..36]))
}
