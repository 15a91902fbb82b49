use alloy_core::primitives::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ContractArtifact;

/// Inputs that determine the deployed implementation.
///
/// When any of these change, the existing implementation is stale and only an
/// upgrade can replace it. The proxy initializer calldata is deliberately not part
/// of it: it runs once at proxy creation and never again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentHash {
    /// Creation bytecode of the implementation contract.
    pub bytecode: Bytes,
    /// ABI-encoded constructor arguments of the implementation contract.
    pub constructor_args: Bytes,
}

impl DeploymentHash {
    /// Hash inputs for an implementation deployed without constructor arguments.
    pub fn from_artifact(artifact: &ContractArtifact) -> Self {
        Self {
            bytecode: artifact.bytecode.clone(),
            constructor_args: Bytes::new(),
        }
    }

    /// Compute a SHA-256 hash of the bytecode and constructor arguments.
    ///
    /// Each part is length-prefixed so that moving bytes between the bytecode and the
    /// arguments changes the hash.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [&self.bytecode, &self.constructor_args] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeploymentHash {
        DeploymentHash {
            bytecode: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52, 0x34, 0x80, 0x15]),
            constructor_args: Bytes::new(),
        }
    }

    #[test]
    fn test_hash_determinism() {
        let hash1 = sample().compute_hash();
        let hash2 = sample().compute_hash();

        assert_eq!(hash1, hash2, "Hash should be deterministic");
        assert_eq!(hash1.len(), 64, "SHA-256 hash should be 64 hex characters");
    }

    #[test]
    fn test_hash_changes_with_bytecode() {
        let mut changed = sample();
        changed.bytecode = Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52, 0x34, 0x80, 0x16]);

        assert_ne!(
            sample().compute_hash(),
            changed.compute_hash(),
            "Hash should change when bytecode changes"
        );
    }

    #[test]
    fn test_hash_changes_with_constructor_args() {
        let mut changed = sample();
        changed.constructor_args = Bytes::from_static(&[0x01]);

        assert_ne!(
            sample().compute_hash(),
            changed.compute_hash(),
            "Hash should change when constructor arguments change"
        );
    }

    #[test]
    fn test_hash_separates_bytecode_from_args() {
        let joined = DeploymentHash {
            bytecode: Bytes::from_static(&[0x60, 0x80]),
            constructor_args: Bytes::new(),
        };
        let split = DeploymentHash {
            bytecode: Bytes::from_static(&[0x60]),
            constructor_args: Bytes::from_static(&[0x80]),
        };

        assert_ne!(joined.compute_hash(), split.compute_hash());
    }
}
