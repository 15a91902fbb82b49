//! Compiled contract artifacts.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DeployError, DeployResult};

/// Bytecode as emitted by hardhat (`"0x..."`) or foundry (`{ "object": "0x..." }`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hardhat(Bytes),
    Foundry { object: Bytes },
}

#[derive(Debug, Deserialize)]
struct RawArtifact {
    abi: Value,
    bytecode: RawBytecode,
}

/// A compiled contract: creation bytecode plus its ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractArtifact {
    pub name: String,
    pub abi: Value,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Load `<name>.json` from `artifacts_dir`.
    ///
    /// The file is looked up directly in `artifacts_dir` first, then anywhere below it,
    /// which covers hardhat's `contracts/<File>.sol/<Name>.json` and foundry's
    /// `out/<File>.sol/<Name>.json` layouts.
    pub fn load(artifacts_dir: &Path, name: &str) -> DeployResult<Self> {
        let file_name = format!("{name}.json");
        let path = find_file(artifacts_dir, &file_name)?.ok_or_else(|| {
            DeployError::artifact(artifacts_dir, format!("no artifact named {file_name}"))
        })?;

        let content =
            std::fs::read_to_string(&path).map_err(|e| DeployError::artifact(&path, e))?;
        let raw: RawArtifact =
            serde_json::from_str(&content).map_err(|e| DeployError::artifact(&path, e))?;

        let bytecode = match raw.bytecode {
            RawBytecode::Hardhat(code) | RawBytecode::Foundry { object: code } => code,
        };
        if bytecode.is_empty() {
            return Err(DeployError::artifact(
                &path,
                "empty bytecode (abstract contract or interface?)",
            ));
        }

        tracing::debug!(
            contract = name,
            path = %path.display(),
            bytecode_len = bytecode.len(),
            "Artifact loaded"
        );

        Ok(Self {
            name: name.to_string(),
            abi: raw.abi,
            bytecode,
        })
    }
}

/// Find `file_name` directly in `dir`, or as the single match anywhere below it.
///
/// Several matches below `dir` are ambiguous and rejected. Symlinks are not followed.
fn find_file(dir: &Path, file_name: &str) -> DeployResult<Option<PathBuf>> {
    let direct = dir.join(file_name);
    if direct.is_file() {
        return Ok(Some(direct));
    }

    let mut matches = Vec::new();
    collect_matches(dir, file_name, &mut matches)?;
    matches.sort();

    match matches.len() {
        0 | 1 => Ok(matches.pop()),
        _ => {
            let paths = matches
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(DeployError::artifact(
                dir,
                format!("multiple artifacts named {file_name}: {paths}"),
            ))
        }
    }
}

fn collect_matches(dir: &Path, file_name: &str, matches: &mut Vec<PathBuf>) -> DeployResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| DeployError::artifact(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| DeployError::artifact(dir, e))?;
        let file_type = entry.file_type().map_err(|e| DeployError::artifact(dir, e))?;
        let path = entry.path();

        if file_type.is_dir() {
            collect_matches(&path, file_name, matches)?;
        } else if file_type.is_file() && entry.file_name() == file_name {
            matches.push(path);
        }
    }
    Ok(())
}
