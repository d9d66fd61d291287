//! Deployed NFT contract constants: address and ABI.

use crate::wallet::{Address, ContractCall, WalletError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the mint entry point.
pub const MINT_FUNCTION: &str = "safeMint";

/// Contract constants errors.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Artifact has no ABI")]
    MissingAbi,
    #[error("Artifact has no bytecode")]
    EmptyBytecode,
    #[error(transparent)]
    Address(#[from] WalletError),
    #[error("Contract ABI has no function {0}")]
    MissingFunction(String),
}

/// Result type for contract constants.
pub type ContractResult<T> = Result<T, ContractError>;

/// Address + ABI of the deployed contract, as written after deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConstants {
    pub address: Address,
    pub abi: serde_json::Value,
}

impl ContractConstants {
    pub fn load(path: &Path) -> ContractResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| ContractError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&source).map_err(|source| ContractError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> ContractResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ContractError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ContractError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| ContractError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build constants from a compiled artifact and the deployed address.
    ///
    /// Accepts hardhat artifacts (`bytecode` string) and solc contract
    /// output (`evm.bytecode.object`).
    pub fn from_artifact(artifact: &serde_json::Value, address: &str) -> ContractResult<Self> {
        let abi = artifact
            .get("abi")
            .filter(|abi| abi.is_array())
            .cloned()
            .ok_or(ContractError::MissingAbi)?;

        let bytecode = artifact
            .get("bytecode")
            .and_then(|b| b.as_str())
            .or_else(|| artifact.pointer("/evm/bytecode/object").and_then(|b| b.as_str()))
            .unwrap_or_default();
        if bytecode.trim_start_matches("0x").is_empty() {
            return Err(ContractError::EmptyBytecode);
        }

        Ok(Self {
            address: Address::parse(address)?,
            abi,
        })
    }

    /// Read an artifact file, then [`from_artifact`](Self::from_artifact).
    pub fn from_artifact_file(path: &Path, address: &str) -> ContractResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| ContractError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: serde_json::Value =
            serde_json::from_str(&source).map_err(|source| ContractError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_artifact(&artifact, address)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.abi.as_array().is_some_and(|entries| {
            entries.iter().any(|entry| {
                entry.get("type").and_then(|t| t.as_str()) == Some("function")
                    && entry.get("name").and_then(|n| n.as_str()) == Some(name)
            })
        })
    }

    /// `safeMint(recipient, token_uri)`.
    pub fn mint_call(&self, recipient: &Address, token_uri: &str) -> ContractResult<ContractCall> {
        if !self.has_function(MINT_FUNCTION) {
            return Err(ContractError::MissingFunction(MINT_FUNCTION.to_string()));
        }
        Ok(ContractCall {
            contract: self.address.clone(),
            abi: self.abi.clone(),
            function: MINT_FUNCTION.to_string(),
            args: vec![
                serde_json::Value::String(recipient.to_string()),
                serde_json::Value::String(token_uri.to_string()),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn mint_abi() -> serde_json::Value {
        json!([
            { "type": "constructor", "inputs": [] },
            {
                "type": "function",
                "name": "safeMint",
                "inputs": [
                    { "name": "to", "type": "address" },
                    { "name": "uri", "type": "string" }
                ],
                "outputs": []
            }
        ])
    }

    #[test]
    fn test_from_hardhat_artifact() {
        let artifact = json!({ "abi": mint_abi(), "bytecode": "0x6080" });
        let constants = ContractConstants::from_artifact(&artifact, ADDRESS).unwrap();
        assert_eq!(constants.address.as_str(), ADDRESS);
        assert!(constants.has_function("safeMint"));
        assert!(!constants.has_function("burn"));
    }

    #[test]
    fn test_from_solc_output() {
        let artifact = json!({ "abi": mint_abi(), "evm": { "bytecode": { "object": "6080" } } });
        assert!(ContractConstants::from_artifact(&artifact, ADDRESS).is_ok());
    }

    #[test]
    fn test_artifact_failures() {
        let no_abi = json!({ "bytecode": "0x6080" });
        assert!(matches!(
            ContractConstants::from_artifact(&no_abi, ADDRESS),
            Err(ContractError::MissingAbi)
        ));

        let empty = json!({ "abi": [], "bytecode": "0x" });
        assert!(matches!(
            ContractConstants::from_artifact(&empty, ADDRESS),
            Err(ContractError::EmptyBytecode)
        ));

        let artifact = json!({ "abi": [], "bytecode": "0x6080" });
        assert!(matches!(
            ContractConstants::from_artifact(&artifact, "0xnope"),
            Err(ContractError::Address(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("constants").join("contract.json");
        let constants = ContractConstants {
            address: Address::parse(ADDRESS).unwrap(),
            abi: mint_abi(),
        };
        constants.save(&path).unwrap();
        assert_eq!(ContractConstants::load(&path).unwrap(), constants);
    }

    #[test]
    fn test_mint_call() {
        let constants = ContractConstants {
            address: Address::parse(ADDRESS).unwrap(),
            abi: mint_abi(),
        };
        let recipient = Address::parse("0x1111111111111111111111111111111111111111").unwrap();
        let call = constants.mint_call(&recipient, "ipfs://QmMeta").unwrap();
        assert_eq!(call.function, "safeMint");
        assert_eq!(call.args[0], json!(recipient.as_str()));
        assert_eq!(call.args[1], json!("ipfs://QmMeta"));

        let bare = ContractConstants {
            address: Address::parse(ADDRESS).unwrap(),
            abi: json!([]),
        };
        assert!(matches!(
            bare.mint_call(&recipient, "ipfs://x"),
            Err(ContractError::MissingFunction(_))
        ));
    }
}
