//! Compiler artifacts as written by the zksolc Hardhat plugin.

use std::{
    collections::BTreeMap,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};

use alloy_primitives::{
    B256,
    Bytes,
};
use serde::Deserialize;
use thiserror::Error;
use zk_aa_core::{
    BytecodeError,
    hash_bytecode,
    primitives::CodeHash,
};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Artifact bytecode is not deployable: {0}")]
    Bytecode(#[from] BytecodeError),
    #[error("Invalid factory dependency hash `{0}`")]
    InvalidFactoryDepHash(String),
}

/// A compiled contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub source_name: String,
    pub bytecode: Bytes,
    /// Code the contract may deploy, as bytecode hash to contract name.
    #[serde(default)]
    pub factory_deps: BTreeMap<String, String>,
}

impl Artifact {
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_json(&json)?;
        tracing::debug!(
            contract = %artifact.fully_qualified_name(),
            path = %path.display(),
            "Loaded artifact"
        );
        Ok(artifact)
    }

    pub fn code_hash(&self) -> Result<CodeHash, ArtifactError> {
        Ok(hash_bytecode(&self.bytecode)?)
    }

    /// `source:Contract`, the identifier used by block explorers.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Hashes of the code this contract references.
    pub fn factory_dep_hashes(&self) -> Result<Vec<CodeHash>, ArtifactError> {
        self.factory_deps
            .keys()
            .map(|key| {
                B256::from_str(key)
                    .ok()
                    .and_then(|packed| CodeHash::from_packed(packed).ok())
                    .ok_or_else(|| ArtifactError::InvalidFactoryDepHash(key.clone()))
            })
            .collect()
    }
}
