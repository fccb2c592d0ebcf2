use alloy_primitives::Address;
use thiserror::Error;
use zk_aa_core::{
    BytecodeError,
    EnvelopeBuildError,
};

use crate::{
    artifact::ArtifactError,
    chain::{
        ChainClientError,
        RejectionCause,
    },
};

#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("Failed to build envelope: {0}")]
    Build(#[from] EnvelopeBuildError),
    #[error("Invalid deployable code: {0}")]
    Bytecode(#[from] BytecodeError),
    #[error("Chain client transport error: {0}")]
    Client(String),
    #[error("Transaction rejected: {0}")]
    Rejected(RejectionCause),
    #[error("Deployment is inconsistent: predicted {predicted}, observed {observed:?}")]
    Inconsistent {
        predicted: Address,
        observed: Option<Address>,
    },
    #[error("Cannot {operation} a deployment in state {state}")]
    InvalidTransition {
        state: &'static str,
        operation: &'static str,
    },
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

impl From<ChainClientError> for DeployerError {
    fn from(error: ChainClientError) -> Self {
        match error {
            ChainClientError::Rejected(cause) => Self::Rejected(cause),
            ChainClientError::Transport(message) => Self::Client(message),
        }
    }
}
