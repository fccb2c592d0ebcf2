//! The network collaborator the orchestrator drives.
//!
//! Transport, RPC and retry policy live behind [`ChainClient`]; the
//! orchestrator only sees the answers and the failure causes reported here.

use alloy_primitives::{
    Address,
    B256,
    Bytes,
    U256,
};
use async_trait::async_trait;
use thiserror::Error;

/// Call used for gas estimation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub factory_deps: Vec<Bytes>,
}

/// Identifies a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHandle(pub B256);

impl std::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Why the network refused or failed a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionCause {
    #[error("Nonce conflict: expected {expected}, got {got}")]
    NonceConflict { expected: u64, got: u64 },
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Execution reverted: {0}")]
    ExecutionReverted(Bytes),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InclusionStatus {
    Included,
    Failed(RejectionCause),
}

/// Outcome of a transaction once it left the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionReport {
    pub status: InclusionStatus,
    /// Address of the contract created by the transaction, if any.
    pub included_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainClientError {
    #[error("Transaction rejected: {0}")]
    Rejected(RejectionCause),
    #[error("Transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn balance(&self, address: Address) -> Result<U256, ChainClientError>;

    /// Nonce the next transaction of `address` must carry.
    async fn transaction_count(&self, address: Address) -> Result<u64, ChainClientError>;

    async fn gas_price(&self) -> Result<u128, ChainClientError>;

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ChainClientError>;

    /// Hands a serialized envelope to the network without waiting for it.
    async fn broadcast(&self, raw: Bytes) -> Result<TxHandle, ChainClientError>;

    async fn await_inclusion(&self, handle: &TxHandle) -> Result<InclusionReport, ChainClientError>;
}
