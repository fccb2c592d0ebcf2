//! Deterministic deployment of contracts and smart accounts.
//!
//! The orchestrator derives the address of a deployment before broadcasting it,
//! submits the account-abstraction envelope through a [`ChainClient`] and
//! refuses to call a deployment confirmed unless the chain reports exactly the
//! predicted address.

pub mod artifact;
pub use artifact::{
    Artifact,
    ArtifactError,
};

pub mod chain;
pub use chain::{
    CallRequest,
    ChainClient,
    ChainClientError,
    InclusionReport,
    InclusionStatus,
    RejectionCause,
    TxHandle,
};

pub mod config;
pub use config::{
    NetworkConfig,
    NetworkKind,
    OrchestratorConfig,
};

mod error;
pub use error::DeployerError;

pub mod factory;

pub mod orchestrator;
pub use orchestrator::{
    AccountStatus,
    Authorizer,
    Deployment,
    DeploymentOrchestrator,
    DeploymentPlan,
    DeploymentReceipt,
    DeploymentState,
    SendRequest,
    StaticSignature,
};

#[cfg(any(test, feature = "test"))]
pub mod test_utils;
