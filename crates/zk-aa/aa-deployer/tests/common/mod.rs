#![allow(dead_code)]

use alloy_primitives::{
    Address,
    Bytes,
    address,
    bytes,
};
use zk_aa_core::{
    pad_bytecode,
    primitives::CustomSignature,
};
use zk_aa_deployer::{
    DeploymentOrchestrator,
    NetworkKind,
    OrchestratorConfig,
    StaticSignature,
    test_utils::InMemoryChain,
};

pub const CHAIN_ID: u64 = 260;

/// Sender of the deployments, standing in for a funded account.
pub const DEPLOYER: Address = address!("36615Cf349d7F6344891B1e7CA7C72883F5dc049");

/// Contract the interaction tests call into.
pub const GREETER: Address = address!("543A5fBE705d040EFD63D9095054558FB4498F88");

pub fn account_code() -> Vec<u8> {
    pad_bytecode(b"DummyAccount runtime")
}

pub fn factory_code() -> Vec<u8> {
    pad_bytecode(&[0x7f; 90])
}

pub fn set_greeting_calldata() -> Bytes {
    bytes!("a41368620000000000000000000000000000000000000000000000000000000000000020000000000000000000000000000000000000000000000000000000000000000e48656c6c6f2066726f6d20414121000000000000000000000000000000000000")
}

pub fn dummy_signature() -> StaticSignature {
    StaticSignature(CustomSignature::new(bytes!("1337")).unwrap())
}

pub fn config() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_chain_id(CHAIN_ID)
        .with_network(NetworkKind::Ephemeral)
}

pub fn chain() -> InMemoryChain {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    InMemoryChain::new(CHAIN_ID)
}

pub fn orchestrator(chain: &InMemoryChain, sender: Address) -> DeploymentOrchestrator<InMemoryChain> {
    DeploymentOrchestrator::new(chain.clone(), sender, config(), dummy_signature())
}
