//! The EIP-712 (`0x71`) account-abstraction transaction envelope.
//!
//! Unlike a conventional typed transaction the envelope carries no ECDSA
//! signature. Authorization travels in an opaque [`CustomSignature`] that the
//! sending account validates itself, next to the extended fee field
//! `gas_per_pubdata_limit` and the `factory_deps` a deployment must publish.

mod builder;
pub use builder::{
    EnvelopeBuilder,
    NonceSession,
};

pub mod codec;

mod eip712;
pub use eip712::{
    Transaction as Eip712Transaction,
    eip712_domain,
};

use std::collections::BTreeSet;

use crate::{
    bytecode::hash_bytecode,
    constants::{
        CONTRACT_DEPLOYER_ADDRESS,
        EIP712_TX_TYPE,
    },
    error::{
        BytecodeError,
        CodecError,
    },
    primitives::{
        Address,
        Bytes,
        CodeHash,
        CustomSignature,
        U256,
    },
    system::DeployerCall,
};

/// Transaction type marker, the first byte of an encoded envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxType {
    #[default]
    Eip712 = EIP712_TX_TYPE,
}

impl TxType {
    pub const fn marker(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TxType {
    type Error = CodecError;

    fn try_from(marker: u8) -> Result<Self, Self::Error> {
        match marker {
            EIP712_TX_TYPE => Ok(Self::Eip712),
            other => Err(CodecError::UnknownTypeMarker(other)),
        }
    }
}

/// Code blobs published together with a transaction, keyed by their hash.
///
/// Insertion order is preserved because it is part of both the wire encoding
/// and the signed digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactoryDeps {
    entries: Vec<(CodeHash, Bytes)>,
    hashes: BTreeSet<CodeHash>,
}

impl FactoryDeps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes and adds `code`. Adding code that is already present is a no-op.
    pub fn insert(&mut self, code: impl Into<Bytes>) -> Result<CodeHash, BytecodeError> {
        let code = code.into();
        let hash = hash_bytecode(&code)?;
        if self.hashes.insert(hash) {
            self.entries.push((hash, code));
        }
        Ok(hash)
    }

    /// Adds code whose hash is already known. Returns `false` on a duplicate.
    pub(crate) fn insert_hashed(&mut self, hash: CodeHash, code: Bytes) -> bool {
        if !self.hashes.insert(hash) {
            return false;
        }
        self.entries.push((hash, code));
        true
    }

    pub fn contains(&self, hash: &CodeHash) -> bool {
        self.hashes.contains(hash)
    }

    pub fn get(&self, hash: &CodeHash) -> Option<&Bytes> {
        self.entries
            .iter()
            .find_map(|(entry, code)| (entry == hash).then_some(code))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CodeHash, &Bytes)> {
        self.entries.iter().map(|(hash, code)| (hash, code))
    }

    pub fn hashes(&self) -> impl Iterator<Item = &CodeHash> {
        self.entries.iter().map(|(hash, _)| hash)
    }

    pub fn codes(&self) -> impl Iterator<Item = &Bytes> {
        self.entries.iter().map(|(_, code)| code)
    }
}

/// A paymaster covering the fee of the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymasterParams {
    pub paymaster: Address,
    pub input: Bytes,
}

/// A built account-abstraction transaction.
///
/// Envelopes are only obtained from [`EnvelopeBuilder::build`] or from
/// [`codec::decode`], and are immutable apart from [`Eip712Envelope::stamp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Envelope {
    pub(crate) tx_type: TxType,
    pub(crate) chain_id: u64,
    pub(crate) nonce: u64,
    pub(crate) from: Address,
    pub(crate) to: Option<Address>,
    pub(crate) value: U256,
    pub(crate) input: Bytes,
    pub(crate) gas_limit: u64,
    pub(crate) gas_price: u128,
    pub(crate) max_priority_fee_per_gas: u128,
    pub(crate) gas_per_pubdata_limit: u64,
    pub(crate) factory_deps: FactoryDeps,
    pub(crate) custom_signature: Option<CustomSignature>,
    pub(crate) paymaster: Option<PaymasterParams>,
}

impl Eip712Envelope {
    /// Starts building an envelope sent by `from`.
    pub fn builder(from: Address) -> EnvelopeBuilder {
        EnvelopeBuilder::new(from)
    }

    /// Attaches the authorization blob, replacing any previous one.
    #[must_use]
    pub fn stamp(mut self, signature: CustomSignature) -> Self {
        self.custom_signature = Some(signature);
        self
    }

    pub fn is_stamped(&self) -> bool {
        self.custom_signature.is_some()
    }

    /// Whether the envelope is routed to the contract deployer.
    pub fn is_deployment(&self) -> bool {
        self.to == Some(CONTRACT_DEPLOYER_ADDRESS)
    }

    /// The deployer call carried by a deployment envelope.
    pub fn deployer_call(&self) -> Option<DeployerCall> {
        if !self.is_deployment() {
            return None;
        }
        DeployerCall::decode(&self.input)
    }

    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Option<Address> {
        self.to
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn input(&self) -> &Bytes {
        &self.input
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Maximum fee per gas.
    pub fn gas_price(&self) -> u128 {
        self.gas_price
    }

    pub fn max_priority_fee_per_gas(&self) -> u128 {
        self.max_priority_fee_per_gas
    }

    pub fn gas_per_pubdata_limit(&self) -> u64 {
        self.gas_per_pubdata_limit
    }

    pub fn factory_deps(&self) -> &FactoryDeps {
        &self.factory_deps
    }

    pub fn custom_signature(&self) -> Option<&CustomSignature> {
        self.custom_signature.as_ref()
    }

    pub fn paymaster(&self) -> Option<&PaymasterParams> {
        self.paymaster.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::pad_bytecode;

    #[test]
    fn test_type_marker() {
        assert_eq!(TxType::try_from(0x71), Ok(TxType::Eip712));
        assert_eq!(TxType::Eip712.marker(), 0x71);
        assert_eq!(
            TxType::try_from(0x02),
            Err(CodecError::UnknownTypeMarker(0x02))
        );
    }

    #[test]
    fn test_factory_deps_is_a_set_in_insertion_order() {
        let first = pad_bytecode(b"first");
        let second = pad_bytecode(b"second");

        let mut deps = FactoryDeps::new();
        let second_hash = deps.insert(second.clone()).unwrap();
        let first_hash = deps.insert(first.clone()).unwrap();
        assert_eq!(deps.insert(second.clone()).unwrap(), second_hash);

        assert_eq!(deps.len(), 2);
        assert!(deps.contains(&first_hash));
        assert_eq!(deps.get(&second_hash).unwrap().as_ref(), second.as_slice());
        assert_eq!(
            deps.hashes().copied().collect::<Vec<_>>(),
            vec![second_hash, first_hash]
        );
    }

    #[test]
    fn test_factory_deps_rejects_invalid_code() {
        let mut deps = FactoryDeps::new();
        assert!(deps.insert(vec![0u8; 64]).is_err());
        assert!(deps.is_empty());
    }
}
