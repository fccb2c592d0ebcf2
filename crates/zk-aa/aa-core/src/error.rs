use crate::primitives::{
    Address,
    B256,
    CodeHash,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("Invalid code length {len}: {violation}")]
    InvalidCodeLength {
        len: usize,
        violation: CodeLengthViolation,
    },
    #[error("Not a versioned bytecode hash: {0}")]
    InvalidCodeHash(B256),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeLengthViolation {
    #[error("code is empty")]
    Empty,
    #[error("length is not a multiple of 32 bytes")]
    NotWordAligned,
    #[error("code must contain an odd number of words")]
    EvenWordCount,
    #[error("code exceeds 65535 words")]
    TooManyWords,
}

/// The address reported by the chain is not the one derived before submission.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Derivation mismatch: predicted {predicted}, observed {observed}")]
pub struct DerivationMismatch {
    pub predicted: Address,
    pub observed: Address,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeBuildError {
    #[error("Nonce {nonce} for {sender} conflicts with nonce {last_claimed} already built in this session")]
    NonceConflict {
        sender: Address,
        nonce: u64,
        last_claimed: u64,
    },
    #[error("Replacement for {sender} at nonce {nonce} does not match a previously built envelope")]
    NothingToReplace { sender: Address, nonce: u64 },
    #[error("Nonce is required")]
    MissingNonce,
    #[error("Chain id is required")]
    MissingChainId,
    #[error("Gas limit must be positive")]
    ZeroGasLimit,
    #[error("Gas price must be positive")]
    ZeroGasPrice,
    #[error("Gas per pubdata limit must be positive")]
    ZeroGasPerPubdata,
    #[error("Priority fee {priority_fee} exceeds max fee {max_fee}")]
    PriorityFeeAboveMax { priority_fee: u128, max_fee: u128 },
    #[error("Custom signature must not be empty")]
    EmptyCustomSignature,
    #[error("Factory dependency #{index} is not deployable code: {source}")]
    InvalidFactoryDep {
        index: usize,
        #[source]
        source: BytecodeError,
    },
    #[error("Deployment envelope carries no factory dependencies")]
    MissingFactoryDeps,
    #[error("Code {0} is referenced but missing from factory dependencies")]
    MissingFactoryDep(CodeHash),
    #[error("Deployment envelope input is not a contract deployer call")]
    NotADeployerCall,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(MalformedReason),
    #[error("Unknown transaction type marker {0:#04x}")]
    UnknownTypeMarker(u8),
    #[error("Field `{field}` exceeds its {bits}-bit width")]
    FieldOutOfRange { field: &'static str, bits: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("input is empty")]
    Empty,
    #[error("rlp error in `{field}`: {error}")]
    Rlp {
        field: &'static str,
        error: alloy_rlp::Error,
    },
    #[error("expected a list for `{0}`")]
    ExpectedList(&'static str),
    #[error("expected a string for `{0}`")]
    ExpectedString(&'static str),
    #[error("integer `{0}` has leading zero bytes")]
    LeadingZero(&'static str),
    #[error("`{field}` is {len} bytes, expected an address")]
    InvalidAddress { field: &'static str, len: usize },
    #[error("conventional signature slots must be empty")]
    ConventionalSignature,
    #[error("chain id {signature_slot} in the signature slot disagrees with chain id {chain_id}")]
    ChainIdMismatch { signature_slot: u64, chain_id: u64 },
    #[error("factory dependency #{index} is invalid: {error}")]
    InvalidFactoryDep { index: usize, error: BytecodeError },
    #[error("factory dependency {0} appears twice")]
    DuplicateFactoryDep(CodeHash),
    #[error("paymaster params must be empty or [address, input]")]
    Paymaster,
    #[error("{0} bytes left in the field list after the last field")]
    ExtraFields(usize),
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

impl From<MalformedReason> for CodecError {
    fn from(reason: MalformedReason) -> Self {
        Self::MalformedEnvelope(reason)
    }
}
