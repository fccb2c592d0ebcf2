//! Core primitives for deterministic account deployment on zkSync-style chains.
//!
//! Everything in this crate is pure: hashing deployable bytecode, deriving the
//! address a contract will occupy before it exists, and building, encoding and
//! decoding the EIP-712 (`0x71`) account-abstraction transaction envelope.
//! Nothing here performs I/O.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

mod error;
pub use error::{
    BytecodeError,
    CodeLengthViolation,
    CodecError,
    DerivationMismatch,
    EnvelopeBuildError,
    MalformedReason,
};

pub mod address;
pub use address::{
    AddressPrediction,
    create_address,
    create2_address,
    create2_address_for_input,
    verify_address,
};

pub mod bytecode;
pub use bytecode::{
    hash_bytecode,
    pad_bytecode,
};

pub mod constants;

pub mod envelope;
pub use envelope::{
    EnvelopeBuilder,
    Eip712Envelope,
    FactoryDeps,
    NonceSession,
    PaymasterParams,
    TxType,
    codec,
};

pub mod primitives;

pub mod system;
