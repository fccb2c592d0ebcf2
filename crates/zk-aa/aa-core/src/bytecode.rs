//! Bytecode hashing.
//!
//! The chain identifies deployable code by a packed hash rather than a raw
//! digest, and it only accepts code whose length is an odd number of 32-byte
//! words. Both rules are part of the compatibility contract with the network:
//! a hash that differs by one bit derives a different address.

use sha2::{
    Digest,
    Sha256,
};

use crate::{
    constants::{
        BYTECODE_HASH_VERSION,
        BYTECODE_WORD_SIZE,
        MAX_BYTECODE_WORDS,
    },
    error::{
        BytecodeError,
        CodeLengthViolation,
    },
    primitives::{
        B256,
        CodeHash,
    },
};

/// Computes the versioned bytecode hash of `code`.
pub fn hash_bytecode(code: &[u8]) -> Result<CodeHash, BytecodeError> {
    let words = word_count(code.len())?;
    let digest = Sha256::digest(code);

    let mut packed = [0u8; 32];
    packed[0] = BYTECODE_HASH_VERSION;
    packed[2..4].copy_from_slice(&words.to_be_bytes());
    packed[4..].copy_from_slice(&digest[4..]);

    Ok(CodeHash::new_unchecked(B256::from(packed)))
}

/// Right-pads `code` with zero bytes to the nearest length the chain accepts.
///
/// Code that already has a valid length is returned unchanged.
pub fn pad_bytecode(code: &[u8]) -> Vec<u8> {
    let mut words = code.len().div_ceil(BYTECODE_WORD_SIZE).max(1);
    if words % 2 == 0 {
        words += 1;
    }
    let mut padded = code.to_vec();
    padded.resize(words * BYTECODE_WORD_SIZE, 0);
    padded
}

fn word_count(len: usize) -> Result<u16, BytecodeError> {
    let violation = if len == 0 {
        CodeLengthViolation::Empty
    } else if len % BYTECODE_WORD_SIZE != 0 {
        CodeLengthViolation::NotWordAligned
    } else if len / BYTECODE_WORD_SIZE > MAX_BYTECODE_WORDS {
        CodeLengthViolation::TooManyWords
    } else if (len / BYTECODE_WORD_SIZE) % 2 == 0 {
        CodeLengthViolation::EvenWordCount
    } else {
        // Bounded by MAX_BYTECODE_WORDS above.
        return Ok((len / BYTECODE_WORD_SIZE) as u16);
    };

    Err(BytecodeError::InvalidCodeLength { len, violation })
}
