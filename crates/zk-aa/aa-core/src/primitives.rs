pub use alloy_primitives::{
    Address,
    B256,
    Bytes,
    KECCAK256_EMPTY,
    U256,
    address,
    b256,
    bytes,
    hex,
    keccak256,
};

use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

use crate::{
    constants::{
        BYTECODE_HASH_VERSION,
        BYTECODE_WORD_SIZE,
    },
    error::{
        BytecodeError,
        EnvelopeBuildError,
    },
};

/// Versioned, length-prefixed hash of deployable bytecode.
///
/// Layout: `[version, 0x00, words_hi, words_lo, sha256(code)[4..32]]`. This is
/// not a plain digest and is deliberately not interchangeable with
/// [`DataHash`]: passing an ordinary digest where the chain expects the packed
/// form silently yields the wrong deployment address.
///
/// Values are produced by [`crate::bytecode::hash_bytecode`] or validated with
/// [`CodeHash::from_packed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "B256", into = "B256")]
pub struct CodeHash(B256);

impl CodeHash {
    pub(crate) const fn new_unchecked(packed: B256) -> Self {
        Self(packed)
    }

    /// Validates a packed hash obtained outside of this crate, e.g. from an
    /// artifact file or from deployer calldata.
    pub fn from_packed(packed: B256) -> Result<Self, BytecodeError> {
        let bytes = packed.as_slice();
        let words = u16::from_be_bytes([bytes[2], bytes[3]]);
        if bytes[0] != BYTECODE_HASH_VERSION || bytes[1] != 0 || words % 2 == 0 {
            return Err(BytecodeError::InvalidCodeHash(packed));
        }
        Ok(Self(packed))
    }

    /// The version marker, currently always `1`.
    pub fn version(&self) -> u8 {
        self.0[0]
    }

    /// Number of 32-byte words of the hashed code.
    pub fn word_count(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }

    /// Length in bytes of the hashed code.
    pub fn code_len(&self) -> usize {
        usize::from(self.word_count()) * BYTECODE_WORD_SIZE
    }

    pub const fn as_b256(&self) -> &B256 {
        &self.0
    }

    pub const fn into_inner(self) -> B256 {
        self.0
    }
}

impl TryFrom<B256> for CodeHash {
    type Error = BytecodeError;

    fn try_from(packed: B256) -> Result<Self, Self::Error> {
        Self::from_packed(packed)
    }
}

impl From<CodeHash> for B256 {
    fn from(hash: CodeHash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for CodeHash {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Display for CodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A plain `keccak256` digest of arbitrary data, such as constructor input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataHash(B256);

impl DataHash {
    /// Digest of the empty byte string.
    pub const EMPTY: Self = Self(KECCAK256_EMPTY);

    /// Hashes `data` with `keccak256`.
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        Self(keccak256(data))
    }

    /// Wraps a digest computed elsewhere. The caller vouches that `digest` is a
    /// `keccak256` output.
    pub const fn from_digest(digest: B256) -> Self {
        Self(digest)
    }

    pub const fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl fmt::Display for DataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Caller chosen entropy for salted deployments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Salt(B256);

impl Salt {
    /// No entropy: the address depends only on deployer, code and input.
    pub const ZERO: Self = Self(B256::ZERO);

    pub const fn new(value: B256) -> Self {
        Self(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub const fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl From<B256> for Salt {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<[u8; 32]> for Salt {
    fn from(value: [u8; 32]) -> Self {
        Self(B256::from(value))
    }
}

impl FromStr for Salt {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s).map(Self)
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Authorization blob checked by the sending account's own validation logic.
///
/// The bytes are never parsed or verified here; only emptiness is rejected,
/// since an empty blob is indistinguishable from "not stamped" on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomSignature(Bytes);

impl CustomSignature {
    pub fn new(blob: impl Into<Bytes>) -> Result<Self, EnvelopeBuildError> {
        let blob = blob.into();
        if blob.is_empty() {
            return Err(EnvelopeBuildError::EmptyCustomSignature);
        }
        Ok(Self(blob))
    }

    pub const fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl AsRef<[u8]> for CustomSignature {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}
