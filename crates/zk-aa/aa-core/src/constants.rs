use crate::primitives::{
    Address,
    B256,
    address,
    b256,
};

/// The system contract every `create*` deployment is routed through.
/// An envelope addressed here is a deployment envelope.
pub const CONTRACT_DEPLOYER_ADDRESS: Address = address!("0000000000000000000000000000000000008006");

/// `keccak256("zksyncCreate2")`, the domain separator of salted deployments.
pub const CREATE2_PREFIX: B256 =
    b256!("2020dba91b30cc0006188af794c2fb30dd8520db7e2c088b7fc7c103c00ca494");

/// `keccak256("zksyncCreate")`, the domain separator of nonce based deployments.
pub const CREATE_PREFIX: B256 =
    b256!("63bae3a9951d38e8a3fbb7b70909afc1200610fc5bc55ade242f815974674f23");

/// Type byte of the EIP-712 account-abstraction transaction.
pub const EIP712_TX_TYPE: u8 = 0x71;

/// Gas per byte of published data used when the sender does not declare one.
pub const DEFAULT_GAS_PER_PUBDATA_LIMIT: u64 = 50_000;

/// Version marker stored in the first byte of every bytecode hash.
pub const BYTECODE_HASH_VERSION: u8 = 1;

/// Deployable code is measured in words of this many bytes.
pub const BYTECODE_WORD_SIZE: usize = 32;

/// The word count is stored in two bytes of the bytecode hash.
pub const MAX_BYTECODE_WORDS: usize = u16::MAX as usize;

/// EIP-712 domain name used by the chain for transaction signing.
pub const EIP712_DOMAIN_NAME: &str = "zkSync";

/// EIP-712 domain version used by the chain for transaction signing.
pub const EIP712_DOMAIN_VERSION: &str = "2";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::keccak256;

    #[test]
    fn test_prefixes_match_their_preimages() {
        assert_eq!(CREATE2_PREFIX, keccak256(b"zksyncCreate2"));
        assert_eq!(CREATE_PREFIX, keccak256(b"zksyncCreate"));
    }
}
