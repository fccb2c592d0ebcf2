//! Calldata for the system contract deployer.

use alloy_sol_types::{
    SolCall,
    SolInterface,
    sol,
};

use crate::primitives::{
    Bytes,
    CodeHash,
    Salt,
};

sol! {
    /// Entry point of every contract deployment on the chain.
    interface IContractDeployer {
        function create(bytes32 salt, bytes32 bytecodeHash, bytes input) external payable returns (address);
        function create2(bytes32 salt, bytes32 bytecodeHash, bytes input) external payable returns (address);
        function createAccount(bytes32 salt, bytes32 bytecodeHash, bytes input, uint8 aaVersion) external payable returns (address);
        function create2Account(bytes32 salt, bytes32 bytecodeHash, bytes input, uint8 aaVersion) external payable returns (address);
    }
}

/// Account abstraction version an account is registered with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountAbstractionVersion {
    /// Plain contract, not usable as a transaction sender.
    #[default]
    None = 0,
    Version1 = 1,
}

impl TryFrom<u8> for AccountAbstractionVersion {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Version1),
            other => Err(other),
        }
    }
}

/// Deployer entry point used for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployKind {
    Create,
    Create2,
    CreateAccount(AccountAbstractionVersion),
    Create2Account(AccountAbstractionVersion),
}

impl DeployKind {
    /// Whether the resulting address depends on the salt rather than on the
    /// deployment nonce.
    pub fn is_salted(&self) -> bool {
        matches!(self, Self::Create2 | Self::Create2Account(_))
    }

    pub fn is_account(&self) -> bool {
        matches!(self, Self::CreateAccount(_) | Self::Create2Account(_))
    }
}

/// ABI encoded calldata deploying `code_hash` through the contract deployer.
pub fn deployer_calldata(
    kind: DeployKind,
    salt: Salt,
    code_hash: CodeHash,
    input: impl Into<Bytes>,
) -> Bytes {
    DeployerCall::new(kind, salt, code_hash, input.into()).encode()
}

/// A decoded call to [`IContractDeployer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployerCall {
    pub kind: DeployKind,
    pub salt: Salt,
    pub code_hash: CodeHash,
    pub input: Bytes,
}

impl DeployerCall {
    pub fn new(kind: DeployKind, salt: Salt, code_hash: CodeHash, input: Bytes) -> Self {
        Self {
            kind,
            salt,
            code_hash,
            input,
        }
    }

    /// ABI encodes the call.
    pub fn encode(&self) -> Bytes {
        let salt = *self.salt.as_b256();
        let code_hash = self.code_hash.into_inner();
        let input = self.input.clone();

        let encoded = match self.kind {
            DeployKind::Create => IContractDeployer::createCall {
                salt,
                bytecodeHash: code_hash,
                input,
            }
            .abi_encode(),
            DeployKind::Create2 => IContractDeployer::create2Call {
                salt,
                bytecodeHash: code_hash,
                input,
            }
            .abi_encode(),
            DeployKind::CreateAccount(version) => IContractDeployer::createAccountCall {
                salt,
                bytecodeHash: code_hash,
                input,
                aaVersion: version as u8,
            }
            .abi_encode(),
            DeployKind::Create2Account(version) => IContractDeployer::create2AccountCall {
                salt,
                bytecodeHash: code_hash,
                input,
                aaVersion: version as u8,
            }
            .abi_encode(),
        };
        encoded.into()
    }

    /// Decodes deployer calldata. Returns `None` when `data` is not a call to
    /// the deployer or references a value that is not a bytecode hash.
    pub fn decode(data: &[u8]) -> Option<Self> {
        use IContractDeployer::IContractDeployerCalls as Calls;

        let (kind, salt, hash, input) = match Calls::abi_decode(data).ok()? {
            Calls::create(call) => (DeployKind::Create, call.salt, call.bytecodeHash, call.input),
            Calls::create2(call) => (DeployKind::Create2, call.salt, call.bytecodeHash, call.input),
            Calls::createAccount(call) => (
                DeployKind::CreateAccount(call.aaVersion.try_into().ok()?),
                call.salt,
                call.bytecodeHash,
                call.input,
            ),
            Calls::create2Account(call) => (
                DeployKind::Create2Account(call.aaVersion.try_into().ok()?),
                call.salt,
                call.bytecodeHash,
                call.input,
            ),
        };

        Some(Self {
            kind,
            salt: Salt::new(salt),
            code_hash: CodeHash::from_packed(hash).ok()?,
            input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::{
            hash_bytecode,
            pad_bytecode,
        },
        primitives::bytes,
    };

    fn sample_call(kind: DeployKind) -> DeployerCall {
        DeployerCall::new(
            kind,
            Salt::from([7u8; 32]),
            hash_bytecode(&pad_bytecode(b"account")).unwrap(),
            bytes!("c0ffee"),
        )
    }

    /// The deployer ABI is fixed by the chain; selectors must never drift.
    #[test]
    fn test_deployer_selectors_are_stable() {
        assert_eq!(IContractDeployer::createCall::SELECTOR, [0x9c, 0x4d, 0x53, 0x5b]);
        assert_eq!(IContractDeployer::create2Call::SELECTOR, [0x3c, 0xda, 0x33, 0x51]);
        assert_eq!(
            IContractDeployer::createAccountCall::SELECTOR,
            [0xec, 0xf9, 0x5b, 0x8a]
        );
        assert_eq!(
            IContractDeployer::create2AccountCall::SELECTOR,
            [0x5d, 0x38, 0x27, 0x00]
        );
    }

    #[test]
    fn test_decode_recovers_every_kind() {
        for kind in [
            DeployKind::Create,
            DeployKind::Create2,
            DeployKind::CreateAccount(AccountAbstractionVersion::Version1),
            DeployKind::Create2Account(AccountAbstractionVersion::None),
        ] {
            let call = sample_call(kind);
            assert_eq!(DeployerCall::decode(&call.encode()), Some(call));
        }
    }

    #[test]
    fn test_deployer_calldata_matches_call_encoding() {
        let call = sample_call(DeployKind::Create2);
        assert_eq!(
            deployer_calldata(call.kind, call.salt, call.code_hash, call.input.clone()),
            call.encode()
        );
    }

    #[test]
    fn test_decode_rejects_foreign_calldata() {
        assert_eq!(DeployerCall::decode(&[]), None);
        assert_eq!(DeployerCall::decode(&[0xde, 0xad, 0xbe, 0xef]), None);
    }

    #[test]
    fn test_decode_rejects_unpacked_hash() {
        let call = IContractDeployer::create2Call {
            salt: Default::default(),
            bytecodeHash: crate::primitives::keccak256(b"raw digest"),
            input: Bytes::new(),
        };
        assert_eq!(DeployerCall::decode(&call.abi_encode()), None);
    }

    #[test]
    fn test_kind_flags() {
        assert!(DeployKind::Create2.is_salted());
        assert!(!DeployKind::CreateAccount(AccountAbstractionVersion::Version1).is_salted());
        assert!(DeployKind::Create2Account(AccountAbstractionVersion::Version1).is_account());
        assert!(!DeployKind::Create.is_account());
    }
}
