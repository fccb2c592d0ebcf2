//! Deterministic deployment addresses.
//!
//! Addresses are derived, never chosen: they are a pure function of who deploys,
//! what code is deployed and either a salt plus the constructor input (salted
//! deployments) or the deployer's deployment nonce.

use crate::{
    constants::{
        CREATE_PREFIX,
        CREATE2_PREFIX,
    },
    error::DerivationMismatch,
    primitives::{
        Address,
        CodeHash,
        DataHash,
        Salt,
        U256,
        keccak256,
    },
};

/// Address of a contract created with `create2` / `create2Account`.
///
/// `keccak256(CREATE2_PREFIX ‖ pad32(deployer) ‖ salt ‖ code_hash ‖ input_hash)[12..]`
pub fn create2_address(
    deployer: Address,
    code_hash: CodeHash,
    salt: Salt,
    input_hash: DataHash,
) -> Address {
    let mut preimage = [0u8; 160];
    preimage[..32].copy_from_slice(CREATE2_PREFIX.as_slice());
    preimage[44..64].copy_from_slice(deployer.as_slice());
    preimage[64..96].copy_from_slice(salt.as_b256().as_slice());
    preimage[96..128].copy_from_slice(code_hash.as_b256().as_slice());
    preimage[128..].copy_from_slice(input_hash.as_b256().as_slice());
    Address::from_word(keccak256(preimage))
}

/// Same as [`create2_address`], hashing the constructor input first.
pub fn create2_address_for_input(
    deployer: Address,
    code_hash: CodeHash,
    salt: Salt,
    input: &[u8],
) -> Address {
    create2_address(deployer, code_hash, salt, DataHash::of(input))
}

/// Address of a contract created with `create` / `createAccount`.
///
/// The deployment nonce is the deployer's counter of contracts created so far,
/// which is tracked separately from its transaction nonce.
pub fn create_address(deployer: Address, deployment_nonce: u64) -> Address {
    let mut preimage = [0u8; 96];
    preimage[..32].copy_from_slice(CREATE_PREFIX.as_slice());
    preimage[44..64].copy_from_slice(deployer.as_slice());
    preimage[64..].copy_from_slice(&U256::from(deployment_nonce).to_be_bytes::<32>());
    Address::from_word(keccak256(preimage))
}

/// Checks the address the chain reports against the predicted one.
pub fn verify_address(predicted: Address, observed: Address) -> Result<Address, DerivationMismatch> {
    if predicted == observed {
        Ok(observed)
    } else {
        Err(DerivationMismatch {
            predicted,
            observed,
        })
    }
}

/// Everything needed to derive a deployment address ahead of submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPrediction {
    Create2 {
        deployer: Address,
        code_hash: CodeHash,
        salt: Salt,
        input_hash: DataHash,
    },
    Create {
        deployer: Address,
        deployment_nonce: u64,
    },
}

impl AddressPrediction {
    pub fn address(&self) -> Address {
        match *self {
            Self::Create2 {
                deployer,
                code_hash,
                salt,
                input_hash,
            } => create2_address(deployer, code_hash, salt, input_hash),
            Self::Create {
                deployer,
                deployment_nonce,
            } => create_address(deployer, deployment_nonce),
        }
    }

    pub fn deployer(&self) -> Address {
        match self {
            Self::Create2 { deployer, .. } | Self::Create { deployer, .. } => *deployer,
        }
    }
}
