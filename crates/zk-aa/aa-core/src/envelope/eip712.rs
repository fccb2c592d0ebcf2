//! Typed-data digest of an envelope.
//!
//! The digest is what an account's validation logic authorizes; how the
//! custom signature over it is produced is up to the account.

use std::borrow::Cow;

use alloy_sol_types::{
    Eip712Domain,
    SolStruct,
    sol,
};

use super::Eip712Envelope;
use crate::{
    constants::{
        EIP712_DOMAIN_NAME,
        EIP712_DOMAIN_VERSION,
    },
    primitives::{
        Address,
        B256,
        U256,
        keccak256,
    },
};

sol! {
    /// Typed-data layout of an account-abstraction transaction.
    struct Transaction {
        uint256 txType;
        uint256 from;
        uint256 to;
        uint256 gasLimit;
        uint256 gasPerPubdataByteLimit;
        uint256 maxFeePerGas;
        uint256 maxPriorityFeePerGas;
        uint256 paymaster;
        uint256 nonce;
        uint256 value;
        bytes data;
        bytes32[] factoryDeps;
        bytes paymasterInput;
    }
}

/// Signing domain for transactions on `chain_id`.
pub fn eip712_domain(chain_id: u64) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(EIP712_DOMAIN_NAME)),
        Some(Cow::Borrowed(EIP712_DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        None,
        None,
    )
}

fn address_word(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

impl From<&Eip712Envelope> for Transaction {
    fn from(envelope: &Eip712Envelope) -> Self {
        let (paymaster, paymaster_input) = envelope
            .paymaster
            .as_ref()
            .map(|params| (params.paymaster, params.input.clone()))
            .unwrap_or_default();

        Self {
            txType: U256::from(envelope.tx_type.marker()),
            from: address_word(envelope.from),
            to: envelope.to.map(address_word).unwrap_or_default(),
            gasLimit: U256::from(envelope.gas_limit),
            gasPerPubdataByteLimit: U256::from(envelope.gas_per_pubdata_limit),
            maxFeePerGas: U256::from(envelope.gas_price),
            maxPriorityFeePerGas: U256::from(envelope.max_priority_fee_per_gas),
            paymaster: address_word(paymaster),
            nonce: U256::from(envelope.nonce),
            value: envelope.value,
            data: envelope.input.clone(),
            factoryDeps: envelope
                .factory_deps
                .hashes()
                .map(|hash| hash.into_inner())
                .collect(),
            paymasterInput: paymaster_input,
        }
    }
}

impl Eip712Envelope {
    /// Typed-data digest the sending account authorizes.
    ///
    /// Independent of the custom signature, so it can be computed before the
    /// envelope is stamped.
    pub fn signing_digest(&self) -> B256 {
        Transaction::from(self).eip712_signing_hash(&eip712_domain(self.chain_id))
    }

    /// Hash identifying the stamped transaction on chain, or `None` while the
    /// envelope is unstamped.
    pub fn tx_hash(&self) -> Option<B256> {
        let signature = self.custom_signature.as_ref()?;
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(self.signing_digest().as_slice());
        preimage[32..].copy_from_slice(keccak256(signature).as_slice());
        Some(keccak256(preimage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::pad_bytecode,
        envelope::NonceSession,
        primitives::{
            CustomSignature,
            address,
            b256,
            bytes,
        },
    };

    fn sample_envelope() -> Eip712Envelope {
        Eip712Envelope::builder(address!("4944DECe0b3ae884edDd9B8C6b316b889DADEDD7"))
            .to(address!("543A5fBE705d040EFD63D9095054558FB4498F88"))
            .input(bytes!("deadbeef"))
            .nonce(3)
            .chain_id(300)
            .gas_limit(1_000_000)
            .gas_price(250_000_000)
            .custom_signature(bytes!("1337"))
            .build(&mut NonceSession::new())
            .unwrap()
    }

    #[test]
    fn test_struct_type_string() {
        assert_eq!(
            Transaction::eip712_encode_type(),
            "Transaction(uint256 txType,uint256 from,uint256 to,uint256 gasLimit,\
             uint256 gasPerPubdataByteLimit,uint256 maxFeePerGas,\
             uint256 maxPriorityFeePerGas,uint256 paymaster,uint256 nonce,\
             uint256 value,bytes data,bytes32[] factoryDeps,bytes paymasterInput)"
        );
    }

    #[test]
    fn test_golden_signing_digest() {
        assert_eq!(
            sample_envelope().signing_digest(),
            b256!("6036fe78e2bdb43e967ea54ecdf07994018af01d63e7ebd9ec8f6f399218c302")
        );
    }

    #[test]
    fn test_golden_tx_hash() {
        assert_eq!(
            sample_envelope().tx_hash(),
            Some(b256!(
                "10279a2161cfd6971a359ea5e1dad5f6c859c45e866a5b8444f638381bdeeccc"
            ))
        );
    }

    #[test]
    fn test_digest_ignores_signature() {
        let envelope = sample_envelope();
        let restamped = envelope
            .clone()
            .stamp(CustomSignature::new(bytes!("ffff")).unwrap());

        assert_eq!(envelope.signing_digest(), restamped.signing_digest());
        assert_ne!(envelope.tx_hash(), restamped.tx_hash());
    }

    #[test]
    fn test_digest_commits_to_chain_and_deps() {
        let envelope = sample_envelope();

        let mut other_chain = envelope.clone();
        other_chain.chain_id = 301;
        assert_ne!(envelope.signing_digest(), other_chain.signing_digest());

        let mut with_dep = envelope.clone();
        with_dep.factory_deps.insert(pad_bytecode(b"dep")).unwrap();
        assert_ne!(envelope.signing_digest(), with_dep.signing_digest());
    }

    #[test]
    fn test_unstamped_envelope_has_no_tx_hash() {
        let unstamped = Eip712Envelope::builder(Address::ZERO)
            .nonce(0)
            .chain_id(1)
            .gas_limit(1)
            .gas_price(1)
            .build(&mut NonceSession::new())
            .unwrap();
        assert_eq!(unstamped.tx_hash(), None);
    }
}
