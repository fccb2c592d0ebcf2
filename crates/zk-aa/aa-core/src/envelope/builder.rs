use std::collections::{
    BTreeSet,
    HashMap,
};

use tracing::{
    debug,
    trace,
};

use super::{
    Eip712Envelope,
    FactoryDeps,
    PaymasterParams,
    TxType,
};
use crate::{
    constants::DEFAULT_GAS_PER_PUBDATA_LIMIT,
    error::EnvelopeBuildError,
    primitives::{
        Address,
        Bytes,
        CodeHash,
        CustomSignature,
        U256,
    },
};

/// Nonces already handed out to built envelopes, per sender.
///
/// A session is owned by a single writer. It enforces that nonces of one
/// sender only grow, so two envelopes can never silently compete for the same
/// slot. Reusing a nonce has to be requested with
/// [`EnvelopeBuilder::replacing`], or the nonce has to be given back with
/// [`NonceSession::release`] once its envelope is known not to land.
#[derive(Debug, Clone, Default)]
pub struct NonceSession {
    claimed: HashMap<Address, BTreeSet<u64>>,
}

impl NonceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The highest nonce built for `sender` in this session.
    pub fn last_claimed(&self, sender: &Address) -> Option<u64> {
        self.claimed
            .get(sender)
            .and_then(|nonces| nonces.last().copied())
    }

    /// Checks whether `nonce` may be used by `sender` without claiming it.
    pub fn check(&self, sender: Address, nonce: u64, replacing: bool) -> Result<(), EnvelopeBuildError> {
        match (self.last_claimed(&sender), replacing) {
            (Some(last_claimed), true) if last_claimed == nonce => Ok(()),
            (_, true) => Err(EnvelopeBuildError::NothingToReplace { sender, nonce }),
            (Some(last_claimed), false) if nonce <= last_claimed => {
                Err(EnvelopeBuildError::NonceConflict {
                    sender,
                    nonce,
                    last_claimed,
                })
            }
            (_, false) => Ok(()),
        }
    }

    /// Gives back a nonce whose envelope never reached the chain, so the next
    /// envelope of `sender` may use it again. Returns whether it was claimed.
    pub fn release(&mut self, sender: Address, nonce: u64) -> bool {
        let Some(nonces) = self.claimed.get_mut(&sender) else {
            return false;
        };
        let released = nonces.remove(&nonce);
        if nonces.is_empty() {
            self.claimed.remove(&sender);
        }
        released
    }

    fn claim(&mut self, sender: Address, nonce: u64) {
        self.claimed.entry(sender).or_default().insert(nonce);
    }
}

/// Fluent builder for [`Eip712Envelope`].
///
/// Fees, gas and the nonce are plain injected values. All validation happens
/// in [`EnvelopeBuilder::build`] and nothing is claimed in the session unless
/// the envelope is accepted.
#[derive(Debug, Clone)]
#[must_use]
pub struct EnvelopeBuilder {
    from: Address,
    to: Option<Address>,
    value: U256,
    input: Bytes,
    nonce: Option<u64>,
    chain_id: Option<u64>,
    gas_limit: u64,
    gas_price: u128,
    max_priority_fee_per_gas: Option<u128>,
    gas_per_pubdata_limit: u64,
    custom_signature: Option<Bytes>,
    factory_deps: Vec<Bytes>,
    required_code: Vec<CodeHash>,
    paymaster: Option<PaymasterParams>,
    replacing: bool,
}

impl EnvelopeBuilder {
    pub fn new(from: Address) -> Self {
        Self {
            from,
            to: None,
            value: U256::ZERO,
            input: Bytes::new(),
            nonce: None,
            chain_id: None,
            gas_limit: 0,
            gas_price: 0,
            max_priority_fee_per_gas: None,
            gas_per_pubdata_limit: DEFAULT_GAS_PER_PUBDATA_LIMIT,
            custom_signature: None,
            factory_deps: Vec::new(),
            required_code: Vec::new(),
            paymaster: None,
            replacing: false,
        }
    }

    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn input(mut self, input: impl Into<Bytes>) -> Self {
        self.input = input.into();
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Maximum fee per gas.
    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Defaults to the gas price when unset.
    pub fn max_priority_fee_per_gas(mut self, fee: u128) -> Self {
        self.max_priority_fee_per_gas = Some(fee);
        self
    }

    pub fn gas_per_pubdata_limit(mut self, limit: u64) -> Self {
        self.gas_per_pubdata_limit = limit;
        self
    }

    /// Stamps the envelope at build time. Unstamped envelopes can be stamped
    /// later with [`Eip712Envelope::stamp`].
    pub fn custom_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.custom_signature = Some(signature.into());
        self
    }

    /// Publishes `code` alongside the transaction.
    pub fn factory_dep(mut self, code: impl Into<Bytes>) -> Self {
        self.factory_deps.push(code.into());
        self
    }

    /// Requires code with the given hash to be among the factory deps, for
    /// code the deployed contract references but the calldata does not name.
    pub fn require_code(mut self, code_hash: CodeHash) -> Self {
        self.required_code.push(code_hash);
        self
    }

    pub fn paymaster(mut self, paymaster: Address, input: impl Into<Bytes>) -> Self {
        self.paymaster = Some(PaymasterParams {
            paymaster,
            input: input.into(),
        });
        self
    }

    /// Marks the envelope as a replacement of the last envelope built for the
    /// same sender, which must carry the same nonce.
    pub fn replacing(mut self) -> Self {
        self.replacing = true;
        self
    }

    /// Validates the envelope and claims its nonce in `session`.
    pub fn build(self, session: &mut NonceSession) -> Result<Eip712Envelope, EnvelopeBuildError> {
        let nonce = self.nonce.ok_or(EnvelopeBuildError::MissingNonce)?;
        let chain_id = self
            .chain_id
            .filter(|chain_id| *chain_id != 0)
            .ok_or(EnvelopeBuildError::MissingChainId)?;

        if self.gas_limit == 0 {
            return Err(EnvelopeBuildError::ZeroGasLimit);
        }
        if self.gas_price == 0 {
            return Err(EnvelopeBuildError::ZeroGasPrice);
        }
        if self.gas_per_pubdata_limit == 0 {
            return Err(EnvelopeBuildError::ZeroGasPerPubdata);
        }
        let max_priority_fee_per_gas = self.max_priority_fee_per_gas.unwrap_or(self.gas_price);
        if max_priority_fee_per_gas > self.gas_price {
            return Err(EnvelopeBuildError::PriorityFeeAboveMax {
                priority_fee: max_priority_fee_per_gas,
                max_fee: self.gas_price,
            });
        }

        let custom_signature = self.custom_signature.map(CustomSignature::new).transpose()?;

        let mut factory_deps = FactoryDeps::new();
        for (index, code) in self.factory_deps.into_iter().enumerate() {
            let hash = factory_deps
                .insert(code)
                .map_err(|source| EnvelopeBuildError::InvalidFactoryDep { index, source })?;
            trace!(target: "envelope::builder", %hash, index, "Added factory dependency");
        }

        let envelope = Eip712Envelope {
            tx_type: TxType::Eip712,
            chain_id,
            nonce,
            from: self.from,
            to: self.to,
            value: self.value,
            input: self.input,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            max_priority_fee_per_gas,
            gas_per_pubdata_limit: self.gas_per_pubdata_limit,
            factory_deps,
            custom_signature,
            paymaster: self.paymaster,
        };

        if envelope.is_deployment() {
            if envelope.factory_deps.is_empty() {
                return Err(EnvelopeBuildError::MissingFactoryDeps);
            }
            let call = envelope
                .deployer_call()
                .ok_or(EnvelopeBuildError::NotADeployerCall)?;
            if !envelope.factory_deps.contains(&call.code_hash) {
                return Err(EnvelopeBuildError::MissingFactoryDep(call.code_hash));
            }
        }
        if let Some(missing) = self
            .required_code
            .into_iter()
            .find(|hash| !envelope.factory_deps.contains(hash))
        {
            return Err(EnvelopeBuildError::MissingFactoryDep(missing));
        }

        session.check(envelope.from, nonce, self.replacing)?;
        session.claim(envelope.from, nonce);

        debug!(
            target: "envelope::builder",
            sender = %envelope.from,
            nonce,
            chain_id,
            deployment = envelope.is_deployment(),
            factory_deps = envelope.factory_deps.len(),
            replacing = self.replacing,
            "Built envelope"
        );
        Ok(envelope)
    }
}
