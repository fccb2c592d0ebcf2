#![cfg(any(test, feature = "test"))]

use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::Arc,
};

use alloy_primitives::{
    Address,
    B256,
    Bytes,
    U256,
};
use alloy_sol_types::{
    SolCall,
    SolValue,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use zk_aa_core::{
    Eip712Envelope,
    codec,
    create_address,
    create2_address,
    primitives::{
        CodeHash,
        DataHash,
        Salt,
    },
};

use crate::{
    chain::{
        CallRequest,
        ChainClient,
        ChainClientError,
        InclusionReport,
        InclusionStatus,
        RejectionCause,
        TxHandle,
    },
    factory::IAccountFactory,
};

pub const DEFAULT_GAS_PRICE: u128 = 250_000_000;
pub const DEFAULT_GAS_ESTIMATE: u64 = 1_000_000;

#[derive(Debug, Default)]
struct ChainState {
    chain_id: u64,
    gas_price: u128,
    gas_estimate: u64,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    deployment_nonces: HashMap<Address, u64>,
    published: HashSet<CodeHash>,
    contracts: HashMap<Address, CodeHash>,
    factory_code: HashSet<CodeHash>,
    factories: HashMap<Address, CodeHash>,
    unfunded: HashSet<Address>,
    next_address: Option<Option<Address>>,
    next_inclusion_failure: Option<RejectionCause>,
    next_broadcast_rejection: Option<RejectionCause>,
    reports: HashMap<TxHandle, InclusionReport>,
    accepted: Vec<Eip712Envelope>,
}

fn revert(reason: &'static str) -> RejectionCause {
    RejectionCause::ExecutionReverted(Bytes::from_static(reason.as_bytes()))
}

impl ChainState {
    fn bump_deployment_nonce(&mut self, deployer: Address) -> u64 {
        let nonce = self.deployment_nonces.entry(deployer).or_default();
        let current = *nonce;
        *nonce += 1;
        current
    }

    fn create_contract(&mut self, address: Address, code_hash: CodeHash) -> Result<(), RejectionCause> {
        if !self.published.contains(&code_hash) {
            return Err(revert("code is not published"));
        }
        if self.contracts.contains_key(&address) {
            return Err(revert("address is occupied"));
        }
        self.contracts.insert(address, code_hash);
        Ok(())
    }

    /// Applies the envelope and returns the created contract, if any.
    fn execute(&mut self, envelope: &Eip712Envelope) -> Result<Option<Address>, RejectionCause> {
        let from = envelope.from();

        if let Some(call) = envelope.deployer_call() {
            let deployment_nonce = self.bump_deployment_nonce(from);
            let address = if call.kind.is_salted() {
                create2_address(from, call.code_hash, call.salt, DataHash::of(&call.input))
            } else {
                create_address(from, deployment_nonce)
            };
            self.create_contract(address, call.code_hash)?;

            if self.factory_code.contains(&call.code_hash) {
                let account = B256::abi_decode(&call.input)
                    .ok()
                    .and_then(|packed| CodeHash::from_packed(packed).ok())
                    .ok_or_else(|| revert("invalid factory constructor input"))?;
                self.factories.insert(address, account);
            }
            return Ok(Some(address));
        }

        let Some(to) = envelope.to() else {
            return Ok(None);
        };
        let Some(account) = self.factories.get(&to).copied() else {
            return Ok(None);
        };
        let call = IAccountFactory::deployAccountCall::abi_decode(envelope.input())
            .map_err(|_| revert("unknown factory call"))?;
        self.bump_deployment_nonce(to);
        let address = create2_address(to, account, Salt::new(call.salt), DataHash::EMPTY);
        self.create_contract(address, account)?;
        Ok(Some(address))
    }
}

/// A single-node chain kept in memory. Clones share the same state.
#[derive(Debug, Clone)]
pub struct InMemoryChain {
    state: Arc<Mutex<ChainState>>,
}

impl InMemoryChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                chain_id,
                gas_price: DEFAULT_GAS_PRICE,
                gas_estimate: DEFAULT_GAS_ESTIMATE,
                ..Default::default()
            })),
        }
    }

    pub fn fund(&self, address: Address, amount: U256) {
        *self.state.lock().balances.entry(address).or_default() += amount;
    }

    /// Every transaction from `address` fails with insufficient funds.
    pub fn mark_unfunded(&self, address: Address) {
        self.state.lock().unfunded.insert(address);
    }

    /// Contracts deployed with this code take an account code hash as
    /// constructor input and deploy it on `deployAccount(salt)`.
    pub fn register_factory_code(&self, code_hash: CodeHash) {
        self.state.lock().factory_code.insert(code_hash);
    }

    /// Reports `address` instead of the real one for the next transaction.
    pub fn report_next_address(&self, address: Option<Address>) {
        self.state.lock().next_address = Some(address);
    }

    /// The next broadcast is accepted but fails on inclusion.
    pub fn fail_next_inclusion(&self, cause: RejectionCause) {
        self.state.lock().next_inclusion_failure = Some(cause);
    }

    /// The next broadcast is refused before it touches any state.
    pub fn reject_next_broadcast(&self, cause: RejectionCause) {
        self.state.lock().next_broadcast_rejection = Some(cause);
    }

    pub fn set_gas_price(&self, gas_price: u128) {
        self.state.lock().gas_price = gas_price;
    }

    pub fn code_at(&self, address: Address) -> Option<CodeHash> {
        self.state.lock().contracts.get(&address).copied()
    }

    pub fn factory_account_hash(&self, factory: Address) -> Option<CodeHash> {
        self.state.lock().factories.get(&factory).copied()
    }

    /// Envelopes accepted so far, in order.
    pub fn accepted(&self) -> Vec<Eip712Envelope> {
        self.state.lock().accepted.clone()
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn balance(&self, address: Address) -> Result<U256, ChainClientError> {
        Ok(self
            .state
            .lock()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainClientError> {
        Ok(self
            .state
            .lock()
            .nonces
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn gas_price(&self) -> Result<u128, ChainClientError> {
        Ok(self.state.lock().gas_price)
    }

    async fn estimate_gas(&self, _request: &CallRequest) -> Result<u64, ChainClientError> {
        Ok(self.state.lock().gas_estimate)
    }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHandle, ChainClientError> {
        let reject = ChainClientError::Rejected;

        let envelope = codec::decode(&raw)
            .map_err(|error| reject(RejectionCause::Other(error.to_string())))?;
        let from = envelope.from();

        let mut state = self.state.lock();
        if let Some(cause) = state.next_broadcast_rejection.take() {
            return Err(reject(cause));
        }
        if envelope.chain_id() != state.chain_id {
            return Err(reject(RejectionCause::Other(format!(
                "wrong chain id {}",
                envelope.chain_id()
            ))));
        }
        let expected = state.nonces.get(&from).copied().unwrap_or_default();
        if envelope.nonce() != expected {
            return Err(reject(RejectionCause::NonceConflict {
                expected,
                got: envelope.nonce(),
            }));
        }
        if state.unfunded.contains(&from) {
            return Err(reject(RejectionCause::InsufficientFunds));
        }
        let handle = envelope
            .tx_hash()
            .map(TxHandle)
            .ok_or_else(|| reject(RejectionCause::Other("missing custom signature".into())))?;

        state.nonces.insert(from, expected + 1);
        for hash in envelope.factory_deps().hashes() {
            state.published.insert(*hash);
        }

        let mut report = match state.execute(&envelope) {
            Ok(created) => InclusionReport {
                status: InclusionStatus::Included,
                included_address: state.next_address.take().unwrap_or(created),
            },
            Err(cause) => InclusionReport {
                status: InclusionStatus::Failed(cause),
                included_address: None,
            },
        };
        if let Some(cause) = state.next_inclusion_failure.take() {
            report = InclusionReport {
                status: InclusionStatus::Failed(cause),
                included_address: None,
            };
        }

        state.reports.insert(handle, report);
        state.accepted.push(envelope);
        Ok(handle)
    }

    async fn await_inclusion(&self, handle: &TxHandle) -> Result<InclusionReport, ChainClientError> {
        self.state
            .lock()
            .reports
            .get(handle)
            .cloned()
            .ok_or_else(|| ChainClientError::Transport(format!("unknown transaction {handle}")))
    }
}
