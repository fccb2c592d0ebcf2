//! Drives a deployment from a plan to a verified address.
//!
//! ```text
//! Built -> Predicted -> Submitted -> Confirmed
//!                    \            \-> Rejected | Inconsistent
//!                     \-> Rejected
//! ```
//!
//! The address is derived before anything is broadcast and the address the
//! chain reports is always checked against it. A mismatch is never a
//! successful deployment.

mod plan;
pub use plan::DeploymentPlan;

use alloy_primitives::{
    Address,
    B256,
    Bytes,
    U256,
};
use tracing::{
    debug,
    info,
    warn,
};
use zk_aa_core::{
    AddressPrediction,
    Eip712Envelope,
    NonceSession,
    codec,
    primitives::{
        CodeHash,
        CustomSignature,
    },
    verify_address,
};

use crate::{
    chain::{
        CallRequest,
        ChainClient,
        InclusionStatus,
        RejectionCause,
        TxHandle,
    },
    config::OrchestratorConfig,
    error::DeployerError,
};

/// Produces the custom signature the sending account accepts for an
/// envelope, given its signing digest.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, digest: B256) -> CustomSignature;
}

impl<F> Authorizer for F
where
    F: Fn(B256) -> CustomSignature + Send + Sync,
{
    fn authorize(&self, digest: B256) -> CustomSignature {
        self(digest)
    }
}

/// Stamps every envelope with the same blob, for accounts whose validation
/// accepts any signature.
#[derive(Debug, Clone)]
pub struct StaticSignature(pub CustomSignature);

impl Authorizer for StaticSignature {
    fn authorize(&self, _digest: B256) -> CustomSignature {
        self.0.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentState {
    Built,
    Predicted,
    Submitted(TxHandle),
    Confirmed(Address),
    Rejected(RejectionCause),
    Inconsistent {
        predicted: Address,
        observed: Option<Address>,
    },
}

impl DeploymentState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Predicted => "predicted",
            Self::Submitted(_) => "submitted",
            Self::Confirmed(_) => "confirmed",
            Self::Rejected(_) => "rejected",
            Self::Inconsistent { .. } => "inconsistent",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed(_) | Self::Rejected(_) | Self::Inconsistent { .. }
        )
    }
}

/// One deployment attempt.
#[derive(Debug, Clone)]
pub struct Deployment {
    envelope: Eip712Envelope,
    prediction: Option<AddressPrediction>,
    state: DeploymentState,
}

impl Deployment {
    pub fn envelope(&self) -> &Eip712Envelope {
        &self.envelope
    }

    pub fn prediction(&self) -> Option<&AddressPrediction> {
        self.prediction.as_ref()
    }

    pub fn predicted_address(&self) -> Option<Address> {
        self.prediction.as_ref().map(AddressPrediction::address)
    }

    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    fn predict(&mut self, prediction: AddressPrediction) {
        debug_assert_eq!(self.state, DeploymentState::Built);
        self.prediction = Some(prediction);
        self.state = DeploymentState::Predicted;
    }

    fn require(&self, expected: &DeploymentState, operation: &'static str) -> Result<(), DeployerError> {
        if std::mem::discriminant(&self.state) != std::mem::discriminant(expected) {
            return Err(DeployerError::InvalidTransition {
                state: self.state.name(),
                operation,
            });
        }
        Ok(())
    }
}

/// A confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReceipt {
    pub address: Address,
    pub tx: TxHandle,
    /// Whether the contract should be verified on a block explorer.
    pub should_verify: bool,
}

/// A plain call from the account, not creating any contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRequest {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    pub balance: U256,
    pub nonce: u64,
}

pub struct DeploymentOrchestrator<C> {
    client: C,
    sender: Address,
    config: OrchestratorConfig,
    authorizer: Box<dyn Authorizer>,
    session: NonceSession,
}

impl<C: ChainClient> DeploymentOrchestrator<C> {
    pub fn new(
        client: C,
        sender: Address,
        config: OrchestratorConfig,
        authorizer: impl Authorizer + 'static,
    ) -> Self {
        Self {
            client,
            sender,
            config,
            authorizer: Box::new(authorizer),
            session: NonceSession::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub async fn account_status(&self, address: Address) -> Result<AccountStatus, DeployerError> {
        Ok(AccountStatus {
            balance: self.client.balance(address).await?,
            nonce: self.client.transaction_count(address).await?,
        })
    }

    /// Builds and stamps an envelope for a call from the sender, using the
    /// chain for nonce, gas price and gas estimate unless configured.
    async fn build_envelope(
        &mut self,
        to: Address,
        input: Bytes,
        value: U256,
        factory_deps: Vec<Bytes>,
        required_code: &[CodeHash],
    ) -> Result<Eip712Envelope, DeployerError> {
        let nonce = self.client.transaction_count(self.sender).await?;
        let gas_price = match self.config.gas_price {
            Some(gas_price) => gas_price,
            None => self.client.gas_price().await?,
        };
        let gas_limit = match self.config.gas_limit {
            Some(gas_limit) => gas_limit,
            None => {
                let request = CallRequest {
                    from: self.sender,
                    to,
                    value,
                    input: input.clone(),
                    factory_deps: factory_deps.clone(),
                };
                self.client.estimate_gas(&request).await?
            }
        };

        let mut builder = Eip712Envelope::builder(self.sender)
            .to(to)
            .input(input)
            .value(value)
            .nonce(nonce)
            .chain_id(self.config.chain_id)
            .gas_limit(gas_limit)
            .gas_price(gas_price)
            .gas_per_pubdata_limit(self.config.gas_per_pubdata_limit);
        for code in factory_deps {
            builder = builder.factory_dep(code);
        }
        for code_hash in required_code {
            builder = builder.require_code(*code_hash);
        }

        let envelope = builder.build(&mut self.session)?;
        let signature = self.authorizer.authorize(envelope.signing_digest());
        Ok(envelope.stamp(signature))
    }

    /// Builds the deployment envelope and derives the address it will create.
    pub async fn prepare(&mut self, plan: DeploymentPlan) -> Result<Deployment, DeployerError> {
        let resolved = plan.resolve(self.sender)?;
        let envelope = self
            .build_envelope(
                resolved.to,
                resolved.input,
                resolved.value,
                resolved.factory_deps,
                &resolved.required_code,
            )
            .await?;

        let mut deployment = Deployment {
            envelope,
            prediction: None,
            state: DeploymentState::Built,
        };
        deployment.predict(resolved.prediction);

        info!(
            target: "orchestrator",
            sender = %self.sender,
            nonce = deployment.envelope.nonce(),
            deployer = %resolved.prediction.deployer(),
            predicted = %resolved.prediction.address(),
            "Prepared deployment"
        );
        Ok(deployment)
    }

    /// Broadcasts a prepared deployment without waiting for it.
    pub async fn submit(&mut self, deployment: &mut Deployment) -> Result<TxHandle, DeployerError> {
        deployment.require(&DeploymentState::Predicted, "submit")?;

        let raw = codec::encode(&deployment.envelope);
        debug!(target: "orchestrator", len = raw.len(), "Broadcasting envelope");
        match self.client.broadcast(raw).await {
            Ok(handle) => {
                info!(target: "orchestrator", tx = %handle, "Submitted deployment");
                deployment.state = DeploymentState::Submitted(handle);
                Ok(handle)
            }
            Err(error) => {
                let error = Self::fail(deployment, error.into());
                if matches!(error, DeployerError::Rejected(_)) {
                    self.release(&deployment.envelope);
                }
                Err(error)
            }
        }
    }

    /// Waits for inclusion and checks the created address against the
    /// prediction.
    pub async fn confirm(
        &mut self,
        deployment: &mut Deployment,
    ) -> Result<DeploymentReceipt, DeployerError> {
        let DeploymentState::Submitted(handle) = deployment.state else {
            return Err(DeployerError::InvalidTransition {
                state: deployment.state.name(),
                operation: "confirm",
            });
        };
        let Some(predicted) = deployment.predicted_address() else {
            return Err(DeployerError::InvalidTransition {
                state: deployment.state.name(),
                operation: "confirm",
            });
        };

        let report = match self.client.await_inclusion(&handle).await {
            Ok(report) => report,
            Err(error) => return Err(Self::fail(deployment, error.into())),
        };
        if let InclusionStatus::Failed(cause) = report.status {
            return Err(Self::fail(deployment, DeployerError::Rejected(cause)));
        }

        let observed = report.included_address;
        match observed.map(|observed| verify_address(predicted, observed)) {
            Some(Ok(address)) => {
                info!(target: "orchestrator", %address, tx = %handle, "Deployment confirmed");
                deployment.state = DeploymentState::Confirmed(address);
                Ok(DeploymentReceipt {
                    address,
                    tx: handle,
                    should_verify: self.config.network.should_verify(),
                })
            }
            Some(Err(_)) | None => {
                warn!(
                    target: "orchestrator",
                    %predicted,
                    ?observed,
                    tx = %handle,
                    "Included address does not match prediction"
                );
                deployment.state = DeploymentState::Inconsistent {
                    predicted,
                    observed,
                };
                Err(DeployerError::Inconsistent {
                    predicted,
                    observed,
                })
            }
        }
    }

    /// Prepares, submits and confirms `plan`.
    pub async fn deploy(&mut self, plan: DeploymentPlan) -> Result<DeploymentReceipt, DeployerError> {
        let mut deployment = self.prepare(plan).await?;
        self.submit(&mut deployment).await?;
        self.confirm(&mut deployment).await
    }

    /// Sends a call from the account and waits for its inclusion.
    pub async fn send(&mut self, request: SendRequest) -> Result<TxHandle, DeployerError> {
        let envelope = self
            .build_envelope(request.to, request.input, request.value, Vec::new(), &[])
            .await?;
        info!(
            target: "orchestrator",
            sender = %self.sender,
            to = %request.to,
            nonce = envelope.nonce(),
            "Sending transaction"
        );

        let handle = match self.client.broadcast(codec::encode(&envelope)).await {
            Ok(handle) => handle,
            Err(error) => {
                let error = DeployerError::from(error);
                if matches!(error, DeployerError::Rejected(_)) {
                    self.release(&envelope);
                }
                return Err(error);
            }
        };
        let report = self.client.await_inclusion(&handle).await?;
        match report.status {
            InclusionStatus::Included => {
                info!(target: "orchestrator", tx = %handle, "Transaction included");
                Ok(handle)
            }
            InclusionStatus::Failed(cause) => {
                warn!(target: "orchestrator", tx = %handle, %cause, "Transaction failed");
                Err(DeployerError::Rejected(cause))
            }
        }
    }

    /// Gives the nonce of an envelope the chain refused at broadcast back to
    /// the session, so the next envelope reuses the slot the chain still
    /// expects.
    fn release(&mut self, envelope: &Eip712Envelope) {
        if self.session.release(envelope.from(), envelope.nonce()) {
            debug!(
                target: "orchestrator",
                sender = %envelope.from(),
                nonce = envelope.nonce(),
                "Released nonce of rejected envelope"
            );
        }
    }

    /// Moves the deployment to `Rejected` when the chain refused it. Transport
    /// errors leave the state untouched.
    fn fail(deployment: &mut Deployment, error: DeployerError) -> DeployerError {
        if let DeployerError::Rejected(cause) = &error {
            warn!(target: "orchestrator", %cause, "Deployment rejected");
            deployment.state = DeploymentState::Rejected(cause.clone());
        }
        error
    }
}
