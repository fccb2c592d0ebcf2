use alloy_primitives::{
    Address,
    Bytes,
    U256,
};
use zk_aa_core::{
    AddressPrediction,
    BytecodeError,
    constants::CONTRACT_DEPLOYER_ADDRESS,
    hash_bytecode,
    primitives::{
        CodeHash,
        DataHash,
        Salt,
    },
    system::{
        AccountAbstractionVersion,
        DeployKind,
        DeployerCall,
    },
};

use crate::factory::deploy_account_calldata;

#[derive(Debug, Clone)]
enum Target {
    /// Deployment routed through the system contract deployer.
    Deployer {
        kind: DeployKind,
        code: Bytes,
        salt: Salt,
        constructor_input: Bytes,
        deployment_nonce: u64,
    },
    /// Call to a factory that deploys `account_code_hash` with `create2`.
    Factory {
        factory: Address,
        call_input: Bytes,
        account_code_hash: CodeHash,
        salt: Salt,
        constructor_input: Bytes,
    },
}

/// What to deploy and how its address is derived.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    target: Target,
    factory_deps: Vec<Bytes>,
    required_code: Vec<CodeHash>,
    value: U256,
}

/// A plan resolved against a sender: where to send what, and which address
/// the chain has to report back.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedPlan {
    pub(crate) to: Address,
    pub(crate) input: Bytes,
    pub(crate) value: U256,
    pub(crate) factory_deps: Vec<Bytes>,
    pub(crate) required_code: Vec<CodeHash>,
    pub(crate) prediction: AddressPrediction,
}

impl DeploymentPlan {
    fn deployer(
        kind: DeployKind,
        code: Bytes,
        salt: Salt,
        constructor_input: Bytes,
        deployment_nonce: u64,
    ) -> Self {
        Self {
            target: Target::Deployer {
                kind,
                code,
                salt,
                constructor_input,
                deployment_nonce,
            },
            factory_deps: Vec::new(),
            required_code: Vec::new(),
            value: U256::ZERO,
        }
    }

    /// Salted contract deployment.
    pub fn create2(code: impl Into<Bytes>, salt: Salt, constructor_input: impl Into<Bytes>) -> Self {
        Self::deployer(
            DeployKind::Create2,
            code.into(),
            salt,
            constructor_input.into(),
            0,
        )
    }

    /// Salted deployment of a contract registered as an account.
    pub fn create2_account(
        code: impl Into<Bytes>,
        salt: Salt,
        constructor_input: impl Into<Bytes>,
    ) -> Self {
        Self::deployer(
            DeployKind::Create2Account(AccountAbstractionVersion::Version1),
            code.into(),
            salt,
            constructor_input.into(),
            0,
        )
    }

    /// Nonce based contract deployment. `deployment_nonce` is the number of
    /// contracts the sender has deployed so far.
    pub fn create(
        code: impl Into<Bytes>,
        constructor_input: impl Into<Bytes>,
        deployment_nonce: u64,
    ) -> Self {
        Self::deployer(
            DeployKind::Create,
            code.into(),
            Salt::ZERO,
            constructor_input.into(),
            deployment_nonce,
        )
    }

    /// Nonce based deployment of a contract registered as an account.
    pub fn create_account(
        code: impl Into<Bytes>,
        constructor_input: impl Into<Bytes>,
        deployment_nonce: u64,
    ) -> Self {
        Self::deployer(
            DeployKind::CreateAccount(AccountAbstractionVersion::Version1),
            code.into(),
            Salt::ZERO,
            constructor_input.into(),
            deployment_nonce,
        )
    }

    /// Calls `factory` with `call_input`, expecting it to `create2` the code
    /// behind `account_code_hash` with itself as deployer.
    pub fn via_factory(
        factory: Address,
        call_input: impl Into<Bytes>,
        account_code_hash: CodeHash,
        salt: Salt,
        constructor_input: impl Into<Bytes>,
    ) -> Self {
        Self {
            target: Target::Factory {
                factory,
                call_input: call_input.into(),
                account_code_hash,
                salt,
                constructor_input: constructor_input.into(),
            },
            factory_deps: Vec::new(),
            required_code: Vec::new(),
            value: U256::ZERO,
        }
    }

    /// `deployAccount(salt)` on an account factory, for accounts without
    /// constructor input.
    pub fn account_via_factory(factory: Address, account_code_hash: CodeHash, salt: Salt) -> Self {
        Self::via_factory(
            factory,
            deploy_account_calldata(salt),
            account_code_hash,
            salt,
            Bytes::new(),
        )
    }

    /// Publishes additional code with the deployment, such as the account
    /// code a factory's constructor refers to.
    pub fn with_factory_dep(mut self, code: impl Into<Bytes>) -> Self {
        self.factory_deps.push(code.into());
        self
    }

    /// Refuses to build the deployment unless code with `code_hash` is
    /// published with it, for code the deployed contract references by hash.
    pub fn requiring_code(mut self, code_hash: CodeHash) -> Self {
        self.required_code.push(code_hash);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub(crate) fn resolve(&self, sender: Address) -> Result<ResolvedPlan, BytecodeError> {
        match &self.target {
            Target::Deployer {
                kind,
                code,
                salt,
                constructor_input,
                deployment_nonce,
            } => {
                let code_hash = hash_bytecode(code)?;
                let prediction = if kind.is_salted() {
                    AddressPrediction::Create2 {
                        deployer: sender,
                        code_hash,
                        salt: *salt,
                        input_hash: DataHash::of(constructor_input),
                    }
                } else {
                    AddressPrediction::Create {
                        deployer: sender,
                        deployment_nonce: *deployment_nonce,
                    }
                };

                let mut factory_deps = Vec::with_capacity(self.factory_deps.len() + 1);
                factory_deps.push(code.clone());
                factory_deps.extend(self.factory_deps.iter().cloned());

                Ok(ResolvedPlan {
                    to: CONTRACT_DEPLOYER_ADDRESS,
                    input: DeployerCall::new(*kind, *salt, code_hash, constructor_input.clone())
                        .encode(),
                    value: self.value,
                    factory_deps,
                    required_code: self.required_code.clone(),
                    prediction,
                })
            }
            Target::Factory {
                factory,
                call_input,
                account_code_hash,
                salt,
                constructor_input,
            } => {
                Ok(ResolvedPlan {
                    to: *factory,
                    input: call_input.clone(),
                    value: self.value,
                    factory_deps: self.factory_deps.clone(),
                    required_code: self.required_code.clone(),
                    prediction: AddressPrediction::Create2 {
                        deployer: *factory,
                        code_hash: *account_code_hash,
                        salt: *salt,
                        input_hash: DataHash::of(constructor_input),
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use zk_aa_core::{
        create_address,
        create2_address,
        pad_bytecode,
    };

    const SENDER: Address = address!("1111111111111111111111111111111111111111");

    #[test]
    fn test_create2_plan_predicts_scenario_address() {
        let plan = DeploymentPlan::create2(pad_bytecode(&[0x00, 0x01]), Salt::ZERO, Bytes::new());
        let resolved = plan.resolve(SENDER).unwrap();

        assert_eq!(resolved.to, CONTRACT_DEPLOYER_ADDRESS);
        assert_eq!(
            resolved.prediction.address(),
            address!("5f7908a061b34dc566126c5c17fdadffe589e39e")
        );
        assert_eq!(resolved.factory_deps.len(), 1);

        let call = DeployerCall::decode(&resolved.input).unwrap();
        assert_eq!(call.kind, DeployKind::Create2);
    }

    #[test]
    fn test_create_account_plan_uses_deployment_nonce() {
        let plan = DeploymentPlan::create_account(pad_bytecode(b"acc"), Bytes::new(), 1)
            .with_factory_dep(pad_bytecode(b"extra"));
        let resolved = plan.resolve(SENDER).unwrap();

        assert_eq!(resolved.prediction.address(), create_address(SENDER, 1));
        assert_eq!(resolved.factory_deps.len(), 2);
        assert!(DeployerCall::decode(&resolved.input).unwrap().kind.is_account());
    }

    #[test]
    fn test_factory_plan_predicts_with_factory_as_deployer() {
        let factory = Address::random();
        let account_hash = hash_bytecode(&pad_bytecode(b"account")).unwrap();
        let resolved = DeploymentPlan::account_via_factory(factory, account_hash, Salt::ZERO)
            .resolve(SENDER)
            .unwrap();

        assert_eq!(resolved.to, factory);
        assert!(resolved.factory_deps.is_empty());
        assert_eq!(
            resolved.prediction.address(),
            create2_address(factory, account_hash, Salt::ZERO, DataHash::EMPTY)
        );
    }

    #[test]
    fn test_required_code_is_carried_to_resolved_plan() {
        let account_hash = hash_bytecode(&pad_bytecode(b"account")).unwrap();
        let resolved = DeploymentPlan::create(pad_bytecode(b"factory"), Bytes::new(), 0)
            .requiring_code(account_hash)
            .resolve(SENDER)
            .unwrap();

        assert_eq!(resolved.required_code, vec![account_hash]);
        assert_eq!(resolved.factory_deps.len(), 1);
    }

    #[test]
    fn test_invalid_code_is_rejected_before_prediction() {
        let plan = DeploymentPlan::create2(vec![0u8; 64], Salt::ZERO, Bytes::new());
        assert!(plan.resolve(SENDER).is_err());
    }
}
