//! ABI of account factories deploying a fixed account code with `create2`.

use alloy_primitives::Bytes;
use alloy_sol_types::{
    SolCall,
    SolValue,
    sol,
};
use zk_aa_core::primitives::{
    CodeHash,
    Salt,
};

sol! {
    /// A factory constructed with the hash of the account code it deploys.
    interface IAccountFactory {
        function deployAccount(bytes32 salt) external returns (address);
    }
}

/// Constructor input of a factory deploying `account_code_hash`.
pub fn factory_constructor_input(account_code_hash: CodeHash) -> Bytes {
    account_code_hash.into_inner().abi_encode().into()
}

pub fn deploy_account_calldata(salt: Salt) -> Bytes {
    IAccountFactory::deployAccountCall {
        salt: *salt.as_b256(),
    }
    .abi_encode()
    .into()
}
