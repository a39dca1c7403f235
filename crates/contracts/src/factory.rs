//! Deterministic account deployment

use crate::{
    account::SimpleAccount,
    env::{CallEnv, CallMessage, Contract},
    error::Revert,
    gas,
    gen::{simple_account_api::OwnerCall, simple_account_factory_api::SimpleAccountFactoryAPICalls},
    utils::{decode_address, decode_call},
};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
    utils::get_contract_address,
};
use std::any::Any;

/// Counterfactual address of the account created by `factory` with sequence number `seq`
///
/// Follows the contract creation address rule (`keccak256(rlp([factory, seq]))[12..]`), so it
/// only depends on the factory and the sequence number and can be computed before deployment.
pub fn get_address(factory: Address, seq: U256) -> Address {
    get_contract_address(factory, seq)
}

/// Factory deploying [SimpleAccount]s at deterministic addresses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleAccountFactory {
    /// Lowest sequence number above every sequence used so far
    next_sequence: U256,
}

impl Default for SimpleAccountFactory {
    fn default() -> Self {
        // contract creation nonces start at 1
        Self { next_sequence: U256::one() }
    }
}

impl SimpleAccountFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_sequence(&self) -> U256 {
        self.next_sequence
    }

    /// Deploys an account for `owner` at [get_address], or returns the existing one
    ///
    /// # Arguments
    /// * `env` - The execution environment (the factory is the executing contract)
    /// * `owner` - Owner of the account
    /// * `seq` - Sequence number chosen by the caller
    ///
    /// # Returns
    /// * `Ok(Address)` - Address of the (possibly pre-existing) account
    /// * `Err(Revert)` - If the address belongs to an account of another owner
    pub fn create_account(
        &mut self,
        env: &mut dyn CallEnv,
        owner: Address,
        seq: U256,
    ) -> Result<Address, Revert> {
        env.charge_gas(gas::SLOAD)?;
        let address = get_address(env.address(), seq);

        if env.has_code(&address) {
            let existing = env.call(address, U256::zero(), OwnerCall.encode().into())?;
            if decode_address(&existing)? != owner {
                return Err(Revert::AddressInUse { address });
            }
            return Ok(address);
        }

        env.charge_gas(gas::ACCOUNT_CODE_DEPOSIT)?;
        env.create(address, Box::new(SimpleAccount::new(owner)))?;
        if seq >= self.next_sequence {
            env.charge_gas(gas::SSTORE_UPDATE)?;
            self.next_sequence = seq.saturating_add(U256::one());
        }

        Ok(address)
    }
}

impl Contract for SimpleAccountFactory {
    fn call(&mut self, env: &mut dyn CallEnv, msg: &CallMessage) -> Result<Bytes, Revert> {
        match decode_call::<SimpleAccountFactoryAPICalls>(&msg.data)? {
            SimpleAccountFactoryAPICalls::CreateAccount(call) => {
                let address = self.create_account(env, call.owner, call.salt)?;
                Ok(address.encode().into())
            }
            SimpleAccountFactoryAPICalls::GetAddress(call) => {
                Ok(get_address(env.address(), call.salt).encode().into())
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
