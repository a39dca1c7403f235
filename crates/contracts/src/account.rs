//! Accounts (wallets) validated and called by the entry point

use crate::{
    env::{CallEnv, CallMessage, Contract},
    error::{AccountError, Revert},
    gas,
    gen::{
        entry_point_api::DepositToCall,
        simple_account_api::SimpleAccountAPICalls,
    },
    utils::{decode_call, recover_signer},
};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use std::any::Any;
use vela_primitives::{UserOperationHash, UserOperationSigned, ValidationData};

/// Account capability invoked by the entry point
pub trait Account {
    /// Owner whose signature authorizes user operations
    fn owner(&self) -> Address;

    /// Validates the signature of a user operation and pays the missing prefund
    ///
    /// # Arguments
    /// * `env` - The execution environment
    /// * `uo` - The [UserOperationSigned](UserOperationSigned) to validate
    /// * `uo_hash` - Its hash (the signed message)
    /// * `missing_account_funds` - Amount the account must transfer to the entry point
    ///
    /// # Returns
    /// * `Ok(ValidationData)` - Time window in which the operation is valid
    /// * `Err(AccountError)` - If the signature is wrong or the prefund cannot be paid
    fn validate_user_op(
        &mut self,
        env: &mut dyn CallEnv,
        uo: &UserOperationSigned,
        uo_hash: &UserOperationHash,
        missing_account_funds: U256,
    ) -> Result<ValidationData, AccountError>;

    /// Executes a call on behalf of the account (only the entry point or the account itself)
    fn execute(
        &mut self,
        env: &mut dyn CallEnv,
        caller: Address,
        dest: Address,
        value: U256,
        func: Bytes,
    ) -> Result<Bytes, Revert>;
}

/// Single-owner account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleAccount {
    owner: Address,
}

impl SimpleAccount {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    fn require_from_entry_point_or_self(env: &dyn CallEnv, caller: Address) -> Result<(), Revert> {
        if caller != env.entry_point() && caller != env.address() {
            return Err(Revert::Unauthorized { caller });
        }
        Ok(())
    }
}

impl Account for SimpleAccount {
    fn owner(&self) -> Address {
        self.owner
    }

    fn validate_user_op(
        &mut self,
        env: &mut dyn CallEnv,
        uo: &UserOperationSigned,
        uo_hash: &UserOperationHash,
        missing_account_funds: U256,
    ) -> Result<ValidationData, AccountError> {
        env.charge_gas(gas::SLOAD + gas::ECRECOVER)?;
        match recover_signer(uo_hash, &uo.signature) {
            Some(signer) if signer == self.owner => {}
            _ => return Err(AccountError::AuthorizationFailed),
        }

        if !missing_account_funds.is_zero() {
            let balance = env.balance(&env.address());
            if balance < missing_account_funds {
                return Err(AccountError::PrefundInsufficient {
                    missing: missing_account_funds,
                    balance,
                });
            }
            let entry_point = env.entry_point();
            env.call(entry_point, missing_account_funds, Bytes::default())?;
        }

        Ok(ValidationData::default())
    }

    fn execute(
        &mut self,
        env: &mut dyn CallEnv,
        caller: Address,
        dest: Address,
        value: U256,
        func: Bytes,
    ) -> Result<Bytes, Revert> {
        Self::require_from_entry_point_or_self(env, caller)?;
        env.call(dest, value, func)
    }
}

impl Contract for SimpleAccount {
    fn call(&mut self, env: &mut dyn CallEnv, msg: &CallMessage) -> Result<Bytes, Revert> {
        if msg.data.is_empty() {
            return Ok(Bytes::default());
        }

        match decode_call::<SimpleAccountAPICalls>(&msg.data)? {
            SimpleAccountAPICalls::Execute(call) => {
                self.execute(env, msg.caller, call.dest, call.value, call.func)
            }
            SimpleAccountAPICalls::ExecuteBatch(call) => {
                Self::require_from_entry_point_or_self(env, msg.caller)?;
                if call.dest.len() != call.func.len() ||
                    (!call.value.is_empty() && call.value.len() != call.func.len())
                {
                    return Err(Revert::Reason("wrong array lengths".into()));
                }
                for (i, (dest, func)) in call.dest.into_iter().zip(call.func).enumerate() {
                    let value = call.value.get(i).copied().unwrap_or_default();
                    env.call(dest, value, func)?;
                }
                Ok(Bytes::default())
            }
            SimpleAccountAPICalls::Owner(_) => {
                env.charge_gas(gas::SLOAD)?;
                Ok(self.owner.encode().into())
            }
            SimpleAccountAPICalls::AddDeposit(_) => {
                let entry_point = env.entry_point();
                let data = DepositToCall { account: env.address() }.encode();
                env.call(entry_point, msg.value, data.into())
            }
            SimpleAccountAPICalls::GetDeposit(_) => {
                Ok(env.deposit_of(&env.address()).encode().into())
            }
        }
    }

    fn as_account(&mut self) -> Option<&mut dyn Account> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
