//! Contracts misbehaving in ways the sample contracts never do

use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use std::any::Any;
use vela_contracts::{
    entry_point_api::HandleOpsCall, simple_account_api::SimpleAccountAPICalls, utils::decode_call,
    Account, AccountError, CallEnv, CallMessage, Contract, Paymaster, PaymasterError, Revert,
};
use vela_primitives::{PostOpMode, UserOperationHash, UserOperationSigned, ValidationData};

/// Sponsors every operation but always fails in `postOp`, after recording the attempt
#[derive(Clone, Debug, Default)]
pub struct FaultyPaymaster {
    pub post_ops: u64,
}

impl Paymaster for FaultyPaymaster {
    fn validate_paymaster_user_op(
        &mut self,
        _env: &mut dyn CallEnv,
        uo: &UserOperationSigned,
        _uo_hash: &UserOperationHash,
        _max_cost: U256,
    ) -> Result<(Bytes, ValidationData), PaymasterError> {
        Ok((uo.sender.encode().into(), ValidationData::default()))
    }

    fn post_op(
        &mut self,
        env: &mut dyn CallEnv,
        _mode: PostOpMode,
        _context: &Bytes,
        _actual_gas_cost: U256,
        _actual_user_op_fee_per_gas: U256,
    ) -> Result<(), Revert> {
        env.charge_gas(1_000)?;
        self.post_ops += 1;
        Err(Revert::Reason("FaultyPaymaster: postOp failed".into()))
    }
}

impl Contract for FaultyPaymaster {
    fn call(&mut self, _env: &mut dyn CallEnv, _msg: &CallMessage) -> Result<Bytes, Revert> {
        Ok(Bytes::default())
    }

    fn as_paymaster(&mut self) -> Option<&mut dyn Paymaster> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Calls back into `handleOps` whenever it is called
#[derive(Clone, Debug, Default)]
pub struct ReentrantTarget;

impl Contract for ReentrantTarget {
    fn call(&mut self, env: &mut dyn CallEnv, _msg: &CallMessage) -> Result<Bytes, Revert> {
        let entry_point = env.entry_point();
        let data = HandleOpsCall { ops: vec![], beneficiary: env.address() }.encode();
        env.call(entry_point, U256::zero(), data.into())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Account accepting any signature within a fixed validity window
#[derive(Clone, Debug)]
pub struct TimedAccount {
    pub validation: ValidationData,
}

impl Account for TimedAccount {
    fn owner(&self) -> Address {
        Address::zero()
    }

    fn validate_user_op(
        &mut self,
        env: &mut dyn CallEnv,
        _uo: &UserOperationSigned,
        _uo_hash: &UserOperationHash,
        missing_account_funds: U256,
    ) -> Result<ValidationData, AccountError> {
        if !missing_account_funds.is_zero() {
            let entry_point = env.entry_point();
            env.call(entry_point, missing_account_funds, Bytes::default())?;
        }
        Ok(self.validation)
    }

    fn execute(
        &mut self,
        env: &mut dyn CallEnv,
        _caller: Address,
        dest: Address,
        value: U256,
        func: Bytes,
    ) -> Result<Bytes, Revert> {
        env.call(dest, value, func)
    }
}

impl Contract for TimedAccount {
    fn call(&mut self, env: &mut dyn CallEnv, msg: &CallMessage) -> Result<Bytes, Revert> {
        match decode_call::<SimpleAccountAPICalls>(&msg.data)? {
            SimpleAccountAPICalls::Execute(call) => {
                self.execute(env, msg.caller, call.dest, call.value, call.func)
            }
            _ => Err(Revert::Reason("TimedAccount: unsupported".into())),
        }
    }

    fn as_account(&mut self) -> Option<&mut dyn Account> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
