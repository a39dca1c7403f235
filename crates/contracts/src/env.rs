//! Execution environment seen by contracts
//!
//! The entry point drives contracts through [CallEnv]: every storage-visible effect a contract
//! has outside of its own fields (value transfers, calls into other contracts, deployments, gas)
//! goes through it, so the environment can meter and roll it back.

use crate::{account::Account, error::Revert, paymaster::Paymaster};
use dyn_clone::DynClone;
use ethers::types::{Address, Bytes, U256};
use std::{any::Any, fmt::Debug};
use vela_primitives::BlockContext;

/// Message call frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallMessage {
    /// Caller of the contract
    pub caller: Address,
    /// Value transferred with the call (already credited to the callee)
    pub value: U256,
    /// Calldata
    pub data: Bytes,
}

/// Environment available to a running contract
pub trait CallEnv {
    /// Address of the contract currently executing
    fn address(&self) -> Address;

    /// Address of the entry point
    fn entry_point(&self) -> Address;

    /// Current block values
    fn block(&self) -> BlockContext;

    /// Native balance of an account
    fn balance(&self, account: &Address) -> U256;

    /// Whether a contract is deployed at the address
    fn has_code(&self, account: &Address) -> bool;

    /// Deposit of an account held by the entry point
    fn deposit_of(&self, account: &Address) -> U256;

    /// Charges gas to the current phase budget
    fn charge_gas(&mut self, gas: u64) -> Result<(), Revert>;

    /// Calls `to` from the current contract, transferring `value` first
    fn call(&mut self, to: Address, value: U256, data: Bytes) -> Result<Bytes, Revert>;

    /// Deploys `code` at `address` on behalf of the current contract
    fn create(&mut self, address: Address, code: Box<dyn Contract>) -> Result<(), Revert>;
}

/// Contract deployed in the world state
///
/// Untrusted code: the entry point only reaches it through `call` and the optional account and
/// paymaster capabilities, and contains every failure it reports.
pub trait Contract: DynClone + Debug + Send + Sync {
    /// Handles a message call
    fn call(&mut self, env: &mut dyn CallEnv, msg: &CallMessage) -> Result<Bytes, Revert>;

    /// Account capability
    fn as_account(&mut self) -> Option<&mut dyn Account> {
        None
    }

    /// Paymaster capability
    fn as_paymaster(&mut self) -> Option<&mut dyn Paymaster> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

dyn_clone::clone_trait_object!(Contract);
