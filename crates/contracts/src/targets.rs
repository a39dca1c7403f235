//! Sample contracts called by accounts

use crate::{
    env::{CallEnv, CallMessage, Contract},
    error::Revert,
    gas,
    gen::{counter_api::CounterAPICalls, sample_token_api::SampleTokenAPICalls},
    utils::{decode_call, require_balance},
};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use std::{any::Any, collections::HashMap};

/// Counter incremented by whoever calls it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counter {
    count: U256,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> U256 {
        self.count
    }
}

impl Contract for Counter {
    fn call(&mut self, env: &mut dyn CallEnv, msg: &CallMessage) -> Result<Bytes, Revert> {
        match decode_call::<CounterAPICalls>(&msg.data)? {
            CounterAPICalls::Increment(_) => {
                let cost = if self.count.is_zero() { gas::SSTORE_SET } else { gas::SSTORE_UPDATE };
                env.charge_gas(cost)?;
                self.count = self.count.saturating_add(U256::one());
                Ok(Bytes::default())
            }
            CounterAPICalls::Count(_) => {
                env.charge_gas(gas::SLOAD)?;
                Ok(self.count.encode().into())
            }
            CounterAPICalls::Fail(_) => Err(Revert::Reason("Counter: forced failure".into())),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// ERC-20 subset with an owner allowed to mint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleToken {
    owner: Address,
    balances: HashMap<Address, U256>,
    total_supply: U256,
}

impl SampleToken {
    pub fn new(owner: Address) -> Self {
        Self { owner, balances: HashMap::new(), total_supply: U256::zero() }
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Credits `amount` to `to` (direct setup, outside of any call)
    pub fn mint(&mut self, to: Address, amount: U256) -> Result<(), Revert> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| Revert::Reason("ERC20: total supply overflow".into()))?;
        let balance = self.balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
    }
}

impl Contract for SampleToken {
    fn call(&mut self, env: &mut dyn CallEnv, msg: &CallMessage) -> Result<Bytes, Revert> {
        match decode_call::<SampleTokenAPICalls>(&msg.data)? {
            SampleTokenAPICalls::Transfer(call) => {
                env.charge_gas(gas::SLOAD + 2 * gas::SSTORE_UPDATE)?;
                let balance = self.balance_of(&msg.caller);
                require_balance(msg.caller, balance, call.amount)?;
                self.balances.insert(msg.caller, balance - call.amount);
                let to = self.balances.entry(call.to).or_default();
                *to = to.saturating_add(call.amount);
                Ok(true.encode().into())
            }
            SampleTokenAPICalls::BalanceOf(call) => {
                env.charge_gas(gas::SLOAD)?;
                Ok(self.balance_of(&call.account).encode().into())
            }
            SampleTokenAPICalls::TotalSupply(_) => {
                env.charge_gas(gas::SLOAD)?;
                Ok(self.total_supply.encode().into())
            }
            SampleTokenAPICalls::Mint(call) => {
                if msg.caller != self.owner {
                    return Err(Revert::Unauthorized { caller: msg.caller });
                }
                env.charge_gas(2 * gas::SSTORE_UPDATE)?;
                self.mint(call.to, call.amount)?;
                Ok(Bytes::default())
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
