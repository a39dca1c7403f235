use crate::ledger::Ledger;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use vela_contracts::{Contract, Revert};

/// Native balances, deployed contracts and the entry point ledger
///
/// Cloning the state takes a snapshot; restoring a snapshot rolls back every balance, contract
/// field, deposit and nonce changed since.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    balances: HashMap<Address, U256>,
    /// `None` while the contract is on the call stack
    contracts: HashMap<Address, Option<Box<dyn Contract>>>,
    ledger: Ledger,
}

impl WorldState {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger, ..Default::default() }
    }

    pub fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn set_balance(&mut self, account: Address, amount: U256) {
        self.balances.insert(account, amount);
    }

    /// Moves `value` of native currency between accounts
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), Revert> {
        if value.is_zero() || from == to {
            return Ok(());
        }

        let balance = self.balance(&from);
        if balance < value {
            return Err(Revert::InsufficientBalance { account: from, balance, required: value });
        }
        let credited = self
            .balance(&to)
            .checked_add(value)
            .ok_or_else(|| Revert::Reason(format!("balance of {to:?} overflows")))?;
        self.balances.insert(from, balance - value);
        self.balances.insert(to, credited);
        Ok(())
    }

    pub fn has_code(&self, account: &Address) -> bool {
        self.contracts.contains_key(account)
    }

    pub fn deploy(&mut self, address: Address, code: Box<dyn Contract>) -> Result<(), Revert> {
        if self.has_code(&address) {
            return Err(Revert::AddressInUse { address });
        }
        self.contracts.insert(address, Some(code));
        Ok(())
    }

    /// Contract deployed at `address`, downcast to its concrete type
    pub fn contract<T: 'static>(&self, address: &Address) -> Option<&T> {
        self.contracts.get(address)?.as_ref()?.as_any().downcast_ref::<T>()
    }

    /// Takes the contract out of the state for the duration of a call
    ///
    /// # Returns
    /// * `Ok(None)` - No code at the address
    /// * `Ok(Some(contract))` - The contract, to be put back with [WorldState::restore_contract]
    /// * `Err(Revert)` - The contract is already executing
    pub(crate) fn take_contract(
        &mut self,
        address: &Address,
    ) -> Result<Option<Box<dyn Contract>>, Revert> {
        match self.contracts.get_mut(address) {
            None => Ok(None),
            Some(slot) => slot.take().map(Some).ok_or(Revert::Reentrancy { address: *address }),
        }
    }

    pub(crate) fn restore_contract(&mut self, address: Address, contract: Box<dyn Contract>) {
        self.contracts.insert(address, Some(contract));
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }
}
