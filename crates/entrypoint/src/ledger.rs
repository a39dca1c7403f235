use crate::error::{EntryPointError, ValidationError};
use dyn_clone::DynClone;
use ethers::types::{Address, U256};
use std::{collections::HashMap, fmt::Debug};
use vela_primitives::utils::{join_nonce, split_nonce};

/// DepositOp describes the ability to read and write deposits held by the entry point
pub trait DepositOp {
    /// Deposit of an account (zero if it never deposited)
    fn get_deposit(&self, account: &Address) -> U256;

    /// Overwrites the deposit of an account
    fn set_deposit(&mut self, account: &Address, amount: U256);

    /// Sum of every deposit
    fn total(&self) -> U256;
}

/// NonceOp describes the ability to read and write the nonce sequences of senders
pub trait NonceOp {
    /// Next expected sequence number for the `(sender, key)` pair
    ///
    /// # Arguments
    /// * `sender` - The sender of user operations
    /// * `key` - The 192-bit nonce key
    ///
    /// # Returns
    /// * `u64` - The sequence number the next user operation must carry (zero for a new key)
    fn get_sequence(&self, sender: &Address, key: &U256) -> u64;

    /// Overwrites the next expected sequence number for the `(sender, key)` pair
    fn set_sequence(&mut self, sender: &Address, key: &U256, sequence: u64);
}

pub trait DepositAct: DepositOp + Debug + Send + Sync + DynClone {}

dyn_clone::clone_trait_object!(DepositAct);
impl<T> DepositAct for T where T: DepositOp + Debug + Send + Sync + Clone {}

pub trait NonceAct: NonceOp + Debug + Send + Sync + DynClone {}

dyn_clone::clone_trait_object!(NonceAct);
impl<T> NonceAct for T where T: NonceOp + Debug + Send + Sync + Clone {}

/// Deposits and nonces kept by the entry point
#[derive(Clone, Debug)]
pub struct Ledger {
    deposits: Box<dyn DepositAct>,
    nonces: Box<dyn NonceAct>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(
            Box::<HashMap<Address, U256>>::default(),
            Box::<HashMap<(Address, U256), u64>>::default(),
        )
    }
}

impl Ledger {
    pub fn new(deposits: Box<dyn DepositAct>, nonces: Box<dyn NonceAct>) -> Self {
        Self { deposits, nonces }
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.deposits.get_deposit(account)
    }

    /// Sum of every deposit (what the entry point owes)
    pub fn total_deposits(&self) -> U256 {
        self.deposits.total()
    }

    /// Adds `amount` to the deposit of `account` and returns the new deposit
    pub fn credit(&mut self, account: &Address, amount: U256) -> Result<U256, EntryPointError> {
        let deposit = self
            .deposits
            .get_deposit(account)
            .checked_add(amount)
            .ok_or(EntryPointError::DepositOverflow { account: *account })?;
        self.deposits.set_deposit(account, deposit);
        Ok(deposit)
    }

    /// Removes `amount` from the deposit of `account` and returns the new deposit
    pub fn debit(&mut self, account: &Address, amount: U256) -> Result<U256, EntryPointError> {
        let deposit = self.deposits.get_deposit(account);
        if deposit < amount {
            return Err(EntryPointError::InsufficientDeposit { account: *account, deposit, amount });
        }
        self.deposits.set_deposit(account, deposit - amount);
        Ok(deposit - amount)
    }

    /// Full nonce (key and next sequence) the next user operation of `sender` must carry
    pub fn get_nonce(&self, sender: &Address, key: &U256) -> U256 {
        join_nonce(*key, self.nonces.get_sequence(sender, key))
    }

    /// Consumes `nonce` for `sender` if it is the next expected one for its key
    pub fn validate_and_update_nonce(
        &mut self,
        sender: &Address,
        nonce: U256,
    ) -> Result<(), ValidationError> {
        let (key, sequence) = split_nonce(nonce);
        let expected = self.nonces.get_sequence(sender, &key);
        let next = expected.checked_add(1);
        match next {
            Some(next) if sequence == expected => {
                self.nonces.set_sequence(sender, &key, next);
                Ok(())
            }
            _ => Err(ValidationError::NonceInvalid {
                expected: join_nonce(key, expected),
                actual: nonce,
            }),
        }
    }
}
