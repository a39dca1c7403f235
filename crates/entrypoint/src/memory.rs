use crate::ledger::{DepositOp, NonceOp};
use ethers::types::{Address, U256};
use std::collections::HashMap;

impl DepositOp for HashMap<Address, U256> {
    fn get_deposit(&self, account: &Address) -> U256 {
        self.get(account).copied().unwrap_or_default()
    }

    fn set_deposit(&mut self, account: &Address, amount: U256) {
        if amount.is_zero() {
            self.remove(account);
        } else {
            self.insert(*account, amount);
        }
    }

    fn total(&self) -> U256 {
        self.values().fold(U256::zero(), |acc, deposit| acc.saturating_add(*deposit))
    }
}

impl NonceOp for HashMap<(Address, U256), u64> {
    fn get_sequence(&self, sender: &Address, key: &U256) -> u64 {
        self.get(&(*sender, *key)).copied().unwrap_or_default()
    }

    fn set_sequence(&mut self, sender: &Address, key: &U256, sequence: u64) {
        self.insert((*sender, *key), sequence);
    }
}
