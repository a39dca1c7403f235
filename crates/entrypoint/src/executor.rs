//! Metered execution of contract calls against the world state

use crate::{gas::GasMeter, state::WorldState, types::EntryPointEvent};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, Selector, U256},
};
use tracing::trace;
use vela_contracts::{
    entry_point_api::EntryPointAPICalls, gas, utils::decode_call, CallEnv, CallMessage, Contract,
    Revert, SELECTORS_NAMES,
};
use vela_primitives::{constants::entry_point::MAX_CALL_DEPTH, BlockContext, PackedUserOperation};

/// Values fixed for the whole batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    pub entry_point: Address,
    pub chain_id: u64,
    pub block: BlockContext,
}

/// Runs contract code for one phase of a user operation under a single gas budget
///
/// Every nested call is atomic: if it fails, the state and the events it produced are rolled
/// back before the failure is returned to the caller. Calls from contracts into the entry point
/// are served here (deposits, withdrawals, views); a call into `handleOps` is refused and marks
/// the phase as re-entered so the entry point can abort the batch.
pub struct Executor<'a> {
    state: &'a mut WorldState,
    ctx: ExecutionContext,
    meter: GasMeter,
    frames: Vec<Address>,
    events: Vec<EntryPointEvent>,
    reentered: bool,
}

/// What a phase left behind once its executor is dropped
#[derive(Debug)]
pub struct ExecutionReport {
    pub gas_used: U256,
    pub events: Vec<EntryPointEvent>,
    pub reentered: bool,
}

impl<'a> Executor<'a> {
    pub fn new(state: &'a mut WorldState, ctx: ExecutionContext, gas_limit: U256) -> Self {
        Self {
            state,
            ctx,
            meter: GasMeter::new(gas_limit),
            frames: vec![],
            events: vec![],
            reentered: false,
        }
    }

    pub fn state(&self) -> &WorldState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut WorldState {
        self.state
    }

    pub fn gas_used(&self) -> U256 {
        self.meter.used()
    }

    pub fn emit(&mut self, event: EntryPointEvent) {
        self.events.push(event);
    }

    pub fn finish(self) -> ExecutionReport {
        ExecutionReport {
            gas_used: self.meter.used(),
            events: self.events,
            reentered: self.reentered,
        }
    }

    /// Calls `to` on behalf of the externally owned account `from`
    pub fn call_from(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes, Revert> {
        self.frames.push(from);
        let result = self.call(to, value, data);
        self.frames.pop();
        result
    }

    /// Runs `f` with the contract at `address` as the executing frame, called by the entry point
    ///
    /// Used for the account and paymaster capabilities, which are not reached through calldata.
    /// Changes are kept even if `f` fails; the caller decides what to roll back.
    pub fn with_contract<R>(
        &mut self,
        address: Address,
        f: impl FnOnce(&mut dyn Contract, &mut dyn CallEnv) -> R,
    ) -> Result<R, Revert> {
        let contract = self
            .state
            .take_contract(&address)?
            .ok_or_else(|| Revert::Reason(format!("no contract deployed at {address:?}")))?;
        Ok(self.run(address, contract, |contract, env| f(contract, env as &mut dyn CallEnv)))
    }

    fn run<R>(
        &mut self,
        address: Address,
        mut contract: Box<dyn Contract>,
        f: impl FnOnce(&mut dyn Contract, &mut Self) -> R,
    ) -> R {
        self.frames.push(address);
        let result = f(&mut *contract, self);
        self.frames.pop();
        self.state.restore_contract(address, contract);
        result
    }

    fn call_contract(
        &mut self,
        caller: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes, Revert> {
        self.state.transfer(caller, to, value)?;
        match self.state.take_contract(&to)? {
            None => Ok(Bytes::default()),
            Some(contract) => {
                let msg = CallMessage { caller, value, data };
                self.run(to, contract, |contract, env| contract.call(env, &msg))
            }
        }
    }

    fn call_entry_point(
        &mut self,
        caller: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes, Revert> {
        let entry_point = self.ctx.entry_point;
        self.state.transfer(caller, entry_point, value)?;
        if data.is_empty() {
            self.deposit(caller, value)?;
            return Ok(Bytes::default());
        }

        match decode_call::<EntryPointAPICalls>(&data)? {
            EntryPointAPICalls::HandleOps(_) => {
                self.reentered = true;
                Err(Revert::Reentrancy { address: entry_point })
            }
            EntryPointAPICalls::DepositTo(call) => {
                self.deposit(call.account, value)?;
                Ok(Bytes::default())
            }
            EntryPointAPICalls::WithdrawTo(call) => {
                self.meter.charge(gas::SSTORE_UPDATE)?;
                self.state
                    .ledger_mut()
                    .debit(&caller, call.withdraw_amount)
                    .map_err(|err| Revert::Reason(err.to_string()))?;
                self.state.transfer(entry_point, call.withdraw_address, call.withdraw_amount)?;
                self.emit(EntryPointEvent::Withdrawn {
                    account: caller,
                    withdraw_address: call.withdraw_address,
                    amount: call.withdraw_amount,
                });
                Ok(Bytes::default())
            }
            EntryPointAPICalls::BalanceOf(call) => {
                self.meter.charge(gas::SLOAD)?;
                Ok(self.state.ledger().balance_of(&call.account).encode().into())
            }
            EntryPointAPICalls::GetNonce(call) => {
                self.meter.charge(gas::SLOAD)?;
                Ok(self.state.ledger().get_nonce(&call.sender, &call.key).encode().into())
            }
            EntryPointAPICalls::GetUserOpHash(call) => {
                let uo = PackedUserOperation::from(call.user_op);
                Ok(uo.hash(&entry_point, self.ctx.chain_id).0.encode().into())
            }
        }
    }

    fn deposit(&mut self, account: Address, amount: U256) -> Result<(), Revert> {
        self.meter.charge(gas::SSTORE_UPDATE)?;
        let total_deposit = self
            .state
            .ledger_mut()
            .credit(&account, amount)
            .map_err(|err| Revert::Reason(err.to_string()))?;
        self.emit(EntryPointEvent::Deposited { account, total_deposit });
        Ok(())
    }
}

impl CallEnv for Executor<'_> {
    fn address(&self) -> Address {
        self.frames.last().copied().unwrap_or(self.ctx.entry_point)
    }

    fn entry_point(&self) -> Address {
        self.ctx.entry_point
    }

    fn block(&self) -> BlockContext {
        self.ctx.block
    }

    fn balance(&self, account: &Address) -> U256 {
        self.state.balance(account)
    }

    fn has_code(&self, account: &Address) -> bool {
        self.state.has_code(account)
    }

    fn deposit_of(&self, account: &Address) -> U256 {
        self.state.ledger().balance_of(account)
    }

    fn charge_gas(&mut self, gas: u64) -> Result<(), Revert> {
        self.meter.charge(gas)
    }

    fn call(&mut self, to: Address, value: U256, data: Bytes) -> Result<Bytes, Revert> {
        let caller = self.address();
        trace!(
            "Call {:?} -> {:?} ({}), value {value}",
            caller,
            to,
            data.get(..4)
                .and_then(|selector| SELECTORS_NAMES.get(&Selector::try_from(selector).ok()?))
                .map(String::as_str)
                .unwrap_or("fallback"),
        );

        let cost = if value.is_zero() { gas::CALL } else { gas::CALL + gas::CALL_VALUE };
        self.meter.charge(cost)?;
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(Revert::CallDepthExceeded);
        }

        let checkpoint = self.state.clone();
        let events = self.events.len();
        let result = if to == self.ctx.entry_point {
            self.call_entry_point(caller, value, data)
        } else {
            self.call_contract(caller, to, value, data)
        };
        if result.is_err() {
            *self.state = checkpoint;
            self.events.truncate(events);
        }
        result
    }

    fn create(&mut self, address: Address, code: Box<dyn Contract>) -> Result<(), Revert> {
        self.meter.charge(gas::CREATE)?;
        self.state.deploy(address, code)
    }
}
