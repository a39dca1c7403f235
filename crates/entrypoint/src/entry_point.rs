use crate::{
    error::{EntryPointError, EntryPointResult, ValidationError},
    executor::{ExecutionContext, Executor},
    ledger::Ledger,
    state::WorldState,
    types::{EntryPointEvent, HandleOpsOutcome, UserOperationResult, UserOperationStatus},
};
use alloy_chains::Chain;
use ethers::{
    abi::{AbiDecode, AbiEncode},
    types::{Address, Bytes, U256},
};
use tracing::{debug, info, trace, warn};
use vela_contracts::{
    entry_point_api::HandleOpsCall, gas, simple_account_factory_api::GetAddressCall,
    utils::decode_address, AccountError, CallEnv, Contract, PaymasterError, Revert,
};
use vela_primitives::{
    constants::{dev, entry_point},
    BlockContext, PackedUserOperation, PostOpMode, UserOperation, UserOperationHash,
    UserOperationSigned, ValidationData,
};

/// Gas available to calls made outside of a batch (setup calls and views)
const EXTERNAL_CALL_GAS_LIMIT: u64 = 30_000_000;

/// Entry point deployment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPointConfig {
    /// Address of the entry point (part of every user operation hash)
    pub address: Address,
    /// Chain the entry point is deployed on (part of every user operation hash)
    pub chain: Chain,
}

impl Default for EntryPointConfig {
    fn default() -> Self {
        Self {
            address: Address::from(entry_point::ADDRESS_BYTES),
            chain: Chain::from_id(dev::CHAIN_ID),
        }
    }
}

/// Result of verifying one user operation
struct Verified {
    /// Worst-case cost escrowed from the payer
    prefund: U256,
    verification_gas_used: U256,
    sponsorship: Option<Sponsorship>,
}

struct Sponsorship {
    paymaster: Address,
    context: Bytes,
    gas_used: U256,
}

/// Why verification of a user operation stopped
enum Fault {
    /// The operation is dropped, the batch continues
    Rejected(ValidationError),
    /// The batch is aborted
    Fatal(EntryPointError),
}

impl From<ValidationError> for Fault {
    fn from(err: ValidationError) -> Self {
        Fault::Rejected(err)
    }
}

impl From<EntryPointError> for Fault {
    fn from(err: EntryPointError) -> Self {
        Fault::Fatal(err)
    }
}

/// The entry point: the only writer of deposits and nonces
///
/// Holds the world state the accounts, factories and paymasters live in. Every batch runs
/// against it sequentially, each user operation in two phases:
/// - verification (account deployment, account validation, nonce, prefund escrow and paymaster
///   validation), fully rolled back if the operation is rejected;
/// - execution of the account call and the paymaster post-operation hook, followed by
///   settlement: the payer gets back the escrow minus the actual cost, which goes to the
///   beneficiary at the end of the batch.
#[derive(Clone, Debug)]
pub struct EntryPoint {
    config: EntryPointConfig,
    block: BlockContext,
    state: WorldState,
    events: Vec<EntryPointEvent>,
}

impl EntryPoint {
    pub fn new(config: EntryPointConfig) -> Self {
        Self::with_ledger(config, Ledger::default())
    }

    /// Entry point with a custom deposits and nonces store
    pub fn with_ledger(config: EntryPointConfig, ledger: Ledger) -> Self {
        Self {
            config,
            block: BlockContext::default(),
            state: WorldState::new(ledger),
            events: vec![],
        }
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain.id()
    }

    pub fn block(&self) -> BlockContext {
        self.block
    }

    /// Sets the block values seen by the next calls
    pub fn set_block(&mut self, block: BlockContext) {
        self.block = block;
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Events emitted so far
    pub fn events(&self) -> &[EntryPointEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<EntryPointEvent> {
        std::mem::take(&mut self.events)
    }

    /// Deploys a contract directly (environment setup)
    pub fn deploy(&mut self, address: Address, code: Box<dyn Contract>) -> EntryPointResult<()> {
        Ok(self.state.deploy(address, code)?)
    }

    /// Sets the native balance of an account (environment setup)
    pub fn set_balance(&mut self, account: Address, amount: U256) {
        self.state.set_balance(account, amount);
    }

    pub fn balance(&self, account: &Address) -> U256 {
        self.state.balance(account)
    }

    /// Contract deployed at `address`, downcast to its concrete type
    pub fn contract<T: 'static>(&self, address: &Address) -> Option<&T> {
        self.state.contract::<T>(address)
    }

    /// Sends a transaction from `from` to `to` outside of any batch
    ///
    /// # Returns
    /// * `Ok(Bytes)` - Return data of the call
    /// * `Err(EntryPointError)` - If the call reverted; nothing it changed is kept
    pub fn call(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> EntryPointResult<Bytes> {
        let ctx = self.context();
        let mut exec = Executor::new(&mut self.state, ctx, EXTERNAL_CALL_GAS_LIMIT.into());
        let result = exec.call_from(from, to, value, data);
        let report = exec.finish();
        let data = result?;
        self.events.extend(report.events);
        Ok(data)
    }

    /// Credits `amount` from the native balance of `from` to the deposit of `account`
    ///
    /// # Returns
    /// * `Ok(U256)` - The new deposit of `account`
    /// * `Err(EntryPointError)` - If `from` cannot pay or the deposit overflows
    pub fn deposit_to(
        &mut self,
        from: Address,
        account: Address,
        amount: U256,
    ) -> EntryPointResult<U256> {
        let mut state = self.state.clone();
        state.transfer(from, self.address(), amount)?;
        let total_deposit = state.ledger_mut().credit(&account, amount)?;
        self.state = state;

        debug!("Deposited {amount} for {account:?}, total deposit {total_deposit}");
        self.events.push(EntryPointEvent::Deposited { account, total_deposit });
        Ok(total_deposit)
    }

    /// Deposit of an account
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.state.ledger().balance_of(account)
    }

    /// Withdraws `amount` from the deposit of `account` to `withdraw_address`
    pub fn withdraw_to(
        &mut self,
        account: Address,
        withdraw_address: Address,
        amount: U256,
    ) -> EntryPointResult<()> {
        let mut state = self.state.clone();
        state.ledger_mut().debit(&account, amount)?;
        state.transfer(self.address(), withdraw_address, amount)?;
        self.state = state;

        debug!("Withdrawn {amount} from {account:?} to {withdraw_address:?}");
        self.events.push(EntryPointEvent::Withdrawn { account, withdraw_address, amount });
        Ok(())
    }

    /// Nonce the next user operation of `sender` with nonce key `key` must carry
    pub fn get_nonce(&self, sender: &Address, key: U256) -> U256 {
        self.state.ledger().get_nonce(sender, &key)
    }

    /// Hash of a user operation for this entry point and chain
    pub fn get_user_op_hash(&self, uo: &UserOperationSigned) -> EntryPointResult<UserOperationHash> {
        uo.hash(&self.address(), self.chain_id())
            .map_err(|inner| EntryPointError::Encoding { index: 0, inner })
    }

    /// Address the factory would deploy the account of `owner` with sequence `seq` at
    ///
    /// Queries the factory on a copy of the state, so it works whether or not the account exists.
    pub fn compute_address(
        &self,
        factory: Address,
        owner: Address,
        seq: U256,
    ) -> EntryPointResult<Address> {
        let data = GetAddressCall { owner, salt: seq }.encode();
        let ret = self.view(factory, data.into())?;
        Ok(decode_address(&ret)?)
    }

    /// Address of the account `factory_data` would deploy when sent to `factory`
    ///
    /// Runs the deployment on a copy of the state; nothing is kept.
    pub fn get_sender_address(
        &self,
        factory: Address,
        factory_data: Bytes,
    ) -> EntryPointResult<Address> {
        let ret = self.view(factory, factory_data)?;
        Ok(decode_address(&ret)?)
    }

    /// Calls `to` from the entry point on a throwaway copy of the state
    fn view(&self, to: Address, data: Bytes) -> EntryPointResult<Bytes> {
        if !self.state.has_code(&to) {
            return Err(Revert::Reason(format!("no contract deployed at {to:?}")).into());
        }
        let mut state = self.state.clone();
        let mut exec = Executor::new(&mut state, self.context(), EXTERNAL_CALL_GAS_LIMIT.into());
        Ok(exec.call(to, U256::zero(), data)?)
    }

    /// Decodes `handleOps(PackedUserOperation[],address)` calldata and runs the batch
    pub fn handle_ops_calldata(&mut self, data: &[u8]) -> EntryPointResult<HandleOpsOutcome> {
        let call = HandleOpsCall::decode(data)
            .map_err(|err| EntryPointError::Malformed { inner: err.to_string() })?;
        let ops: Vec<PackedUserOperation> =
            call.ops.into_iter().map(PackedUserOperation::from).collect();
        self.handle_packed_ops(&ops, call.beneficiary)
    }

    /// Runs a batch of user operations in their wire layout
    pub fn handle_packed_ops(
        &mut self,
        ops: &[PackedUserOperation],
        beneficiary: Address,
    ) -> EntryPointResult<HandleOpsOutcome> {
        let ops = ops
            .iter()
            .enumerate()
            .map(|(index, uo)| {
                uo.unpack().map_err(|err| EntryPointError::Malformed {
                    inner: format!("user operation {index}: {err}"),
                })
            })
            .collect::<EntryPointResult<Vec<_>>>()?;
        self.handle_ops(&ops, beneficiary)
    }

    /// Runs a batch of user operations and pays the collected fees to `beneficiary`
    ///
    /// # Arguments
    /// * `ops` - The user operations, executed in order
    /// * `beneficiary` - Receiver of the fees
    ///
    /// # Returns
    /// * `Ok(HandleOpsOutcome)` - One result per user operation (succeeded, reverted or
    ///   rejected with its reason)
    /// * `Err(EntryPointError)` - If an operation cannot be encoded, its prefund overflows or a
    ///   contract re-entered `handleOps`; the state is left as it was before the call
    pub fn handle_ops(
        &mut self,
        ops: &[UserOperationSigned],
        beneficiary: Address,
    ) -> EntryPointResult<HandleOpsOutcome> {
        info!("Handling batch of {} user operations, beneficiary {:?}", ops.len(), beneficiary);

        let mut prepared = Vec::with_capacity(ops.len());
        for (index, uo) in ops.iter().enumerate() {
            let hash = uo
                .hash(&self.address(), self.chain_id())
                .map_err(|inner| EntryPointError::Encoding { index, inner })?;
            let prefund =
                uo.required_prefund().ok_or(EntryPointError::PrefundOverflow { index })?;
            prepared.push((UserOperation::from_user_operation_signed(hash, uo.clone()), prefund));
        }

        let snapshot = self.state.clone();
        let events = self.events.len();
        match self.run_batch(prepared, beneficiary) {
            Ok(outcome) => {
                info!(
                    "Batch handled: {} succeeded, {} reverted, {} rejected, {} paid to {:?}",
                    outcome.results.iter().filter(|res| res.is_success()).count(),
                    outcome
                        .results
                        .iter()
                        .filter(|res| !res.is_success() && !res.is_rejected())
                        .count(),
                    outcome.results.iter().filter(|res| res.is_rejected()).count(),
                    outcome.collected,
                    beneficiary
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!("Batch aborted: {err}");
                self.state = snapshot;
                self.events.truncate(events);
                Err(err)
            }
        }
    }

    fn run_batch(
        &mut self,
        prepared: Vec<(UserOperation, U256)>,
        beneficiary: Address,
    ) -> EntryPointResult<HandleOpsOutcome> {
        let mut results = Vec::with_capacity(prepared.len());
        let mut collected = U256::zero();
        let mut total_gas_used = U256::zero();

        for (index, (uo, prefund)) in prepared.into_iter().enumerate() {
            let result = self.handle_op(index, &uo, prefund)?;
            collected = collected.saturating_add(result.actual_gas_cost);
            total_gas_used = total_gas_used.saturating_add(result.actual_gas_used);
            results.push(result);
        }

        self.state.transfer(self.address(), beneficiary, collected)?;
        Ok(HandleOpsOutcome { beneficiary, results, total_gas_used, collected })
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext {
            entry_point: self.address(),
            chain_id: self.chain_id(),
            block: self.block,
        }
    }

    fn handle_op(
        &mut self,
        index: usize,
        uo: &UserOperation,
        prefund: U256,
    ) -> EntryPointResult<UserOperationResult> {
        let checkpoint = self.state.clone();
        let events = self.events.len();

        match self.verify(uo, prefund) {
            Ok(verified) => {
                debug!("User operation {:?} from {:?} verified", uo.hash, uo.sender);
                self.execute(index, uo, verified)
            }
            Err(Fault::Rejected(reason)) => {
                debug!(
                    "User operation {:?} from {:?} rejected ({}): {reason}",
                    uo.hash,
                    uo.sender,
                    reason.code()
                );
                self.state = checkpoint;
                self.events.truncate(events);
                Ok(UserOperationResult {
                    index,
                    user_op_hash: uo.hash,
                    sender: uo.sender,
                    nonce: uo.nonce,
                    paymaster: uo.paymaster(),
                    status: UserOperationStatus::Rejected { reason },
                    actual_gas_used: U256::zero(),
                    actual_gas_cost: U256::zero(),
                    post_op_revert_reason: None,
                })
            }
            Err(Fault::Fatal(err)) => Err(err),
        }
    }

    fn verify(&mut self, uo: &UserOperation, prefund: U256) -> Result<Verified, Fault> {
        let ctx = self.context();
        let paymaster = uo.paymaster();

        let mut exec = Executor::new(&mut self.state, ctx, uo.verification_gas_limit);
        let validation = validate_account(&mut exec, uo, prefund, paymaster.is_none());
        let report = exec.finish();
        if report.reentered {
            return Err(EntryPointError::Reentrancy.into());
        }
        let validation = validation?;
        self.events.extend(report.events);
        let verification_gas_used = report.gas_used;

        if !validation.is_valid_at(self.block.timestamp) {
            return Err(ValidationError::Expired {
                valid_after: validation.valid_after,
                valid_until: validation.valid_until,
            }
            .into());
        }

        let sponsorship = match paymaster {
            None => None,
            Some(paymaster) => {
                let mut exec =
                    Executor::new(&mut self.state, ctx, uo.paymaster_verification_gas_limit);
                let sponsored = validate_paymaster(&mut exec, uo, paymaster, prefund);
                let report = exec.finish();
                if report.reentered {
                    return Err(EntryPointError::Reentrancy.into());
                }
                let (context, validation) = sponsored?;
                self.events.extend(report.events);

                if !validation.is_valid_at(self.block.timestamp) {
                    return Err(ValidationError::PaymasterRejected {
                        paymaster,
                        reason: format!(
                            "AA32 paymaster expired or not due: valid after {}, valid until {}",
                            validation.valid_after, validation.valid_until
                        ),
                    }
                    .into());
                }
                Some(Sponsorship { paymaster, context, gas_used: report.gas_used })
            }
        };

        Ok(Verified { prefund, verification_gas_used, sponsorship })
    }

    fn execute(
        &mut self,
        index: usize,
        uo: &UserOperation,
        verified: Verified,
    ) -> EntryPointResult<UserOperationResult> {
        let ctx = self.context();

        let mut exec = Executor::new(&mut self.state, ctx, uo.call_gas_limit);
        let outcome = if uo.call_data.is_empty() {
            Ok(Bytes::default())
        } else {
            exec.call(uo.sender, U256::zero(), uo.call_data.clone())
        };
        let report = exec.finish();
        if report.reentered {
            return Err(EntryPointError::Reentrancy);
        }
        self.events.extend(report.events);

        let mut actual_gas = uo
            .pre_verification_gas
            .saturating_add(verified.verification_gas_used)
            .saturating_add(report.gas_used);
        if let Some(sponsorship) = &verified.sponsorship {
            actual_gas = actual_gas.saturating_add(sponsorship.gas_used);
        }

        let status = match outcome {
            Ok(_) => UserOperationStatus::Succeeded,
            Err(err) => {
                debug!("User operation {:?} from {:?} reverted: {err}", uo.hash, uo.sender);
                self.events.push(EntryPointEvent::UserOperationRevertReason {
                    user_op_hash: uo.hash,
                    sender: uo.sender,
                    nonce: uo.nonce,
                    revert_reason: err.to_string(),
                });
                UserOperationStatus::Reverted { reason: err.to_string() }
            }
        };

        let gas_price = uo.gas_price(self.block.base_fee);
        let mut post_op_revert_reason = None;
        if let Some(sponsorship) = &verified.sponsorship {
            let mode = match status {
                UserOperationStatus::Succeeded => PostOpMode::Success,
                _ => PostOpMode::Reverted,
            };
            let actual_gas_cost = actual_gas.saturating_mul(gas_price);
            let checkpoint = self.state.clone();

            let mut exec = Executor::new(&mut self.state, ctx, uo.paymaster_post_op_gas_limit);
            let result = exec
                .with_contract(sponsorship.paymaster, |contract, env| {
                    match contract.as_paymaster() {
                        Some(paymaster) => paymaster.post_op(
                            env,
                            mode,
                            &sponsorship.context,
                            actual_gas_cost,
                            gas_price,
                        ),
                        None => Err(Revert::Reason("not a paymaster".into())),
                    }
                })
                .and_then(|res| res);
            let report = exec.finish();
            if report.reentered {
                return Err(EntryPointError::Reentrancy);
            }
            actual_gas = actual_gas.saturating_add(report.gas_used);

            match result {
                Ok(()) => self.events.extend(report.events),
                Err(err) => {
                    warn!(
                        "Paymaster {:?} postOp failed for user operation {:?}: {err}",
                        sponsorship.paymaster, uo.hash
                    );
                    self.state = checkpoint;
                    self.events.push(EntryPointEvent::PostOpRevertReason {
                        user_op_hash: uo.hash,
                        sender: uo.sender,
                        nonce: uo.nonce,
                        revert_reason: err.to_string(),
                    });
                    post_op_revert_reason = Some(err.to_string());
                }
            }
        }

        let actual_gas_cost = actual_gas.saturating_mul(gas_price).min(verified.prefund);
        let paymaster = verified.sponsorship.as_ref().map(|sponsorship| sponsorship.paymaster);
        let payer = paymaster.unwrap_or(uo.sender);
        self.state.ledger_mut().credit(&payer, verified.prefund - actual_gas_cost)?;
        trace!(
            "Settled user operation {:?}: gas {actual_gas}, cost {actual_gas_cost}, payer {:?}",
            uo.hash,
            payer
        );

        self.events.push(EntryPointEvent::UserOperationEvent {
            user_op_hash: uo.hash,
            sender: uo.sender,
            paymaster: paymaster.unwrap_or_default(),
            nonce: uo.nonce,
            success: matches!(status, UserOperationStatus::Succeeded),
            actual_gas_cost,
            actual_gas_used: actual_gas,
        });

        Ok(UserOperationResult {
            index,
            user_op_hash: uo.hash,
            sender: uo.sender,
            nonce: uo.nonce,
            paymaster,
            status,
            actual_gas_used: actual_gas,
            actual_gas_cost,
            post_op_revert_reason,
        })
    }
}

/// Deploys the account if needed, validates it, escrows a self-funded prefund and consumes the
/// nonce
fn validate_account(
    exec: &mut Executor,
    uo: &UserOperation,
    prefund: U256,
    self_funded: bool,
) -> Result<ValidationData, ValidationError> {
    let sender = uo.sender;

    if let Some(factory) = uo.factory() {
        if !exec.has_code(&factory) {
            return Err(ValidationError::InitCodeFailed {
                reason: format!("factory {factory:?} not deployed"),
            });
        }
        let existed = exec.has_code(&sender);
        let created = exec
            .call(factory, U256::zero(), uo.factory_data.clone())
            .and_then(|ret| decode_address(&ret))
            .map_err(|err| match err {
                Revert::OutOfGas => ValidationError::VerificationGasExceeded,
                err => ValidationError::InitCodeFailed { reason: err.to_string() },
            })?;
        if created != sender {
            return Err(ValidationError::InitCodeFailed {
                reason: format!("AA14 initCode must return sender, returned {created:?}"),
            });
        }
        if !exec.has_code(&sender) {
            return Err(ValidationError::InitCodeFailed {
                reason: "AA15 initCode must create sender".into(),
            });
        }
        if !existed {
            trace!("Account {sender:?} deployed by factory {factory:?}");
            exec.emit(EntryPointEvent::AccountDeployed {
                user_op_hash: uo.hash,
                sender,
                factory,
                paymaster: uo.paymaster,
            });
        }
    } else if !exec.has_code(&sender) {
        return Err(ValidationError::AccountNotDeployed { sender });
    }

    let missing_account_funds = if self_funded {
        prefund.saturating_sub(exec.deposit_of(&sender))
    } else {
        U256::zero()
    };
    let uo_hash = uo.hash;
    let validation = exec
        .with_contract(sender, |contract, env| match contract.as_account() {
            Some(account) => account.validate_user_op(env, uo, &uo_hash, missing_account_funds),
            None => Err(Revert::Reason(format!("{sender:?} is not an account")).into()),
        })
        .map_err(AccountError::from)
        .and_then(|res| res)
        .map_err(|err| match err {
            AccountError::AuthorizationFailed => ValidationError::AuthorizationFailed,
            AccountError::PrefundInsufficient { missing, balance } => {
                ValidationError::PrefundInsufficient { required: missing, available: balance }
            }
            AccountError::Revert(Revert::OutOfGas) => ValidationError::VerificationGasExceeded,
            AccountError::Revert(err) => ValidationError::AccountReverted { reason: err.to_string() },
        })?;

    if self_funded {
        let deposit = exec.deposit_of(&sender);
        exec.state_mut().ledger_mut().debit(&sender, prefund).map_err(|_| {
            ValidationError::PrefundInsufficient { required: prefund, available: deposit }
        })?;
    }

    exec.charge_gas(gas::SSTORE_UPDATE).map_err(|_| ValidationError::VerificationGasExceeded)?;
    exec.state_mut().ledger_mut().validate_and_update_nonce(&sender, uo.nonce)?;

    Ok(validation)
}

/// Validates the paymaster and escrows the prefund from its deposit
fn validate_paymaster(
    exec: &mut Executor,
    uo: &UserOperation,
    paymaster: Address,
    prefund: U256,
) -> Result<(Bytes, ValidationData), ValidationError> {
    let rejected = |reason: String| ValidationError::PaymasterRejected { paymaster, reason };

    if !exec.has_code(&paymaster) {
        return Err(rejected("AA30 paymaster not deployed".into()));
    }

    let uo_hash = uo.hash;
    let (context, validation) = exec
        .with_contract(paymaster, |contract, env| match contract.as_paymaster() {
            Some(sponsor) => sponsor.validate_paymaster_user_op(env, uo, &uo_hash, prefund),
            None => Err(Revert::Reason(format!("{paymaster:?} is not a paymaster")).into()),
        })
        .map_err(PaymasterError::from)
        .and_then(|res| res)
        .map_err(|err| match err {
            PaymasterError::Revert(Revert::OutOfGas) => {
                rejected("AA36 over paymasterVerificationGasLimit".into())
            }
            PaymasterError::DepositTooLow { deposit, max_cost } => {
                rejected(format!("AA31 paymaster deposit too low: {deposit} < {max_cost}"))
            }
            err => rejected(format!("AA33 reverted: {err}")),
        })?;

    let deposit = exec.deposit_of(&paymaster);
    exec.state_mut()
        .ledger_mut()
        .debit(&paymaster, prefund)
        .map_err(|_| rejected(format!("AA31 paymaster deposit too low: {deposit} < {prefund}")))?;

    Ok((context, validation))
}
