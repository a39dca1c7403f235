//! Paymasters sponsoring user operations

use crate::{
    env::{CallEnv, CallMessage, Contract},
    error::{PaymasterError, Revert},
    gas,
    gen::{
        entry_point_api::{DepositToCall, WithdrawToCall},
        sponsor_paymaster_api::SponsorPaymasterAPICalls,
    },
    utils::{decode_address, decode_call, decode_validity},
};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use std::{any::Any, collections::HashMap};
use vela_primitives::{PostOpMode, UserOperationHash, UserOperationSigned, ValidationData};

/// Paymaster capability invoked by the entry point
pub trait Paymaster {
    /// Decides whether to sponsor a user operation
    ///
    /// # Arguments
    /// * `env` - The execution environment
    /// * `uo` - The [UserOperationSigned](UserOperationSigned) to sponsor
    /// * `uo_hash` - Its hash
    /// * `max_cost` - Worst-case cost escrowed from the paymaster deposit
    ///
    /// # Returns
    /// * `Ok((Bytes, ValidationData))` - Context passed to [Paymaster::post_op] and the time
    ///   window of the sponsorship
    /// * `Err(PaymasterError)` - If the operation is not sponsored
    fn validate_paymaster_user_op(
        &mut self,
        env: &mut dyn CallEnv,
        uo: &UserOperationSigned,
        uo_hash: &UserOperationHash,
        max_cost: U256,
    ) -> Result<(Bytes, ValidationData), PaymasterError>;

    /// Final accounting after execution, with the real cost of the operation
    fn post_op(
        &mut self,
        env: &mut dyn CallEnv,
        mode: PostOpMode,
        context: &Bytes,
        actual_gas_cost: U256,
        actual_user_op_fee_per_gas: U256,
    ) -> Result<(), Revert>;
}

/// Who a [SponsorPaymaster] pays for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SponsorPolicy {
    /// Every sender
    Open,
    /// Senders with a remaining allowance covering the worst-case cost
    Allowance(HashMap<Address, U256>),
}

/// Paymaster paying from its own deposit for senders admitted by its policy
///
/// `paymasterData` is either empty or `abi.encode(uint48 validUntil, uint48 validAfter)`
/// limiting when the sponsorship may be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsorPaymaster {
    owner: Address,
    policy: SponsorPolicy,
    spent: HashMap<Address, U256>,
}

impl SponsorPaymaster {
    pub fn new(owner: Address, policy: SponsorPolicy) -> Self {
        Self { owner, policy, spent: HashMap::new() }
    }

    /// Paymaster sponsoring every sender
    pub fn open(owner: Address) -> Self {
        Self::new(owner, SponsorPolicy::Open)
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Remaining allowance of the sender, `U256::MAX` under an open policy
    pub fn allowance(&self, sender: &Address) -> U256 {
        match &self.policy {
            SponsorPolicy::Open => U256::MAX,
            SponsorPolicy::Allowance(allowances) => {
                allowances.get(sender).copied().unwrap_or_default()
            }
        }
    }

    /// Total cost paid on behalf of the sender
    pub fn spent(&self, sender: &Address) -> U256 {
        self.spent.get(sender).copied().unwrap_or_default()
    }

    fn require_owner(&self, caller: Address) -> Result<(), Revert> {
        if caller != self.owner {
            return Err(Revert::Unauthorized { caller });
        }
        Ok(())
    }
}

impl Paymaster for SponsorPaymaster {
    fn validate_paymaster_user_op(
        &mut self,
        env: &mut dyn CallEnv,
        uo: &UserOperationSigned,
        _uo_hash: &UserOperationHash,
        max_cost: U256,
    ) -> Result<(Bytes, ValidationData), PaymasterError> {
        env.charge_gas(2 * gas::SLOAD)?;

        let deposit = env.deposit_of(&env.address());
        if deposit < max_cost {
            return Err(PaymasterError::DepositTooLow { deposit, max_cost });
        }

        if let SponsorPolicy::Allowance(allowances) = &self.policy {
            match allowances.get(&uo.sender) {
                None => return Err(PaymasterError::SenderNotAllowed { sender: uo.sender }),
                Some(allowance) if *allowance < max_cost => {
                    return Err(PaymasterError::AllowanceExceeded {
                        sender: uo.sender,
                        allowance: *allowance,
                        max_cost,
                    })
                }
                Some(_) => {}
            }
        }

        let validation = decode_validity(&uo.paymaster_data)?;
        Ok((uo.sender.encode().into(), validation))
    }

    fn post_op(
        &mut self,
        env: &mut dyn CallEnv,
        _mode: PostOpMode,
        context: &Bytes,
        actual_gas_cost: U256,
        _actual_user_op_fee_per_gas: U256,
    ) -> Result<(), Revert> {
        env.charge_gas(gas::SLOAD + gas::SSTORE_UPDATE)?;
        let sender = decode_address(context)?;

        if let SponsorPolicy::Allowance(allowances) = &mut self.policy {
            if let Some(allowance) = allowances.get_mut(&sender) {
                *allowance = allowance.saturating_sub(actual_gas_cost);
            }
        }
        let spent = self.spent.entry(sender).or_default();
        *spent = spent.saturating_add(actual_gas_cost);

        Ok(())
    }
}

impl Contract for SponsorPaymaster {
    fn call(&mut self, env: &mut dyn CallEnv, msg: &CallMessage) -> Result<Bytes, Revert> {
        if msg.data.is_empty() {
            return Ok(Bytes::default());
        }

        match decode_call::<SponsorPaymasterAPICalls>(&msg.data)? {
            SponsorPaymasterAPICalls::Deposit(_) => {
                let entry_point = env.entry_point();
                let data = DepositToCall { account: env.address() }.encode();
                env.call(entry_point, msg.value, data.into())
            }
            SponsorPaymasterAPICalls::SetAllowance(call) => {
                self.require_owner(msg.caller)?;
                env.charge_gas(gas::SSTORE_SET)?;
                match &mut self.policy {
                    SponsorPolicy::Open => {
                        Err(Revert::Reason("sponsor policy is open".into()))
                    }
                    SponsorPolicy::Allowance(allowances) => {
                        allowances.insert(call.sender, call.amount);
                        Ok(Bytes::default())
                    }
                }
            }
            SponsorPaymasterAPICalls::Allowance(call) => {
                env.charge_gas(gas::SLOAD)?;
                Ok(self.allowance(&call.sender).encode().into())
            }
            SponsorPaymasterAPICalls::WithdrawTo(call) => {
                self.require_owner(msg.caller)?;
                let entry_point = env.entry_point();
                let data = WithdrawToCall {
                    withdraw_address: call.withdraw_address,
                    withdraw_amount: call.amount,
                }
                .encode();
                env.call(entry_point, U256::zero(), data.into())
            }
        }
    }

    fn as_paymaster(&mut self) -> Option<&mut dyn Paymaster> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
