use crate::error::ValidationError;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use vela_primitives::UserOperationHash;

/// Events emitted by the entry point, in emission order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EntryPointEvent {
    #[serde(rename_all = "camelCase")]
    Deposited { account: Address, total_deposit: U256 },

    #[serde(rename_all = "camelCase")]
    Withdrawn { account: Address, withdraw_address: Address, amount: U256 },

    /// An account was deployed through the `initCode` of a user operation
    #[serde(rename_all = "camelCase")]
    AccountDeployed {
        user_op_hash: UserOperationHash,
        sender: Address,
        factory: Address,
        /// Zero address if the operation is self-funded
        paymaster: Address,
    },

    /// A user operation was executed (successfully or not) and settled
    #[serde(rename_all = "camelCase")]
    UserOperationEvent {
        user_op_hash: UserOperationHash,
        sender: Address,
        paymaster: Address,
        nonce: U256,
        success: bool,
        actual_gas_cost: U256,
        actual_gas_used: U256,
    },

    #[serde(rename_all = "camelCase")]
    UserOperationRevertReason {
        user_op_hash: UserOperationHash,
        sender: Address,
        nonce: U256,
        revert_reason: String,
    },

    /// The paymaster post-operation hook failed; the user operation was settled anyway
    #[serde(rename_all = "camelCase")]
    PostOpRevertReason {
        user_op_hash: UserOperationHash,
        sender: Address,
        nonce: U256,
        revert_reason: String,
    },
}

/// Final status of one user operation of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UserOperationStatus {
    /// Validated and executed; the account call succeeded
    Succeeded,
    /// Validated, but the account call reverted (fees are still charged)
    Reverted { reason: String },
    /// Rejected during verification; nothing was executed or charged
    Rejected { reason: ValidationError },
}

/// Result of one user operation of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationResult {
    /// Position in the batch
    pub index: usize,
    pub user_op_hash: UserOperationHash,
    pub sender: Address,
    pub nonce: U256,
    pub paymaster: Option<Address>,
    pub status: UserOperationStatus,
    /// Gas charged (zero for rejected operations)
    pub actual_gas_used: U256,
    /// Amount debited from the payer and paid to the beneficiary
    pub actual_gas_cost: U256,
    /// Failure of the paymaster post-operation hook, if any
    pub post_op_revert_reason: Option<String>,
}

impl UserOperationResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, UserOperationStatus::Succeeded)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.status, UserOperationStatus::Rejected { .. })
    }

    pub fn rejection(&self) -> Option<&ValidationError> {
        match &self.status {
            UserOperationStatus::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Result of `handleOps`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleOpsOutcome {
    pub beneficiary: Address,
    /// One result per submitted user operation, in batch order
    pub results: Vec<UserOperationResult>,
    pub total_gas_used: U256,
    /// Amount paid to the beneficiary
    pub collected: U256,
}
