use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vela_contracts::Revert;
use vela_primitives::PackError;

pub type EntryPointResult<T> = Result<T, EntryPointError>;

/// Errors aborting a whole entry point call; nothing it changed is kept
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryPointError {
    /// A user operation cannot be packed (gas values wider than 128 bits)
    #[error("user operation {index}: {inner}")]
    Encoding {
        /// Position of the user operation in the batch
        index: usize,
        /// The packing error
        inner: PackError,
    },

    /// The worst-case cost of a user operation does not fit into 256 bits
    #[error("user operation {index}: required prefund overflows")]
    PrefundOverflow {
        /// Position of the user operation in the batch
        index: usize,
    },

    /// `handleOps` calldata or a packed user operation cannot be decoded
    #[error("malformed input: {inner}")]
    Malformed {
        /// The inner error message
        inner: String,
    },

    /// A contract called back into `handleOps` while a batch was running
    #[error("re-entrant call into handleOps")]
    Reentrancy,

    /// Withdrawal larger than the deposit
    #[error("deposit of {account:?} is {deposit}, cannot withdraw {amount}")]
    InsufficientDeposit {
        /// Account withdrawing
        account: Address,
        /// Its deposit
        deposit: U256,
        /// Amount requested
        amount: U256,
    },

    /// Deposit would overflow 256 bits
    #[error("deposit of {account:?} overflows")]
    DepositOverflow {
        /// Account credited
        account: Address,
    },

    /// Setup or query reached a contract that reverted
    #[error(transparent)]
    Revert(#[from] Revert),
}

/// Reasons a single user operation is rejected during verification
///
/// A rejected operation leaves no trace in the state: its nonce, deposits and any deployment it
/// triggered are rolled back, and the rest of the batch continues.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ValidationError {
    /// `initCode` is empty and no contract is deployed at the sender
    #[error("AA20 account not deployed: {sender:?}")]
    AccountNotDeployed { sender: Address },

    /// The factory call failed or did not deploy the sender
    #[error("AA13 initCode failed: {reason}")]
    InitCodeFailed { reason: String },

    /// The prefund is not covered by the deposit of the payer
    #[error("AA21 didn't pay prefund: required {required}, available {available}")]
    PrefundInsufficient { required: U256, available: U256 },

    /// Account validation reverted
    #[error("AA23 reverted: {reason}")]
    AccountReverted { reason: String },

    /// The account's validity window does not contain the block timestamp
    #[error("AA22 expired or not due: valid after {valid_after}, valid until {valid_until}")]
    Expired { valid_after: u64, valid_until: u64 },

    /// The signature does not authorize the user operation
    #[error("AA24 signature error")]
    AuthorizationFailed,

    /// The nonce is not the next expected one for its key
    #[error("AA25 invalid account nonce: expected {expected}, got {actual}")]
    NonceInvalid { expected: U256, actual: U256 },

    /// Account validation ran out of its verification gas
    #[error("AA26 over verificationGasLimit")]
    VerificationGasExceeded,

    /// The paymaster refused, ran out of gas or cannot cover the prefund
    #[error("paymaster {paymaster:?} rejected: {reason}")]
    PaymasterRejected { paymaster: Address, reason: String },
}

impl ValidationError {
    /// Error code following the `AAxx` convention of the entry point contract
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InitCodeFailed { .. } => "AA13",
            ValidationError::AccountNotDeployed { .. } => "AA20",
            ValidationError::PrefundInsufficient { .. } => "AA21",
            ValidationError::Expired { .. } => "AA22",
            ValidationError::AccountReverted { .. } => "AA23",
            ValidationError::AuthorizationFailed => "AA24",
            ValidationError::NonceInvalid { .. } => "AA25",
            ValidationError::VerificationGasExceeded => "AA26",
            ValidationError::PaymasterRejected { .. } => "AA33",
        }
    }
}
