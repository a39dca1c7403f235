use ethers::types::{Address, Bytes, U256};
use thiserror::Error;

/// Failure of a message call; the callee's state changes are rolled back
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Revert {
    /// The gas budget of the current phase is exhausted
    #[error("out of gas")]
    OutOfGas,

    /// Value transfer exceeds the sender's balance
    #[error("insufficient balance of {account:?}: {balance} < {required}")]
    InsufficientBalance {
        /// Account being debited
        account: Address,
        /// Its balance
        balance: U256,
        /// Amount required
        required: U256,
    },

    /// Caller is not allowed to call the function
    #[error("caller {caller:?} is not authorized")]
    Unauthorized {
        /// The caller
        caller: Address,
    },

    /// Calldata does not match any function of the callee
    #[error("unknown function selector {selector}")]
    UnknownSelector {
        /// First four bytes of the calldata
        selector: Bytes,
    },

    /// ABI encoding or decoding failed
    #[error("abi error: {inner}")]
    Abi {
        /// The inner error message
        inner: String,
    },

    /// Call into a contract that is already executing
    #[error("re-entrant call into {address:?}")]
    Reentrancy {
        /// The contract on the call stack
        address: Address,
    },

    /// Nested calls exceed the maximum depth
    #[error("call depth exceeded")]
    CallDepthExceeded,

    /// Contract creation at an address that already holds code
    #[error("address {address:?} already in use")]
    AddressInUse {
        /// The address
        address: Address,
    },

    /// Revert with a reason string
    #[error("{0}")]
    Reason(String),
}

/// Account validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// The signature does not recover to the account owner
    #[error("signature does not match the account owner")]
    AuthorizationFailed,

    /// The account cannot pay the missing prefund to the entry point
    #[error("account cannot prefund {missing}, balance is {balance}")]
    PrefundInsufficient {
        /// Missing funds requested by the entry point
        missing: U256,
        /// Account balance
        balance: U256,
    },

    /// Validation reverted
    #[error(transparent)]
    Revert(#[from] Revert),
}

/// Paymaster validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymasterError {
    /// The paymaster deposit does not cover the worst-case cost
    #[error("paymaster deposit {deposit} is lower than max cost {max_cost}")]
    DepositTooLow {
        /// Paymaster deposit at the entry point
        deposit: U256,
        /// Worst-case cost of the user operation
        max_cost: U256,
    },

    /// The sender is not sponsored
    #[error("sender {sender:?} is not sponsored")]
    SenderNotAllowed {
        /// The sender
        sender: Address,
    },

    /// The remaining allowance of the sender does not cover the worst-case cost
    #[error("allowance {allowance} of {sender:?} is lower than max cost {max_cost}")]
    AllowanceExceeded {
        /// The sender
        sender: Address,
        /// Remaining allowance
        allowance: U256,
        /// Worst-case cost of the user operation
        max_cost: U256,
    },

    /// Validation reverted
    #[error(transparent)]
    Revert(#[from] Revert),
}
