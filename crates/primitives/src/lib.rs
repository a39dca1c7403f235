//! Account abstraction (ERC-4337) primitive types
//!
//! This crate contains Account abstraction (ERC-4337) primitive types and helper functions.

pub mod constants;
pub mod entrypoint;
mod user_operation;
pub mod utils;
mod wallet;

pub use entrypoint::{BlockContext, PostOpMode, ValidationData};
pub use user_operation::{
    PackedUserOperation, UserOperation, UserOperationHash, UserOperationSigned,
};
pub use utils::{get_address, PackError};
pub use wallet::Wallet;
