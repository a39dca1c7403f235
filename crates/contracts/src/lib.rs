//! Account abstraction (ERC-4337) contracts
//!
//! Accounts, the account factory and paymasters the entry point validates and executes user
//! operations against, together with the execution environment interface they run in.

pub mod account;
mod env;
mod error;
pub mod factory;
pub mod gas;
mod gen;
pub mod paymaster;
pub mod targets;
pub mod utils;

pub use account::{Account, SimpleAccount};
pub use env::{CallEnv, CallMessage, Contract};
pub use error::{AccountError, PaymasterError, Revert};
pub use factory::{get_address, SimpleAccountFactory};
pub use gen::{
    counter_api, entry_point_api, sample_token_api, simple_account_api,
    simple_account_factory_api, sponsor_paymaster_api, SELECTORS_NAMES,
};
pub use paymaster::{Paymaster, SponsorPaymaster, SponsorPolicy};
pub use targets::{Counter, SampleToken};
