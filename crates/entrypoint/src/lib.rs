//! Account abstraction (ERC-4337) entry point
//!
//! Validates, executes and settles batches of user operations against an in-memory world state
//! holding the accounts, factories and paymasters they reference.

mod entry_point;
pub mod error;
mod executor;
mod gas;
mod ledger;
mod memory;
mod state;
mod types;

pub use entry_point::{EntryPoint, EntryPointConfig};
pub use error::{EntryPointError, ValidationError};
pub use executor::{ExecutionContext, ExecutionReport, Executor};
pub use gas::GasMeter;
pub use ledger::{DepositAct, DepositOp, Ledger, NonceAct, NonceOp};
pub use state::WorldState;
pub use types::{EntryPointEvent, HandleOpsOutcome, UserOperationResult, UserOperationStatus};
