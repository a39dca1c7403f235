//! Gas schedule charged by contracts and the execution environment

/// Message call to a warm account
pub const CALL: u64 = 2_600;
/// Surcharge for a call transferring value
pub const CALL_VALUE: u64 = 9_000;
/// Contract creation
pub const CREATE: u64 = 32_000;
/// Storage read
pub const SLOAD: u64 = 2_100;
/// Storage write from zero to non-zero
pub const SSTORE_SET: u64 = 20_000;
/// Storage write of a non-zero slot
pub const SSTORE_UPDATE: u64 = 5_000;
/// Signature recovery
pub const ECRECOVER: u64 = 3_000;
/// Code deposit of a [SimpleAccount](crate::SimpleAccount)
pub const ACCOUNT_CODE_DEPOSIT: u64 = 90_000;
