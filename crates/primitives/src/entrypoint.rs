//! Types shared by the entry point and the contracts it calls into

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Time range in which a validated user operation may be executed
///
/// `valid_until == 0` means the operation never expires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationData {
    pub valid_after: u64,
    pub valid_until: u64,
}

impl ValidationData {
    pub fn new(valid_after: u64, valid_until: u64) -> Self {
        Self { valid_after, valid_until }
    }

    /// Whether the window contains the given block timestamp
    pub fn is_valid_at(&self, timestamp: u64) -> bool {
        timestamp >= self.valid_after && (self.valid_until == 0 || timestamp <= self.valid_until)
    }
}

/// Outcome of the execution phase passed to the paymaster post-operation hook
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum PostOpMode {
    /// The account call succeeded
    Success,
    /// The account call reverted
    Reverted,
}

/// Block-level values visible to contracts during a batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContext {
    pub number: u64,
    pub timestamp: u64,
    pub base_fee: U256,
}
