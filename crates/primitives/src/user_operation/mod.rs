//! Basic transaction type for account abstraction (ERC-4337)

mod hash;
mod packed;

use crate::utils::{
    as_checksum_addr, pack_factory_data, pack_gas_fees, pack_gas_limits, pack_paymaster_data,
    split_nonce, PackError,
};
use ethers::types::{Address, Bytes, H256, U256};
pub use hash::UserOperationHash;
pub use packed::PackedUserOperation;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// User operation with hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOperation {
    /// Hash of the user operation
    pub hash: UserOperationHash,

    /// Raw user operation
    pub user_operation: UserOperationSigned,
}

impl UserOperation {
    pub fn from_user_operation_signed(
        hash: UserOperationHash,
        user_operation: UserOperationSigned,
    ) -> Self {
        Self { hash, user_operation }
    }
}

impl Deref for UserOperation {
    type Target = UserOperationSigned;

    fn deref(&self) -> &Self::Target {
        &self.user_operation
    }
}

impl AsRef<UserOperationSigned> for UserOperation {
    fn as_ref(&self) -> &UserOperationSigned {
        &self.user_operation
    }
}

impl From<UserOperation> for UserOperationSigned {
    fn from(value: UserOperation) -> Self {
        value.user_operation
    }
}

/// User operation
///
/// Every gas value is a separate integer here; they are packed into 16-byte halves only when
/// the operation is converted into a [PackedUserOperation].
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationSigned {
    /// Sender of the user operation
    #[serde(serialize_with = "as_checksum_addr")]
    pub sender: Address,

    /// Nonce (anti replay protection): 192-bit key followed by a 64-bit sequence
    pub nonce: U256,

    /// Factory deploying the account (zero address if the account already exists)
    #[serde(serialize_with = "as_checksum_addr")]
    pub factory: Address,

    /// Calldata for the factory
    pub factory_data: Bytes,

    /// The data that is passed to the sender during the main execution call
    pub call_data: Bytes,

    /// The amount of gas to allocate for the main execution call
    pub call_gas_limit: U256,

    /// The amount of gas to allocate for the verification step
    pub verification_gas_limit: U256,

    /// The amount of gas to pay bundler to compensate for the pre-verification execution and
    /// calldata
    pub pre_verification_gas: U256,

    /// Maximum fee per gas (similar to EIP-1559)
    pub max_fee_per_gas: U256,

    /// Maximum priority fee per gas (similar to EIP-1559)
    pub max_priority_fee_per_gas: U256,

    /// Paymaster sponsoring the user operation (zero address if self-funded)
    #[serde(serialize_with = "as_checksum_addr")]
    pub paymaster: Address,

    /// The amount of gas to allocate for the paymaster validation
    pub paymaster_verification_gas_limit: U256,

    /// The amount of gas to allocate for the paymaster post-operation
    pub paymaster_post_op_gas_limit: U256,

    /// Extra data to send to the paymaster
    pub paymaster_data: Bytes,

    /// Data passed to the account along with the nonce during the verification step
    pub signature: Bytes,
}

impl UserOperationSigned {
    /// Packs the user operation into the layout accepted by the entry point
    ///
    /// # Returns
    /// * `Ok(PackedUserOperation)` - The packed user operation
    /// * `Err(PackError)` - If a gas value does not fit into 128 bits
    pub fn pack(&self) -> Result<PackedUserOperation, PackError> {
        Ok(PackedUserOperation {
            sender: self.sender,
            nonce: self.nonce,
            init_code: self.init_code(),
            call_data: self.call_data.clone(),
            account_gas_limits: H256::from(pack_gas_limits(
                self.verification_gas_limit,
                self.call_gas_limit,
            )?),
            pre_verification_gas: self.pre_verification_gas,
            gas_fees: H256::from(pack_gas_fees(
                self.max_priority_fee_per_gas,
                self.max_fee_per_gas,
            )?),
            paymaster_and_data: pack_paymaster_data(
                self.paymaster,
                self.paymaster_verification_gas_limit,
                self.paymaster_post_op_gas_limit,
                &self.paymaster_data,
            )?,
            signature: self.signature.clone(),
        })
    }

    /// Calculates the hash of the user operation
    ///
    /// # Arguments
    /// * `entry_point` - The entry point the operation is submitted to
    /// * `chain_id` - The chain id
    ///
    /// # Returns
    /// * `Ok(UserOperationHash)` - The hash (signature excluded)
    /// * `Err(PackError)` - If the operation cannot be packed
    pub fn hash(&self, entry_point: &Address, chain_id: u64) -> Result<UserOperationHash, PackError> {
        Ok(self.pack()?.hash(entry_point, chain_id))
    }

    /// `initCode` as submitted on the wire (factory address followed by its calldata)
    pub fn init_code(&self) -> Bytes {
        pack_factory_data(self.factory, &self.factory_data)
    }

    /// Paymaster, if the operation is sponsored
    pub fn paymaster(&self) -> Option<Address> {
        (!self.paymaster.is_zero()).then_some(self.paymaster)
    }

    /// Factory, if the operation deploys its sender
    pub fn factory(&self) -> Option<Address> {
        (!self.factory.is_zero()).then_some(self.factory)
    }

    /// Nonce key (upper 192 bits)
    pub fn nonce_key(&self) -> U256 {
        split_nonce(self.nonce).0
    }

    /// Nonce sequence (lower 64 bits)
    pub fn nonce_sequence(&self) -> u64 {
        split_nonce(self.nonce).1
    }

    /// Worst-case cost of the operation, reserved before execution
    ///
    /// Sum of all gas limits (paymaster limits included) times `max_fee_per_gas`; `None` on
    /// overflow.
    pub fn required_prefund(&self) -> Option<U256> {
        let gas = self
            .verification_gas_limit
            .checked_add(self.call_gas_limit)?
            .checked_add(self.paymaster_verification_gas_limit)?
            .checked_add(self.paymaster_post_op_gas_limit)?
            .checked_add(self.pre_verification_gas)?;
        gas.checked_mul(self.max_fee_per_gas)
    }

    /// Effective gas price for the given base fee
    pub fn gas_price(&self, base_fee: U256) -> U256 {
        if self.max_fee_per_gas == self.max_priority_fee_per_gas {
            return self.max_fee_per_gas;
        }
        self.max_fee_per_gas.min(self.max_priority_fee_per_gas.saturating_add(base_fee))
    }

    // Builder pattern helpers

    /// Sets the sender of the user operation
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    /// Sets the nonce of the user operation
    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the factory and its calldata
    pub fn factory_and_data(mut self, factory: Address, factory_data: Bytes) -> Self {
        self.factory = factory;
        self.factory_data = factory_data;
        self
    }

    /// Sets the call data of the user operation
    pub fn call_data(mut self, call_data: Bytes) -> Self {
        self.call_data = call_data;
        self
    }

    /// Sets the call gas limit of the user operation
    pub fn call_gas_limit(mut self, call_gas_limit: U256) -> Self {
        self.call_gas_limit = call_gas_limit;
        self
    }

    /// Sets the verification gas limit of the user operation
    pub fn verification_gas_limit(mut self, verification_gas_limit: U256) -> Self {
        self.verification_gas_limit = verification_gas_limit;
        self
    }

    /// Sets the pre-verification gas of the user operation
    pub fn pre_verification_gas(mut self, pre_verification_gas: U256) -> Self {
        self.pre_verification_gas = pre_verification_gas;
        self
    }

    /// Sets the max fee per gas of the user operation
    pub fn max_fee_per_gas(mut self, max_fee_per_gas: U256) -> Self {
        self.max_fee_per_gas = max_fee_per_gas;
        self
    }

    /// Sets the max priority fee per gas of the user operation
    pub fn max_priority_fee_per_gas(mut self, max_priority_fee_per_gas: U256) -> Self {
        self.max_priority_fee_per_gas = max_priority_fee_per_gas;
        self
    }

    /// Sets the paymaster, its gas limits and data
    pub fn paymaster_and_data(
        mut self,
        paymaster: Address,
        verification_gas_limit: U256,
        post_op_gas_limit: U256,
        paymaster_data: Bytes,
    ) -> Self {
        self.paymaster = paymaster;
        self.paymaster_verification_gas_limit = verification_gas_limit;
        self.paymaster_post_op_gas_limit = post_op_gas_limit;
        self.paymaster_data = paymaster_data;
        self
    }

    /// Sets the signature of the user operation
    pub fn signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }

    /// Creates random user operation (for testing purposes)
    #[cfg(feature = "test-utils")]
    pub fn random() -> Self {
        UserOperationSigned::default()
            .sender(Address::random())
            .verification_gas_limit(100_000.into())
            .call_gas_limit(100_000.into())
            .pre_verification_gas(21_000.into())
            .max_fee_per_gas(2_000_000_000.into())
            .max_priority_fee_per_gas(1_000_000_000.into())
    }
}
