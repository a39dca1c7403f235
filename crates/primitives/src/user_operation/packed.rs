use super::{UserOperationHash, UserOperationSigned};
use crate::utils::{
    as_checksum_addr, unpack_factory_data, unpack_paymaster_data, unpack_uint128, PackError,
};
use ethers::{
    abi::AbiEncode,
    contract::{EthAbiCodec, EthAbiType},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// User operation in the packed layout accepted by the entry point
///
/// Gas limits and gas fees are carried as two 16-byte big-endian halves of one word, the factory
/// address prefixes `initCode` and the paymaster address with its two gas limits prefixes
/// `paymasterAndData`. Internal logic works on [UserOperationSigned]; this form only exists at
/// the encoding boundary.
#[derive(
    Default, Clone, Debug, PartialEq, Eq, EthAbiCodec, EthAbiType, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct PackedUserOperation {
    #[serde(serialize_with = "as_checksum_addr")]
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    /// `verificationGasLimit` (first 16 bytes) and `callGasLimit` (last 16 bytes)
    pub account_gas_limits: H256,
    pub pre_verification_gas: U256,
    /// `maxPriorityFeePerGas` (first 16 bytes) and `maxFeePerGas` (last 16 bytes)
    pub gas_fees: H256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

/// Packed user operation without signature (helper for hashing)
#[derive(EthAbiCodec, EthAbiType)]
struct PackedUserOperationNoSignature {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: H256,
    pub call_data: H256,
    pub account_gas_limits: H256,
    pub pre_verification_gas: U256,
    pub gas_fees: H256,
    pub paymaster_and_data: H256,
}

impl From<&PackedUserOperation> for PackedUserOperationNoSignature {
    fn from(value: &PackedUserOperation) -> Self {
        Self {
            sender: value.sender,
            nonce: value.nonce,
            init_code: keccak256(value.init_code.deref()).into(),
            call_data: keccak256(value.call_data.deref()).into(),
            account_gas_limits: value.account_gas_limits,
            pre_verification_gas: value.pre_verification_gas,
            gas_fees: value.gas_fees,
            paymaster_and_data: keccak256(value.paymaster_and_data.deref()).into(),
        }
    }
}

impl PackedUserOperation {
    /// Encodes the user operation without signature (preimage of the inner hash)
    pub fn pack_without_signature(&self) -> Bytes {
        PackedUserOperationNoSignature::from(self).encode().into()
    }

    /// Calculates the hash of the user operation
    ///
    /// # Arguments
    /// * `entry_point` - The entry point the operation is submitted to
    /// * `chain_id` - The chain id
    ///
    /// # Returns
    /// * `UserOperationHash` - keccak256 of the encoded inner hash, entry point and chain id
    pub fn hash(&self, entry_point: &Address, chain_id: u64) -> UserOperationHash {
        H256::from(keccak256(
            [
                keccak256(self.pack_without_signature().deref()).to_vec(),
                entry_point.encode(),
                U256::from(chain_id).encode(),
            ]
            .concat(),
        ))
        .into()
    }

    /// Expands the packed fields into a [UserOperationSigned]
    pub fn unpack(&self) -> Result<UserOperationSigned, PackError> {
        let (verification_gas_limit, call_gas_limit) = unpack_uint128(&self.account_gas_limits.0);
        let (max_priority_fee_per_gas, max_fee_per_gas) = unpack_uint128(&self.gas_fees.0);
        let (factory, factory_data) = unpack_factory_data(&self.init_code)?;
        let (
            paymaster,
            paymaster_verification_gas_limit,
            paymaster_post_op_gas_limit,
            paymaster_data,
        ) = unpack_paymaster_data(&self.paymaster_and_data)?;

        Ok(UserOperationSigned {
            sender: self.sender,
            nonce: self.nonce,
            factory,
            factory_data,
            call_data: self.call_data.clone(),
            call_gas_limit,
            verification_gas_limit,
            pre_verification_gas: self.pre_verification_gas,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            paymaster,
            paymaster_verification_gas_limit,
            paymaster_post_op_gas_limit,
            paymaster_data,
            signature: self.signature.clone(),
        })
    }
}

impl TryFrom<&PackedUserOperation> for UserOperationSigned {
    type Error = PackError;

    fn try_from(value: &PackedUserOperation) -> Result<Self, Self::Error> {
        value.unpack()
    }
}
