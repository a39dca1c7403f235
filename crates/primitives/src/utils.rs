//! Misc utils

use crate::constants::user_operation::{
    ADDRESS_LENGTH, NONCE_SEQUENCE_BITS, PAYMASTER_DATA_OFFSET,
};
use ethers::{
    types::{Address, Bytes, U256},
    utils::to_checksum,
};
use thiserror::Error;

/// Errors raised while packing or unpacking user operation fields
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    /// Value does not fit into one half of a packed word
    #[error("value {value} does not fit into 128 bits")]
    Uint128Overflow {
        /// The offending value
        value: U256,
    },

    /// `paymasterAndData` is too short to hold the paymaster address and gas limits
    #[error("paymasterAndData has {len} bytes, expected empty or at least 52")]
    MalformedPaymasterAndData {
        /// Length of the field
        len: usize,
    },

    /// `initCode` is too short to hold the factory address
    #[error("initCode has {len} bytes, expected empty or at least 20")]
    MalformedInitCode {
        /// Length of the field
        len: usize,
    },

    /// A non-empty `initCode` or `paymasterAndData` starts with the zero address
    #[error("{field} is not empty but starts with the zero address")]
    ZeroAddressPrefix {
        /// Name of the field
        field: &'static str,
    },
}

/// Converts address to checksum address
pub fn as_checksum_addr<S>(val: &Address, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&to_checksum(val, None))
}

/// If possible, parses address from the first 20 bytes
pub fn get_address(buf: &[u8]) -> Option<Address> {
    if buf.len() >= ADDRESS_LENGTH {
        Some(Address::from_slice(&buf[0..ADDRESS_LENGTH]))
    } else {
        None
    }
}

/// Packs two uint128 into one 32-byte word, `high` in the first 16 bytes
pub fn pack_uint128(high: U256, low: U256) -> Result<[u8; 32], PackError> {
    let mut res = [0u8; 32];
    for (value, offset) in [(high, 0), (low, 16)] {
        if value.bits() > 128 {
            return Err(PackError::Uint128Overflow { value });
        }
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        res[offset..offset + 16].copy_from_slice(&word[16..32]);
    }
    Ok(res)
}

/// Unpacks two uint128 from a 32-byte word
pub fn unpack_uint128(buf: &[u8; 32]) -> (U256, U256) {
    (U256::from_big_endian(&buf[0..16]), U256::from_big_endian(&buf[16..32]))
}

/// Packs `verificationGasLimit` and `callGasLimit` into `accountGasLimits`
pub fn pack_gas_limits(
    verification_gas_limit: U256,
    call_gas_limit: U256,
) -> Result<[u8; 32], PackError> {
    pack_uint128(verification_gas_limit, call_gas_limit)
}

/// Packs `maxPriorityFeePerGas` and `maxFeePerGas` into `gasFees`
pub fn pack_gas_fees(
    max_priority_fee_per_gas: U256,
    max_fee_per_gas: U256,
) -> Result<[u8; 32], PackError> {
    pack_uint128(max_priority_fee_per_gas, max_fee_per_gas)
}

/// Builds `paymasterAndData`, empty when there is no paymaster
pub fn pack_paymaster_data(
    paymaster: Address,
    paymaster_verification_gas_limit: U256,
    paymaster_post_op_gas_limit: U256,
    paymaster_data: &Bytes,
) -> Result<Bytes, PackError> {
    if paymaster.is_zero() {
        return Ok(Bytes::default());
    }

    let gas = pack_uint128(paymaster_verification_gas_limit, paymaster_post_op_gas_limit)?;
    Ok([paymaster.as_bytes(), &gas[..], paymaster_data.as_ref()].concat().into())
}

/// Splits `paymasterAndData` into paymaster, its two gas limits and the opaque data
pub fn unpack_paymaster_data(buf: &[u8]) -> Result<(Address, U256, U256, Bytes), PackError> {
    if buf.is_empty() {
        return Ok((Address::zero(), U256::zero(), U256::zero(), Bytes::default()));
    }
    if buf.len() < PAYMASTER_DATA_OFFSET {
        return Err(PackError::MalformedPaymasterAndData { len: buf.len() });
    }
    let paymaster = Address::from_slice(&buf[0..ADDRESS_LENGTH]);
    if paymaster.is_zero() {
        return Err(PackError::ZeroAddressPrefix { field: "paymasterAndData" });
    }

    let mut gas = [0u8; 32];
    gas.copy_from_slice(&buf[ADDRESS_LENGTH..PAYMASTER_DATA_OFFSET]);
    let (verification_gas_limit, post_op_gas_limit) = unpack_uint128(&gas);
    Ok((
        paymaster,
        verification_gas_limit,
        post_op_gas_limit,
        Bytes::from(buf[PAYMASTER_DATA_OFFSET..].to_vec()),
    ))
}

/// Builds `initCode` from the factory address and its calldata
pub fn pack_factory_data(factory: Address, factory_data: &Bytes) -> Bytes {
    if factory.is_zero() {
        Bytes::default()
    } else {
        [factory.as_bytes(), factory_data.as_ref()].concat().into()
    }
}

/// Splits `initCode` into the factory address and its calldata
pub fn unpack_factory_data(init_code: &[u8]) -> Result<(Address, Bytes), PackError> {
    if init_code.is_empty() {
        return Ok((Address::zero(), Bytes::default()));
    }
    if init_code.len() < ADDRESS_LENGTH {
        return Err(PackError::MalformedInitCode { len: init_code.len() });
    }
    let factory = Address::from_slice(&init_code[0..ADDRESS_LENGTH]);
    if factory.is_zero() {
        return Err(PackError::ZeroAddressPrefix { field: "initCode" });
    }

    Ok((factory, Bytes::from(init_code[ADDRESS_LENGTH..].to_vec())))
}

/// Splits a nonce into its 192-bit key and 64-bit sequence
pub fn split_nonce(nonce: U256) -> (U256, u64) {
    (nonce >> NONCE_SEQUENCE_BITS, nonce.low_u64())
}

/// Builds a nonce from its key and sequence
pub fn join_nonce(key: U256, sequence: u64) -> U256 {
    (key << NONCE_SEQUENCE_BITS) | U256::from(sequence)
}
