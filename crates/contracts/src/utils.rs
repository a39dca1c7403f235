use crate::{error::Revert, gen::entry_point_api};
use ethers::{
    abi::{self, AbiDecode, ParamType, Token},
    types::{Address, Bytes, Signature, H256, U256},
    utils::hash_message,
};
use vela_primitives::{PackedUserOperation, UserOperationHash, ValidationData};

impl From<PackedUserOperation> for entry_point_api::PackedUserOperation {
    fn from(uo: PackedUserOperation) -> Self {
        Self {
            sender: uo.sender,
            nonce: uo.nonce,
            init_code: uo.init_code,
            call_data: uo.call_data,
            account_gas_limits: uo.account_gas_limits.0,
            pre_verification_gas: uo.pre_verification_gas,
            gas_fees: uo.gas_fees.0,
            paymaster_and_data: uo.paymaster_and_data,
            signature: uo.signature,
        }
    }
}

impl From<entry_point_api::PackedUserOperation> for PackedUserOperation {
    fn from(uo: entry_point_api::PackedUserOperation) -> Self {
        Self {
            sender: uo.sender,
            nonce: uo.nonce,
            init_code: uo.init_code,
            call_data: uo.call_data,
            account_gas_limits: H256::from(uo.account_gas_limits),
            pre_verification_gas: uo.pre_verification_gas,
            gas_fees: H256::from(uo.gas_fees),
            paymaster_and_data: uo.paymaster_and_data,
            signature: uo.signature,
        }
    }
}

/// Decodes calldata into one of the generated `*Calls` enums
pub fn decode_call<T: AbiDecode>(data: &[u8]) -> Result<T, Revert> {
    T::decode(data).map_err(|_| Revert::UnknownSelector {
        selector: Bytes::from(data.get(..4).unwrap_or(data).to_vec()),
    })
}

/// Decodes ABI-encoded return data holding a single address
pub fn decode_address(data: &[u8]) -> Result<Address, Revert> {
    Address::decode(data).map_err(|err| Revert::Abi { inner: err.to_string() })
}

/// Recovers the signer of a user operation hash signed as an EIP-191 personal message
pub fn recover_signer(uo_hash: &UserOperationHash, signature: &[u8]) -> Option<Address> {
    let signature = Signature::try_from(signature).ok()?;
    signature.recover(hash_message(uo_hash.0)).ok()
}

/// Encodes a validity window as `abi.encode(uint48 validUntil, uint48 validAfter)`
pub fn encode_validity(valid_until: u64, valid_after: u64) -> Bytes {
    abi::encode(&[Token::Uint(valid_until.into()), Token::Uint(valid_after.into())]).into()
}

/// Decodes a validity window encoded by [encode_validity]; empty data means unbounded
pub fn decode_validity(data: &[u8]) -> Result<ValidationData, Revert> {
    if data.is_empty() {
        return Ok(ValidationData::default());
    }

    let invalid = || Revert::Abi {
        inner: format!("invalid validity window {}", Bytes::from(data.to_vec())),
    };
    let tokens =
        abi::decode(&[ParamType::Uint(48), ParamType::Uint(48)], data).map_err(|_| invalid())?;
    let mut values = tokens.into_iter().map(|t| t.into_uint().unwrap_or_default());
    let (valid_until, valid_after) = match (values.next(), values.next()) {
        (Some(until), Some(after)) if until.bits() <= 48 && after.bits() <= 48 => {
            (until.as_u64(), after.as_u64())
        }
        _ => return Err(invalid()),
    };
    Ok(ValidationData::new(valid_after, valid_until))
}

/// Reverts if `balance` does not cover `required`
pub fn require_balance(account: Address, balance: U256, required: U256) -> Result<(), Revert> {
    if balance < required {
        return Err(Revert::InsufficientBalance { account, balance, required });
    }
    Ok(())
}
