use crate::error::{Error, Result};
use crate::types::{PackedUserOperation, UserOperation};
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H256, U128, U256};
use ethers::utils::keccak256;
use serde_json::Value;

pub fn fmt_address(addr: Address) -> String {
    format!("0x{}", hex::encode(addr.as_bytes()))
}

pub fn fmt_h256(h: H256) -> String {
    format!("0x{}", hex::encode(h.as_bytes()))
}

/// JSON-RPC "quantity" encoding.
pub fn fmt_u256(v: U256) -> String {
    if v.is_zero() {
        "0x0".to_string()
    } else {
        format!("0x{:x}", v)
    }
}

/// Parse a hex quantity. `"0x"` and `""` read as zero.
pub fn parse_u256_quantity(s: &str) -> Result<U256> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16).map_err(|e| Error::InvalidResponse {
        method: String::new(),
        message: format!("invalid hex quantity {s:?}: {e}"),
    })
}

/// Parse a hex quantity that must fit in 16 bytes (gas limits and fees).
pub fn parse_u128_quantity(s: &str) -> Result<U128> {
    let v = parse_u256_quantity(s)?;
    if v.bits() > 128 {
        return Err(Error::InvalidResponse {
            method: String::new(),
            message: format!("quantity {s} does not fit in 128 bits"),
        });
    }
    Ok(U128::from(v.low_u128()))
}

pub fn parse_h256(s: &str) -> Result<H256> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| Error::InvalidResponse {
        method: String::new(),
        message: format!("invalid hex {s:?}: {e}"),
    })?;
    if bytes.len() != 32 {
        return Err(Error::InvalidResponse {
            method: String::new(),
            message: format!("expected 32-byte hex, got {} bytes", bytes.len()),
        });
    }
    Ok(H256::from_slice(&bytes))
}

/// Read `v[key]` as a hex quantity. Missing, null or non-string values are `None`.
pub(crate) fn quantity_field(v: &Value, key: &str) -> Result<Option<U256>> {
    match v.get(key).and_then(Value::as_str) {
        Some(s) => parse_u256_quantity(s).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn quantity128_field(v: &Value, key: &str) -> Result<Option<U128>> {
    match v.get(key).and_then(Value::as_str) {
        Some(s) => parse_u128_quantity(s).map(Some),
        None => Ok(None),
    }
}

/// serde helper: optional hex quantity that tolerates `"0x"` and `null`.
pub(crate) fn de_opt_quantity128<'de, D>(d: D) -> std::result::Result<Option<U128>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = serde::Deserialize::deserialize(d)?;
    raw.map(|s| parse_u128_quantity(&s))
        .transpose()
        .map_err(serde::de::Error::custom)
}

fn word16(v: U128) -> [u8; 16] {
    v.low_u128().to_be_bytes()
}

fn concat_128(hi: [u8; 16], lo: [u8; 16]) -> H256 {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&hi);
    out[16..].copy_from_slice(&lo);
    H256(out)
}

/// Pack an RPC-layout operation into the on-chain `PackedUserOperation`.
///
/// Every gas field is a fixed 16-byte big-endian word, so the layout is unambiguous.
pub fn pack_user_op(op: &UserOperation) -> PackedUserOperation {
    let init_code = match op.factory {
        Some(factory) => {
            let data = op.factory_data.as_deref().unwrap_or_default();
            let mut v = Vec::with_capacity(20 + data.len());
            v.extend_from_slice(factory.as_bytes());
            v.extend_from_slice(data);
            Bytes::from(v)
        }
        None => Bytes::new(),
    };

    let paymaster_and_data = match op.paymaster {
        Some(paymaster) => {
            let data = op.paymaster_data.as_deref().unwrap_or_default();
            let mut v = Vec::with_capacity(52 + data.len());
            v.extend_from_slice(paymaster.as_bytes());
            v.extend_from_slice(&word16(op.paymaster_verification_gas_limit));
            v.extend_from_slice(&word16(op.paymaster_post_op_gas_limit));
            v.extend_from_slice(data);
            Bytes::from(v)
        }
        None => Bytes::new(),
    };

    PackedUserOperation {
        sender: op.sender,
        nonce: op.nonce,
        init_code,
        call_data: op.call_data.clone(),
        account_gas_limits: concat_128(
            word16(op.verification_gas_limit),
            word16(op.call_gas_limit),
        ),
        pre_verification_gas: op.pre_verification_gas,
        gas_fees: concat_128(
            word16(op.max_priority_fee_per_gas),
            word16(op.max_fee_per_gas),
        ),
        paymaster_and_data,
        signature: op.signature.clone(),
    }
}

/// `keccak256(abi.encode(keccak256(abi.encode(op fields)), entryPoint, chainId))`.
pub fn get_user_op_hash(op: &PackedUserOperation, entry_point: Address, chain_id: u64) -> H256 {
    let inner = encode(&[
        Token::Address(op.sender),
        Token::Uint(op.nonce),
        Token::FixedBytes(keccak256(&op.init_code).to_vec()),
        Token::FixedBytes(keccak256(&op.call_data).to_vec()),
        Token::FixedBytes(op.account_gas_limits.as_bytes().to_vec()),
        Token::Uint(op.pre_verification_gas),
        Token::FixedBytes(op.gas_fees.as_bytes().to_vec()),
        Token::FixedBytes(keccak256(&op.paymaster_and_data).to_vec()),
    ]);

    H256(keccak256(encode(&[
        Token::FixedBytes(keccak256(inner).to_vec()),
        Token::Address(entry_point),
        Token::Uint(U256::from(chain_id)),
    ])))
}
