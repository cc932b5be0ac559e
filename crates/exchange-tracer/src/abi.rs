//! Just enough Solidity ABI encoding for the calls the keeper makes:
//! static arguments in, single static words out.

use pool_keeper_core::Address;
use sha3::{Digest, Keccak256};

use crate::error::TxError;

/// First four bytes of `keccak256(signature)`.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Address left-padded to a 32-byte word.
#[must_use]
pub fn encode_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Unsigned integer left-padded to a 32-byte word.
#[must_use]
pub fn encode_u128(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Selector followed by already-encoded argument words.
#[must_use]
pub fn calldata(signature: &str, args: &[[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * 32);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// The `index`-th 32-byte word of return data.
pub fn word(data: &[u8], index: usize) -> Result<[u8; 32], TxError> {
    let start = index * 32;
    let slice = data.get(start..start + 32).ok_or_else(|| {
        TxError::Decode(format!(
            "return data has {} bytes, word {} needs {}",
            data.len(),
            index,
            start + 32
        ))
    })?;
    let mut out = [0u8; 32];
    out.copy_from_slice(slice);
    Ok(out)
}

pub fn decode_address(word: &[u8; 32]) -> Result<Address, TxError> {
    if word[..12].iter().any(|&b| b != 0) {
        return Err(TxError::Decode("address word has dirty high bytes".to_string()));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&word[12..]);
    Ok(Address::new(out))
}

/// Decodes a uint word that must fit in 128 bits.
pub fn decode_u128(word: &[u8; 32]) -> Result<u128, TxError> {
    if word[..16].iter().any(|&b| b != 0) {
        return Err(TxError::Decode(format!(
            "uint 0x{} exceeds 128 bits",
            hex::encode(word)
        )));
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(out))
}

pub fn decode_u64(word: &[u8; 32]) -> Result<u64, TxError> {
    let value = decode_u128(word)?;
    u64::try_from(value).map_err(|_| TxError::Decode(format!("uint {value} exceeds 64 bits")))
}

/// Saturating decode for allowance-style values that may be the full `2^256-1`.
#[must_use]
pub fn decode_u128_saturating(word: &[u8; 32]) -> u128 {
    decode_u128(word).unwrap_or(u128::MAX)
}
