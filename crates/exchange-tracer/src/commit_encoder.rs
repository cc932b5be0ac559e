//! Packs a [`CommitRequest`] into the committer's `bytes32` argument.
//!
//! ```text
//! bits   0..128  amount (settlement token base units)
//! bits 128..136  commit type
//! bit       136  from aggregate balance
//! bit       144  pay for claim
//! ```

use pool_keeper_core::{CommitRequest, CommitType};

/// Encodes the commit arguments as a big-endian 32-byte word.
#[must_use]
pub fn encode_commit_params(
    pay_for_claim: bool,
    from_aggregate_balance: bool,
    commit_type: CommitType,
    amount: u128,
) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&amount.to_be_bytes());
    // byte 31 holds bits 0..8, so bit n lives in byte 31 - n / 8
    word[31 - 16] = commit_type.as_u8();
    word[31 - 17] = u8::from(from_aggregate_balance);
    word[31 - 18] = u8::from(pay_for_claim);
    word
}

/// Encodes a request.
#[must_use]
pub fn encode_request(request: &CommitRequest) -> [u8; 32] {
    encode_commit_params(
        request.pay_for_claim,
        request.from_aggregate_balance,
        request.commit_type,
        request.amount,
    )
}
