use crate::address::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pool state observed shortly before a commitment window closes.
///
/// Produced once per window by the pool watcher and consumed once by the
/// window cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStateSnapshot {
    pub pool: Address,
    /// Committer update interval id the pending commitments belong to.
    pub update_interval_id: u128,
    pub window_ends_at: DateTime<Utc>,
    pub long_balance: Decimal,
    pub short_balance: Decimal,
    pub pending_long_mints: Decimal,
    pub pending_short_mints: Decimal,
    /// Projected long/short collateral ratio once the window executes.
    pub expected_skew: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// Outcome of evaluating one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitAction {
    ShortMint,
    LongMint,
    NoOp,
}

impl CommitAction {
    /// Commit type to submit, `None` for [`CommitAction::NoOp`].
    #[must_use]
    pub fn commit_type(self) -> Option<CommitType> {
        match self {
            Self::ShortMint => Some(CommitType::ShortMint),
            Self::LongMint => Some(CommitType::LongMint),
            Self::NoOp => None,
        }
    }
}

impl fmt::Display for CommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortMint => write!(f, "short mint"),
            Self::LongMint => write!(f, "long mint"),
            Self::NoOp => write!(f, "no-op"),
        }
    }
}

/// Pool committer commit type, with its on-chain enum discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommitType {
    ShortMint = 0,
    ShortBurn = 1,
    LongMint = 2,
    LongBurn = 3,
    LongBurnShortMint = 4,
    ShortBurnLongMint = 5,
}

impl CommitType {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A single commitment, amounts in settlement token base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Pay the keeper to auto-claim the minted tokens.
    pub pay_for_claim: bool,
    /// Fund from the committer's aggregate balance instead of the wallet.
    pub from_aggregate_balance: bool,
    pub commit_type: CommitType,
    pub amount: u128,
}

impl CommitRequest {
    /// Mint paid straight from the wallet balance, no auto-claim.
    #[must_use]
    pub fn wallet_mint(commit_type: CommitType, amount: u128) -> Self {
        Self {
            pay_for_claim: false,
            from_aggregate_balance: false,
            commit_type,
            amount,
        }
    }
}
