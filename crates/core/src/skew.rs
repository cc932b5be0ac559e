//! Fixed three-way skew policy.
//!
//! Skew above the upper bound means excess long collateral, so the keeper
//! adds to the short side; below the lower bound it adds to the long side.
//! Both bounds belong to the dead zone.

use crate::events::{CommitAction, PoolStateSnapshot};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Skew strictly above this triggers a short mint.
pub const UPPER_SKEW_BOUND: Decimal = dec!(1.01);

/// Skew strictly below this triggers a long mint.
pub const LOWER_SKEW_BOUND: Decimal = dec!(0.99);

/// Maps an expected skew to the action the keeper should take.
#[must_use]
pub fn decide(expected_skew: Decimal) -> CommitAction {
    if expected_skew > UPPER_SKEW_BOUND {
        CommitAction::ShortMint
    } else if expected_skew < LOWER_SKEW_BOUND {
        CommitAction::LongMint
    } else {
        CommitAction::NoOp
    }
}

/// Decision for a watcher snapshot. Only `expected_skew` is consulted.
#[must_use]
pub fn decide_snapshot(snapshot: &PoolStateSnapshot) -> CommitAction {
    decide(snapshot.expected_skew)
}

/// Long/short collateral ratio.
///
/// An empty pool counts as balanced. An empty short side with long
/// collateral yields `Decimal::MAX` so the policy always mints short, and a
/// ratio too large to represent saturates to the same value.
#[must_use]
pub fn skew_ratio(long: Decimal, short: Decimal) -> Decimal {
    if short.is_zero() {
        if long.is_zero() {
            Decimal::ONE
        } else {
            Decimal::MAX
        }
    } else {
        long.checked_div(short).unwrap_or(Decimal::MAX)
    }
}

/// `a + b`, saturating at `Decimal::MAX`.
#[must_use]
pub fn saturating_add(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or(Decimal::MAX)
}
