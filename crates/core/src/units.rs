//! Conversion between human-readable token amounts and fixed-point base units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Largest scale `Decimal` can represent.
pub const MAX_DECIMALS: u32 = 28;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("amount {amount} has more than {decimals} fractional digits")]
    TooPrecise { amount: Decimal, decimals: u32 },

    #[error("unsupported token decimals: {0}")]
    UnsupportedDecimals(u32),

    #[error("amount {amount} overflows at {decimals} decimals")]
    Overflow { amount: Decimal, decimals: u32 },

    #[error("{0} base units exceed the decimal range")]
    OutOfRange(u128),
}

/// Scales `amount` by `10^decimals` into integer base units.
///
/// # Errors
///
/// Fails on negative amounts, amounts finer than the token precision and
/// results that do not fit.
pub fn parse_units(amount: Decimal, decimals: u32) -> Result<u128, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitsError::Negative(amount));
    }
    if amount.normalize().scale() > decimals {
        return Err(UnitsError::TooPrecise { amount, decimals });
    }

    let overflow = || UnitsError::Overflow { amount, decimals };

    let whole = amount.trunc().to_u128().ok_or_else(overflow)?;
    let frac = amount.fract().normalize();
    let frac_mantissa = u128::try_from(frac.mantissa()).map_err(|_| overflow())?;
    let frac_units = frac_mantissa * 10u128.pow(decimals - frac.scale());

    whole
        .checked_mul(10u128.pow(decimals))
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(overflow)
}

/// Converts base units back into a human-readable amount.
///
/// # Errors
///
/// Fails when the value exceeds `Decimal`'s 96-bit mantissa.
pub fn format_units(units: u128, decimals: u32) -> Result<Decimal, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    let signed = i128::try_from(units).map_err(|_| UnitsError::OutOfRange(units))?;
    Decimal::try_from_i128_with_scale(signed, decimals)
        .map(|d| d.normalize())
        .map_err(|_| UnitsError::OutOfRange(units))
}
