//! Common utility functions for contribution calculations.
//!
//! This module provides shared arithmetic used across the calculators,
//! including rounding and checked division.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::{CalculationError, ValidationError};

/// Number of months used to derive every monthly figure.
pub const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Largest income or spending amount accepted: twelve digits with two
/// decimal places.
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);

/// Rejects negative amounts and amounts above [`MAX_AMOUNT`].
pub fn check_amount(
    field: &'static str,
    value: Decimal,
) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::NegativeAmount { field, value });
    }
    if value > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge {
            field,
            value,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use grants_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Divides `numerator` by `denominator`, reporting a zero denominator as a
/// [`CalculationError::DivisionByZero`] tagged with `what`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use grants_core::calculations::common::checked_divide;
/// use grants_core::calculations::CalculationError;
///
/// assert_eq!(checked_divide(dec!(300), dec!(3), "annual amount"), Ok(dec!(100)));
/// assert_eq!(
///     checked_divide(dec!(1), dec!(0), "annual amount"),
///     Err(CalculationError::DivisionByZero("annual amount"))
/// );
/// ```
pub fn checked_divide(
    numerator: Decimal,
    denominator: Decimal,
    what: &'static str,
) -> Result<Decimal, CalculationError> {
    numerator
        .checked_div(denominator)
        .ok_or(CalculationError::DivisionByZero(what))
}

/// Annual figure spread evenly over twelve months.
pub fn monthly(annual: Decimal) -> Decimal {
    annual / MONTHS_PER_YEAR
}
