//! Display formatting for monetary amounts.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::common::round_half_up;

const SUB_CENT: &str = "<$0.01";
const ONE_CENT: Decimal = dec!(0.01);

/// Renders `value` as dollars with thousands separators and two decimals.
///
/// Anything under one cent, negatives included, renders as `<$0.01`.
///
/// ```
/// use rust_decimal_macros::dec;
/// use grants_core::calculations::format_currency;
///
/// assert_eq!(format_currency(dec!(1234.5)), "$1,234.50");
/// assert_eq!(format_currency(dec!(0.004)), "<$0.01");
/// ```
pub fn format_currency(value: Decimal) -> String {
    if value < ONE_CENT {
        return SUB_CENT.to_string();
    }

    let rounded = format!("{:.2}", round_half_up(value));
    let (whole, cents) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("${grouped}.{cents}")
}

/// A monetary value paired with its display form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub formatted: String,
}

impl Amount {
    pub fn new(value: Decimal) -> Self {
        Self {
            value,
            formatted: format_currency(value),
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}
