use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Error returned when a string cannot be parsed as a [`Decimal`].
#[derive(Debug, Error)]
#[error("invalid amount '{input}': {source}")]
pub struct ParseDecimalError {
    input: String,
    #[source]
    source: rust_decimal::Error,
}

/// Normalizes money input: trims whitespace and removes `$` and the
/// thousands separator.
fn normalize_amount_input(s: &str) -> String {
    s.trim().replace(['$', ','], "")
}

/// Parses a dollar amount into a [`Decimal`].
///
/// Accepts `"53359"`, `"53,359.00"` and `"$53,359"`. Empty input is 0.
/// Used as a clap value parser, so the sign is left for the calculators
/// to validate.
pub fn parse_amount(s: &str) -> Result<Decimal, ParseDecimalError> {
    let normalized = normalize_amount_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    normalized.parse().map_err(|e| {
        tracing::debug!(input = %s, "invalid amount: {}", e);
        ParseDecimalError {
            input: s.to_string(),
            source: e,
        }
    })
}

/// Formats a percentage with at most `dp` decimal places, e.g. `"2.5%"`.
pub fn format_percentage(
    value: Decimal,
    dp: u32,
) -> String {
    let rounded = value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("{rounded}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_amount_accepts_comma_thousands_separator() {
        assert_eq!(parse_amount("1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("1,234,567.89").unwrap(), dec!(1234567.89));
    }

    #[test]
    fn parse_amount_strips_dollar_sign_and_whitespace() {
        assert_eq!(parse_amount("  $53,359  ").unwrap(), dec!(53359));
    }

    #[test]
    fn parse_amount_empty_treated_as_zero() {
        assert_eq!(parse_amount("").unwrap(), Decimal::ZERO);
        assert_eq!(parse_amount("   ").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn parse_amount_keeps_sign() {
        assert_eq!(parse_amount("-100").unwrap(), dec!(-100));
    }

    #[test]
    fn parse_amount_invalid_returns_error() {
        let err = parse_amount("abc").unwrap_err();

        assert!(err.to_string().starts_with("invalid amount 'abc'"));
    }

    #[test]
    fn format_percentage_trims_trailing_zeros() {
        assert_eq!(format_percentage(dec!(2.50), 2), "2.5%");
        assert_eq!(format_percentage(dec!(0.0018613953), 6), "0.001861%");
        assert_eq!(format_percentage(dec!(100), 1), "100%");
    }
}
