use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

static CURRENCY_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[$,\s"]"#).expect("valid currency pattern"));

/// Parses amounts such as `"$475,000"`, `" 1 200.50 "` or `"\"12\""`.
///
/// Returns `None` for blank or unparseable input.
pub fn parse_currency(value: &str) -> Option<Decimal> {
    let cleaned = CURRENCY_NOISE.replace_all(value, "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// First of `formats` that parses the trimmed `value`.
pub fn parse_date(
    value: &str,
    formats: &[&str],
) -> Option<NaiveDate> {
    let value = value.trim_matches(|c: char| c.is_whitespace());
    if value.is_empty() {
        return None;
    }
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// At most `max_chars` characters of `value`.
pub fn truncate(
    value: &str,
    max_chars: usize,
) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn currency_strips_symbols_and_separators() {
        assert_eq!(parse_currency("$475,000"), Some(dec!(475000)));
        assert_eq!(parse_currency(" 1 200.50 "), Some(dec!(1200.50)));
        assert_eq!(parse_currency("\"$12,500.75\""), Some(dec!(12500.75)));
    }

    #[test]
    fn currency_rejects_blank_and_garbage() {
        assert_eq!(parse_currency(""), None);
        assert_eq!(parse_currency("  "), None);
        assert_eq!(parse_currency("N/A"), None);
    }

    #[test]
    fn dates_try_formats_in_order() {
        let formats = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

        assert_eq!(parse_date("2023-04-15", &formats), NaiveDate::from_ymd_opt(2023, 4, 15));
        // Ambiguous day/month goes to the first matching format.
        assert_eq!(parse_date("04/05/2023", &formats), NaiveDate::from_ymd_opt(2023, 4, 5));
        assert_eq!(parse_date("15/04/2023", &formats), NaiveDate::from_ymd_opt(2023, 4, 15));
        assert_eq!(parse_date("\t2023-04-15\t", &formats), NaiveDate::from_ymd_opt(2023, 4, 15));
        assert_eq!(parse_date("soon", &formats), None);
        assert_eq!(parse_date("", &formats), None);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("Québec", 3), "Qué");
        assert_eq!(truncate("short", 50), "short");
    }
}
