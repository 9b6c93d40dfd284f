use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Grants at or above this value are flagged as major funding.
pub const MAJOR_FUNDING_THRESHOLD: Decimal = dec!(1000000);

/// Returns `true` when `value` qualifies as major funding.
pub fn is_major_funding(value: Decimal) -> bool {
    value >= MAJOR_FUNDING_THRESHOLD
}

/// A domestic grant or contribution agreement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: i64,
    pub reference_number: String,

    // Recipient
    pub recipient_province: String,
    pub recipient_city: String,
    pub recipient_legal_name: String,
    pub recipient_operating_name: String,
    pub recipient_type: String,
    pub recipient_postal_code: String,

    // Agreement
    pub agreement_title: String,
    pub agreement_number: String,
    pub agreement_value: Decimal,
    pub description: String,
    pub expected_results: String,
    pub agreement_start_date: Option<NaiveDate>,
    pub agreement_end_date: Option<NaiveDate>,

    // Classification
    pub naics_identifier: String,
    pub naics_sector: String,
    pub program_name: String,
    pub program_purpose: String,
    pub fiscal_year: String,

    // Flags
    pub is_major_funding: bool,
    pub is_notable: bool,
    pub notable_reason: String,
}

impl Grant {
    /// Calendar year a fiscal year string such as `"2023-24"` starts in.
    ///
    /// Only four digits at the very start of the string are accepted, so
    /// `"FY2023"` and `"unknown"` yield `None`.
    pub fn fiscal_start_year(&self) -> Option<i32> {
        parse_fiscal_start_year(&self.fiscal_year)
    }
}

pub(crate) fn parse_fiscal_start_year(fiscal_year: &str) -> Option<i32> {
    fiscal_year
        .get(..4)
        .filter(|prefix| prefix.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|prefix| prefix.parse().ok())
}

/// For inserting grants (no id; flags are derived by the store).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGrant {
    pub reference_number: String,
    pub recipient_province: String,
    pub recipient_city: String,
    pub recipient_legal_name: String,
    pub recipient_operating_name: String,
    pub recipient_type: String,
    pub recipient_postal_code: String,
    pub agreement_title: String,
    pub agreement_number: String,
    pub agreement_value: Decimal,
    pub description: String,
    pub expected_results: String,
    pub agreement_start_date: Option<NaiveDate>,
    pub agreement_end_date: Option<NaiveDate>,
    pub naics_identifier: String,
    pub naics_sector: String,
    pub program_name: String,
    pub program_purpose: String,
    pub fiscal_year: String,
}

impl NewGrant {
    pub fn is_major_funding(&self) -> bool {
        is_major_funding(self.agreement_value)
    }
}
