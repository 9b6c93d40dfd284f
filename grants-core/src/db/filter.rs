//! Search criteria for grant listings.
//!
//! Text matching is case-insensitive substring search. Value bounds are
//! inclusive. Backends apply the criteria, the sort and the limit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::GacStatus;

pub const DEFAULT_SEARCH_LIMIT: u32 = 100;
pub const MAX_SEARCH_LIMIT: u32 = 1000;

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSort {
    #[default]
    ValueDesc,
    ValueAsc,
    DateDesc,
    DateAsc,
    Title,
}

impl GrantSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "value_desc" | "-value" => Some(Self::ValueDesc),
            "value_asc" | "value" => Some(Self::ValueAsc),
            "date_desc" | "-date" => Some(Self::DateDesc),
            "date_asc" | "date" => Some(Self::DateAsc),
            "title" => Some(Self::Title),
            _ => None,
        }
    }
}

/// Domestic grant search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFilter {
    /// Matched against title, recipient legal name and description.
    pub query: Option<String>,
    /// Compared case-insensitively.
    pub province: Option<String>,
    pub fiscal_year: Option<String>,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub recipient_type: Option<String>,
    pub notable_only: bool,
    pub major_only: bool,
    pub sort: GrantSort,
    pub limit: Option<u32>,
}

impl GrantFilter {
    /// Requested limit, defaulted and capped.
    pub fn effective_limit(&self) -> u32 {
        clamp_limit(self.limit)
    }
}

/// GAC grant search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GacGrantFilter {
    /// Matched against title, description and country.
    pub query: Option<String>,
    pub status: Option<GacStatus>,
    /// Substring of the raw country string.
    pub country: Option<String>,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub major_only: bool,
    pub sort: GrantSort,
    pub limit: Option<u32>,
}

impl GacGrantFilter {
    pub fn effective_limit(&self) -> u32 {
        clamp_limit(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn limit_defaults_to_one_hundred() {
        assert_eq!(GrantFilter::default().effective_limit(), 100);
        assert_eq!(GacGrantFilter::default().effective_limit(), 100);
    }

    #[test]
    fn limit_is_capped() {
        let filter = GrantFilter {
            limit: Some(50_000),
            ..GrantFilter::default()
        };

        assert_eq!(filter.effective_limit(), 1000);
    }

    #[test]
    fn explicit_limit_below_cap_is_kept() {
        let filter = GacGrantFilter {
            limit: Some(25),
            ..GacGrantFilter::default()
        };

        assert_eq!(filter.effective_limit(), 25);
    }

    #[test]
    fn sort_parses_both_spellings() {
        assert_eq!(GrantSort::parse("-value"), Some(GrantSort::ValueDesc));
        assert_eq!(GrantSort::parse("value_asc"), Some(GrantSort::ValueAsc));
        assert_eq!(GrantSort::parse("DATE_DESC"), Some(GrantSort::DateDesc));
        assert_eq!(GrantSort::parse("date"), Some(GrantSort::DateAsc));
        assert_eq!(GrantSort::parse("title"), Some(GrantSort::Title));
        assert_eq!(GrantSort::parse("random"), None);
    }
}
