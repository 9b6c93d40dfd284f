use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::grant::is_major_funding;

/// Lifecycle status of a Global Affairs Canada project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GacStatus {
    #[default]
    Operational,
    Closed,
    Terminating,
}

impl GacStatus {
    pub const ALL: [GacStatus; 3] = [Self::Operational, Self::Closed, Self::Terminating];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Closed => "closed",
            Self::Terminating => "terminating",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "operational" => Some(Self::Operational),
            "closed" => Some(Self::Closed),
            "terminating" => Some(Self::Terminating),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Operational => "Operational",
            Self::Closed => "Closed",
            Self::Terminating => "Terminating",
        }
    }
}

/// An international development project funded through Global Affairs Canada.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAffairsGrant {
    pub id: i64,
    pub project_number: String,
    pub date_modified: NaiveDate,
    pub title: String,
    pub description: String,
    pub status: GacStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Raw country allocation, e.g. `"Mali: 60.00%; Niger: 40.00%"`.
    pub country: String,
    pub region: String,
    pub executing_agency_partner: String,
    pub maximum_contribution: Decimal,
    pub program_name: String,
    pub dac_sector: String,
    pub policy_markers: String,
    pub expected_results: String,
}

impl GlobalAffairsGrant {
    pub fn is_major_funding(&self) -> bool {
        is_major_funding(self.maximum_contribution)
    }

    /// First country named in the allocation string, without its percentage.
    pub fn primary_country(&self) -> &str {
        if !self.country.contains(':') {
            return self.country.trim();
        }
        let first = self.country.split(';').next().unwrap_or_default().trim();
        match first.split_once(':') {
            Some((name, _)) => name.trim(),
            None => first,
        }
    }

    pub fn has_gender_marker(&self) -> bool {
        self.policy_markers
            .to_lowercase()
            .contains("gender equality")
    }

    pub fn has_environment_marker(&self) -> bool {
        let markers = self.policy_markers.to_lowercase();
        markers.contains("environmental") || markers.contains("sustainability")
    }

    pub fn has_governance_marker(&self) -> bool {
        let markers = self.policy_markers.to_lowercase();
        markers.contains("governance") || markers.contains("participatory development")
    }
}

/// For inserting GAC projects (no id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGlobalAffairsGrant {
    pub project_number: String,
    pub date_modified: NaiveDate,
    pub title: String,
    pub description: String,
    pub status: GacStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub country: String,
    pub region: String,
    pub executing_agency_partner: String,
    pub maximum_contribution: Decimal,
    pub program_name: String,
    pub dac_sector: String,
    pub policy_markers: String,
    pub expected_results: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn with_country(country: &str) -> GlobalAffairsGrant {
        GlobalAffairsGrant {
            country: country.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in GacStatus::ALL {
            assert_eq!(GacStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(GacStatus::parse("Closed"), None);
    }

    #[test]
    fn primary_country_strips_percentage() {
        assert_eq!(with_country("Mali: 100.00%").primary_country(), "Mali");
    }

    #[test]
    fn primary_country_takes_first_of_several() {
        assert_eq!(
            with_country(" Haiti: 60.00%; Jamaica: 40.00%").primary_country(),
            "Haiti"
        );
    }

    #[test]
    fn primary_country_without_percentages_is_trimmed_string() {
        assert_eq!(with_country("  Kenya ").primary_country(), "Kenya");
        assert_eq!(with_country("").primary_country(), "");
    }

    #[test]
    fn policy_marker_checks_are_case_insensitive() {
        let grant = GlobalAffairsGrant {
            policy_markers: "Principal - Gender Equality; Significant - Participatory Development and Good Governance"
                .to_string(),
            ..Default::default()
        };

        assert!(grant.has_gender_marker());
        assert!(grant.has_governance_marker());
        assert!(!grant.has_environment_marker());
    }
}
