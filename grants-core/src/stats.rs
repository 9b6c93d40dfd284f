//! Corpus statistics over domestic and GAC grants.
//!
//! All functions work on in-memory slices and are pure.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::{GacStatus, GlobalAffairsGrant, Grant};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSummary {
    pub total_grants: u64,
    pub total_value: Decimal,
    pub average_value: Decimal,
    /// Element at index `n / 2` of the ascending values.
    pub median_value: Decimal,
    pub province_count: u64,
    pub major_count: u64,
    pub notable_count: u64,
}

fn average(
    total: Decimal,
    count: u64,
) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(count)
    }
}

pub fn summarize(grants: &[Grant]) -> GrantSummary {
    let mut values: Vec<Decimal> = grants.iter().map(|g| g.agreement_value).collect();
    values.sort();

    let total_grants = grants.len() as u64;
    let total_value: Decimal = values.iter().sum();
    let provinces: BTreeSet<&str> = grants.iter().map(|g| g.recipient_province.as_str()).collect();

    GrantSummary {
        total_grants,
        total_value,
        average_value: average(total_value, total_grants),
        median_value: values.get(values.len() / 2).copied().unwrap_or_default(),
        province_count: provinces.len() as u64,
        major_count: grants.iter().filter(|g| g.is_major_funding).count() as u64,
        notable_count: grants.iter().filter(|g| g.is_notable).count() as u64,
    }
}

/// `[min, max)` value bands used by [`value_distribution`].
const VALUE_BANDS: [(&str, Decimal, Option<Decimal>); 7] = [
    ("Under $10K", dec!(0), Some(dec!(10000))),
    ("$10K - $50K", dec!(10000), Some(dec!(50000))),
    ("$50K - $100K", dec!(50000), Some(dec!(100000))),
    ("$100K - $500K", dec!(100000), Some(dec!(500000))),
    ("$500K - $1M", dec!(500000), Some(dec!(1000000))),
    ("$1M - $10M", dec!(1000000), Some(dec!(10000000))),
    ("Over $10M", dec!(10000000), None),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueBand {
    pub label: String,
    pub min_value: Decimal,
    pub max_value: Option<Decimal>,
    pub count: u64,
    pub total_value: Decimal,
    /// Share of the grant count, 0-100, one decimal place.
    pub percentage: Decimal,
}

pub fn value_distribution(grants: &[Grant]) -> Vec<ValueBand> {
    let total = grants.len() as u64;

    VALUE_BANDS
        .iter()
        .map(|(label, min, max)| {
            let in_band: Vec<Decimal> = grants
                .iter()
                .map(|g| g.agreement_value)
                .filter(|v| v >= min && max.is_none_or(|max| *v < max))
                .collect();
            let count = in_band.len() as u64;
            let percentage = if total == 0 {
                Decimal::ZERO
            } else {
                (Decimal::from(count) / Decimal::from(total) * Decimal::ONE_HUNDRED).round_dp(1)
            };

            ValueBand {
                label: label.to_string(),
                min_value: *min,
                max_value: *max,
                count,
                total_value: in_band.iter().sum(),
                percentage,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    FiscalYear,
    Province,
    Recipient,
    RecipientType,
    Program,
    Sector,
}

impl GroupKey {
    fn read(self, grant: &Grant) -> &str {
        match self {
            Self::FiscalYear => &grant.fiscal_year,
            Self::Province => &grant.recipient_province,
            Self::Recipient => &grant.recipient_legal_name,
            Self::RecipientType => &grant.recipient_type,
            Self::Program => &grant.program_name,
            Self::Sector => &grant.naics_sector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub key: String,
    pub count: u64,
    pub total_value: Decimal,
    pub average_value: Decimal,
}

/// Count, total and average per distinct value of `key`.
///
/// Fiscal years are listed in ascending order, every other key by total
/// value descending. Empty sectors are left out.
pub fn group_by(
    grants: &[Grant],
    key: GroupKey,
) -> Vec<GroupAggregate> {
    let mut groups: BTreeMap<&str, (u64, Decimal)> = BTreeMap::new();
    for grant in grants {
        let name = key.read(grant);
        if key == GroupKey::Sector && name.is_empty() {
            continue;
        }
        let entry = groups.entry(name).or_default();
        entry.0 += 1;
        entry.1 += grant.agreement_value;
    }

    let mut aggregates: Vec<GroupAggregate> = groups
        .into_iter()
        .map(|(name, (count, total_value))| GroupAggregate {
            key: name.to_string(),
            count,
            total_value,
            average_value: average(total_value, count),
        })
        .collect();

    if key != GroupKey::FiscalYear {
        aggregates.sort_by(|a, b| b.total_value.cmp(&a.total_value));
    }
    aggregates
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: GacStatus,
    pub count: u64,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GacSummary {
    pub total_grants: u64,
    pub total_value: Decimal,
    pub average_value: Decimal,
    pub major_count: u64,
    pub major_value: Decimal,
    pub by_status: Vec<StatusCount>,
    pub gender_marker_count: u64,
    pub environment_marker_count: u64,
    pub governance_marker_count: u64,
}

pub fn summarize_gac(grants: &[GlobalAffairsGrant]) -> GacSummary {
    let total_grants = grants.len() as u64;
    let total_value: Decimal = grants.iter().map(|g| g.maximum_contribution).sum();
    let major: Vec<&GlobalAffairsGrant> = grants.iter().filter(|g| g.is_major_funding()).collect();

    let by_status = GacStatus::ALL
        .iter()
        .map(|status| {
            let matching = grants.iter().filter(|g| g.status == *status);
            StatusCount {
                status: *status,
                count: matching.clone().count() as u64,
                total_value: matching.map(|g| g.maximum_contribution).sum(),
            }
        })
        .collect();

    GacSummary {
        total_grants,
        total_value,
        average_value: average(total_value, total_grants),
        major_count: major.len() as u64,
        major_value: major.iter().map(|g| g.maximum_contribution).sum(),
        by_status,
        gender_marker_count: grants.iter().filter(|g| g.has_gender_marker()).count() as u64,
        environment_marker_count: grants.iter().filter(|g| g.has_environment_marker()).count()
            as u64,
        governance_marker_count: grants.iter().filter(|g| g.has_governance_marker()).count()
            as u64,
    }
}

/// The `limit` largest groups of [`group_by`], by total value.
pub fn top_groups(
    grants: &[Grant],
    key: GroupKey,
    limit: usize,
) -> Vec<GroupAggregate> {
    let mut groups = group_by(grants, key);
    groups.truncate(limit);
    groups
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn grant(
        value: Decimal,
        province: &str,
        fiscal_year: &str,
    ) -> Grant {
        Grant {
            agreement_value: value,
            recipient_province: province.to_string(),
            fiscal_year: fiscal_year.to_string(),
            is_major_funding: crate::is_major_funding(value),
            ..Grant::default()
        }
    }

    fn corpus() -> Vec<Grant> {
        vec![
            grant(dec!(5000), "ON", "2023-24"),
            grant(dec!(10000), "QC", "2022-23"),
            grant(dec!(75000), "ON", "2023-24"),
            grant(dec!(2000000), "BC", "2023-24"),
        ]
    }

    // ===== summary tests =====

    #[test]
    fn summary_of_empty_corpus_is_zero() {
        assert_eq!(summarize(&[]), GrantSummary::default());
    }

    #[test]
    fn summary_counts_and_median() {
        let summary = summarize(&corpus());

        assert_eq!(summary.total_grants, 4);
        assert_eq!(summary.total_value, dec!(2090000));
        assert_eq!(summary.average_value, dec!(522500));
        // sorted[4 / 2]
        assert_eq!(summary.median_value, dec!(75000));
        assert_eq!(summary.province_count, 3);
        assert_eq!(summary.major_count, 1);
    }

    // ===== distribution tests =====

    #[test]
    fn band_bounds_are_lower_inclusive() {
        let bands = value_distribution(&corpus());
        let counts: Vec<u64> = bands.iter().map(|b| b.count).collect();

        assert_eq!(counts, vec![1, 1, 1, 0, 0, 1, 0]);
        assert_eq!(bands[1].total_value, dec!(10000));
        assert_eq!(bands[0].percentage, dec!(25.0));
    }

    #[test]
    fn percentages_round_to_one_place() {
        let grants = vec![
            grant(dec!(1), "ON", "2023-24"),
            grant(dec!(1), "ON", "2023-24"),
            grant(dec!(20000), "ON", "2023-24"),
        ];

        let bands = value_distribution(&grants);

        assert_eq!(bands[0].percentage, dec!(66.7));
        assert_eq!(bands[1].percentage, dec!(33.3));
    }

    // ===== group_by tests =====

    #[test]
    fn fiscal_years_are_ascending() {
        let groups = group_by(&corpus(), GroupKey::FiscalYear);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();

        assert_eq!(keys, vec!["2022-23", "2023-24"]);
        assert_eq!(groups[1].count, 3);
    }

    #[test]
    fn provinces_are_ordered_by_total() {
        let groups = group_by(&corpus(), GroupKey::Province);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();

        assert_eq!(keys, vec!["BC", "ON", "QC"]);
        assert_eq!(groups[1].average_value, dec!(40000));
    }

    #[test]
    fn programs_and_recipients_group_by_name() {
        let mut grants = corpus();
        grants[0].program_name = "Canada Summer Jobs".to_string();
        grants[2].program_name = "Canada Summer Jobs".to_string();
        grants[3].program_name = "Strategic Innovation Fund".to_string();
        grants[3].recipient_legal_name = "Coastal Climate Lab".to_string();

        let programs = group_by(&grants, GroupKey::Program);
        let recipients = group_by(&grants, GroupKey::Recipient);

        assert_eq!(programs[0].key, "Strategic Innovation Fund");
        assert_eq!(programs[1].key, "Canada Summer Jobs");
        assert_eq!(programs[1].total_value, dec!(80000));
        assert_eq!(recipients[0].key, "Coastal Climate Lab");
        assert_eq!(recipients.len(), 2);
    }

    #[test]
    fn top_groups_keep_the_largest() {
        let top = top_groups(&corpus(), GroupKey::Province, 2);
        let keys: Vec<&str> = top.iter().map(|g| g.key.as_str()).collect();

        assert_eq!(keys, vec!["BC", "ON"]);
        assert_eq!(top_groups(&corpus(), GroupKey::Province, 10).len(), 3);
    }

    #[test]
    fn empty_sectors_are_skipped() {
        let groups = group_by(&corpus(), GroupKey::Sector);

        assert!(groups.is_empty());
    }

    // ===== GAC summary tests =====

    #[test]
    fn gac_summary_counts_by_status() {
        let grants = vec![
            GlobalAffairsGrant {
                maximum_contribution: dec!(2000000),
                status: GacStatus::Closed,
                policy_markers: "Gender equality: principal".to_string(),
                ..GlobalAffairsGrant::default()
            },
            GlobalAffairsGrant {
                maximum_contribution: dec!(500),
                status: GacStatus::Operational,
                ..GlobalAffairsGrant::default()
            },
        ];

        let summary = summarize_gac(&grants);

        assert_eq!(summary.total_grants, 2);
        assert_eq!(summary.major_count, 1);
        assert_eq!(summary.major_value, dec!(2000000));
        assert_eq!(summary.gender_marker_count, 1);
        let counts: Vec<(GacStatus, u64)> =
            summary.by_status.iter().map(|s| (s.status, s.count)).collect();
        assert_eq!(
            counts,
            vec![
                (GacStatus::Operational, 1),
                (GacStatus::Closed, 1),
                (GacStatus::Terminating, 0),
            ]
        );
    }
}
