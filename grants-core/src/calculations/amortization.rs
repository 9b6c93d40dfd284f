//! Multi-year amortization of grant values.
//!
//! Each grant's value is spread evenly across the calendar years its project
//! runs, and the taxpayer's share of each annual slice is accumulated into a
//! per-year bucket. Years before `taxpayer_since_year` are not counted.
//!
//! When dates are missing, the project span is inferred:
//!
//! | Source   | Dates present | Span                                                   |
//! |----------|---------------|--------------------------------------------------------|
//! | Domestic | start and end | `start.year ..= end.year`                              |
//! | Domestic | start only    | `start.year ..= fy` if `fy > start.year`, else `+ 2`   |
//! | Domestic | no start      | `fy ..= fy`                                            |
//! | GAC      | either absent | the absent side takes the status default (see below)   |
//!
//! GAC status defaults, relative to the current year:
//!
//! | Status      | Start | End          |
//! |-------------|-------|--------------|
//! | operational | 2018  | current + 2  |
//! | closed      | 2015  | current − 1  |
//! | terminating | 2018  | current      |
//!
//! A domestic grant whose fiscal year has no leading four digits is skipped.

use std::collections::BTreeMap;

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::common::checked_divide;
use super::error::CalculationError;
use super::share::GrantShareAllocator;
use crate::{GacStatus, GlobalAffairsGrant, Grant};

const TITLE_DISPLAY_CHARS: usize = 50;
const RECIPIENT_DISPLAY_CHARS: usize = 40;

/// Yearly buckets keyed by calendar year, iterated in ascending order.
pub type YearlyContributions = BTreeMap<i32, YearlyContribution>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantKind {
    Domestic,
    Gac,
}

/// One grant's slice of a single year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContribution {
    pub title: String,
    pub recipient: String,
    pub annual_value: Decimal,
    pub user_annual_share: Decimal,
    pub total_value: Decimal,
    pub duration_years: i32,
    pub start_year: i32,
    pub end_year: i32,
    pub grant_type: GrantKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyContribution {
    pub total_contribution: Decimal,
    pub domestic_contribution: Decimal,
    pub gac_contribution: Decimal,
    pub grant_count: u32,
    pub domestic_count: u32,
    pub gac_count: u32,
    pub projects: Vec<ProjectContribution>,
}

impl YearlyContribution {
    fn record(
        &mut self,
        project: ProjectContribution,
    ) {
        let share = project.user_annual_share;
        self.total_contribution += share;
        self.grant_count += 1;
        match project.grant_type {
            GrantKind::Domestic => {
                self.domestic_contribution += share;
                self.domestic_count += 1;
            }
            GrantKind::Gac => {
                self.gac_contribution += share;
                self.gac_count += 1;
            }
        }
        self.projects.push(project);
    }

    /// The `n` projects with the largest annual share. Ties keep insertion order.
    pub fn top_projects(
        &self,
        n: usize,
    ) -> Vec<ProjectContribution> {
        let mut projects = self.projects.clone();
        projects.sort_by(|a, b| b.user_annual_share.cmp(&a.user_annual_share));
        projects.truncate(n);
        projects
    }
}

/// Inclusive range of calendar years a project runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSpan {
    pub start_year: i32,
    pub end_year: i32,
}

impl YearSpan {
    pub fn new(
        start_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            start_year,
            end_year,
        }
    }

    /// Number of years the value is spread over; never less than one.
    pub fn duration(&self) -> i32 {
        (self.end_year - self.start_year + 1).max(1)
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }
}

/// Infers the span of a domestic grant, or `None` if it has no usable fiscal year.
pub fn domestic_span(grant: &Grant) -> Option<YearSpan> {
    let fiscal_year = grant.fiscal_start_year()?;

    let span = match (grant.agreement_start_date, grant.agreement_end_date) {
        (Some(start), Some(end)) => YearSpan::new(start.year(), end.year()),
        (Some(start), None) => {
            let start_year = start.year();
            let end_year = if fiscal_year > start_year {
                fiscal_year
            } else {
                start_year + 2
            };
            YearSpan::new(start_year, end_year)
        }
        (None, _) => YearSpan::new(fiscal_year, fiscal_year),
    };
    Some(span)
}

fn status_defaults(
    status: GacStatus,
    current_year: i32,
) -> (i32, i32) {
    match status {
        GacStatus::Operational => (2018, current_year + 2),
        GacStatus::Closed => (2015, current_year - 1),
        GacStatus::Terminating => (2018, current_year),
    }
}

/// Infers the span of a GAC grant, or `None` if it would start after it ends.
pub fn gac_span(
    grant: &GlobalAffairsGrant,
    current_year: i32,
) -> Option<YearSpan> {
    let (default_start, default_end) = status_defaults(grant.status, current_year);
    let start_year = grant.start_date.map_or(default_start, |d| d.year());
    let end_year = grant.end_date.map_or(default_end, |d| d.year());

    (start_year <= end_year).then(|| YearSpan::new(start_year, end_year))
}

/// Truncates to `max_chars` characters, marking the cut with `...`.
pub fn truncate_with_ellipsis(
    text: &str,
    max_chars: usize,
) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Spreads grant values over their project years for one taxpayer.
#[derive(Debug, Clone, Copy)]
pub struct AmortizationEngine {
    allocator: GrantShareAllocator,
    taxpayer_since_year: i32,
    current_year: i32,
}

impl AmortizationEngine {
    pub fn new(
        allocator: GrantShareAllocator,
        taxpayer_since_year: i32,
        current_year: i32,
    ) -> Self {
        Self {
            allocator,
            taxpayer_since_year,
            current_year,
        }
    }

    /// Builds the per-year buckets from domestic grants, then GAC grants,
    /// each in input order. Pass an empty GAC slice to leave them out.
    pub fn yearly_contributions(
        &self,
        grants: &[Grant],
        gac_grants: &[GlobalAffairsGrant],
    ) -> Result<YearlyContributions, CalculationError> {
        let mut yearly = YearlyContributions::new();
        let mut skipped = 0usize;

        for grant in grants {
            let Some(span) = domestic_span(grant) else {
                skipped += 1;
                continue;
            };
            self.spread(
                &mut yearly,
                span,
                grant.agreement_value,
                &grant.agreement_title,
                &grant.recipient_legal_name,
                GrantKind::Domestic,
            )?;
        }

        for grant in gac_grants {
            let Some(span) = gac_span(grant, self.current_year) else {
                skipped += 1;
                continue;
            };
            self.spread(
                &mut yearly,
                span,
                grant.maximum_contribution,
                &grant.title,
                grant.primary_country(),
                GrantKind::Gac,
            )?;
        }

        debug!(
            domestic = grants.len(),
            gac = gac_grants.len(),
            skipped,
            years = yearly.len(),
            "amortized grants"
        );
        Ok(yearly)
    }

    fn spread(
        &self,
        yearly: &mut YearlyContributions,
        span: YearSpan,
        total_value: Decimal,
        title: &str,
        recipient: &str,
        grant_type: GrantKind,
    ) -> Result<(), CalculationError> {
        let duration = span.duration();
        let annual_value = checked_divide(total_value, Decimal::from(duration), "annual amount")?;
        let user_annual_share = self.allocator.share_of(annual_value);

        for year in span.years().filter(|y| *y >= self.taxpayer_since_year) {
            yearly.entry(year).or_default().record(ProjectContribution {
                title: truncate_with_ellipsis(title, TITLE_DISPLAY_CHARS),
                recipient: truncate_with_ellipsis(recipient, RECIPIENT_DISPLAY_CHARS),
                annual_value,
                user_annual_share,
                total_value,
                duration_years: duration,
                start_year: span.start_year,
                end_year: span.end_year,
                grant_type,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn date(
        year: i32,
        month: u32,
        day: u32,
    ) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn domestic(
        value: Decimal,
        fiscal_year: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Grant {
        Grant {
            agreement_title: "Community Hall Renewal".to_string(),
            recipient_legal_name: "Town of Example".to_string(),
            agreement_value: value,
            fiscal_year: fiscal_year.to_string(),
            agreement_start_date: start,
            agreement_end_date: end,
            ..Grant::default()
        }
    }

    fn gac(
        value: Decimal,
        status: GacStatus,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> GlobalAffairsGrant {
        GlobalAffairsGrant {
            title: "Water Access".to_string(),
            country: "Ghana: 60.00%; Mali: 40.00%".to_string(),
            maximum_contribution: value,
            status,
            start_date: start,
            end_date: end,
            ..GlobalAffairsGrant::default()
        }
    }

    // 1 share point per 100 of value keeps the arithmetic readable.
    fn engine(since: i32) -> AmortizationEngine {
        AmortizationEngine::new(GrantShareAllocator::new(dec!(1), dec!(100)), since, 2025)
    }

    // =========================================================================
    // span inference tests
    // =========================================================================

    #[test]
    fn domestic_span_uses_both_dates() {
        let grant = domestic(dec!(1), "2020-21", date(2020, 1, 1), date(2022, 12, 31));

        assert_eq!(domestic_span(&grant), Some(YearSpan::new(2020, 2022)));
    }

    #[test]
    fn domestic_span_without_dates_is_fiscal_year() {
        let grant = domestic(dec!(1), "2023-24", None, None);

        assert_eq!(domestic_span(&grant), Some(YearSpan::new(2023, 2023)));
    }

    #[test]
    fn domestic_span_without_start_ignores_end_date() {
        let grant = domestic(dec!(1), "2023-24", None, date(2027, 3, 31));

        assert_eq!(domestic_span(&grant), Some(YearSpan::new(2023, 2023)));
    }

    #[test]
    fn domestic_span_with_start_only_extends_to_later_fiscal_year() {
        let grant = domestic(dec!(1), "2024-25", date(2021, 6, 1), None);

        assert_eq!(domestic_span(&grant), Some(YearSpan::new(2021, 2024)));
    }

    #[test]
    fn domestic_span_with_start_only_defaults_to_three_years() {
        let grant = domestic(dec!(1), "2021-22", date(2021, 6, 1), None);

        assert_eq!(domestic_span(&grant), Some(YearSpan::new(2021, 2023)));
    }

    #[test]
    fn domestic_span_requires_fiscal_year_even_with_dates() {
        let grant = domestic(dec!(1), "unknown", date(2020, 1, 1), date(2021, 1, 1));

        assert_eq!(domestic_span(&grant), None);
    }

    #[test]
    fn closed_gac_without_dates_spans_defaults() {
        let grant = gac(dec!(1), GacStatus::Closed, None, None);

        assert_eq!(gac_span(&grant, 2025), Some(YearSpan::new(2015, 2024)));
    }

    #[test]
    fn operational_gac_fills_only_missing_end() {
        let grant = gac(dec!(1), GacStatus::Operational, date(2022, 4, 1), None);

        assert_eq!(gac_span(&grant, 2025), Some(YearSpan::new(2022, 2027)));
    }

    #[test]
    fn terminating_gac_starting_after_default_end_is_skipped() {
        let grant = gac(dec!(1), GacStatus::Terminating, date(2030, 1, 1), None);

        assert_eq!(gac_span(&grant, 2025), None);
    }

    #[test]
    fn duration_is_at_least_one_year() {
        assert_eq!(YearSpan::new(2024, 2024).duration(), 1);
        assert_eq!(YearSpan::new(2024, 2020).duration(), 1);
        assert_eq!(YearSpan::new(2020, 2022).duration(), 3);
    }

    // =========================================================================
    // truncate_with_ellipsis tests
    // =========================================================================

    #[test]
    fn truncation_keeps_short_text() {
        assert_eq!(truncate_with_ellipsis("short", 50), "short");
        assert_eq!(truncate_with_ellipsis(&"x".repeat(50), 50), "x".repeat(50));
    }

    #[test]
    fn truncation_cuts_on_characters() {
        assert_eq!(truncate_with_ellipsis("Développement", 4), "Déve...");
    }

    // =========================================================================
    // yearly_contributions tests
    // =========================================================================

    #[test]
    fn value_is_spread_evenly_over_project_years() {
        let grants = [domestic(dec!(300000), "2020-21", date(2020, 1, 1), date(2022, 12, 31))];

        let yearly = engine(2018).yearly_contributions(&grants, &[]).unwrap();

        assert_eq!(yearly.keys().copied().collect::<Vec<_>>(), vec![2020, 2021, 2022]);
        for bucket in yearly.values() {
            let project = &bucket.projects[0];
            assert_eq!(project.annual_value, dec!(100000));
            assert_eq!(project.duration_years, 3);
            assert_eq!(bucket.total_contribution, dec!(100000) / dec!(100));
            assert_eq!(bucket.domestic_count, 1);
        }
    }

    #[test]
    fn years_before_taxpayer_since_are_excluded() {
        let grants = [domestic(dec!(300000), "2020-21", date(2020, 1, 1), date(2022, 12, 31))];

        let yearly = engine(2021).yearly_contributions(&grants, &[]).unwrap();

        assert_eq!(yearly.keys().copied().collect::<Vec<_>>(), vec![2021, 2022]);
        // The slice size still reflects the full three-year span.
        assert_eq!(yearly[&2021].projects[0].annual_value, dec!(100000));
    }

    #[test]
    fn reversed_domestic_dates_contribute_nothing() {
        let grants = [domestic(dec!(5000), "2022-23", date(2023, 1, 1), date(2021, 1, 1))];

        let yearly = engine(2018).yearly_contributions(&grants, &[]).unwrap();

        assert!(yearly.is_empty());
    }

    #[test]
    fn domestic_and_gac_are_tallied_separately() {
        let grants = [domestic(dec!(1000), "2023-24", None, None)];
        let gac_grants = [gac(
            dec!(2000),
            GacStatus::Operational,
            date(2023, 1, 1),
            date(2023, 12, 31),
        )];

        let yearly = engine(2018).yearly_contributions(&grants, &gac_grants).unwrap();
        let bucket = &yearly[&2023];

        assert_eq!(bucket.domestic_contribution, dec!(10));
        assert_eq!(bucket.gac_contribution, dec!(20));
        assert_eq!(bucket.total_contribution, dec!(30));
        assert_eq!((bucket.grant_count, bucket.domestic_count, bucket.gac_count), (2, 1, 1));
        assert_eq!(bucket.projects[0].grant_type, GrantKind::Domestic);
        assert_eq!(bucket.projects[1].grant_type, GrantKind::Gac);
        assert_eq!(bucket.projects[1].recipient, "Ghana");
    }

    #[test]
    fn project_titles_are_truncated_for_display() {
        let mut grant = domestic(dec!(1000), "2023-24", None, None);
        grant.agreement_title = "A".repeat(60);

        let yearly = engine(2018).yearly_contributions(&[grant], &[]).unwrap();

        assert_eq!(yearly[&2023].projects[0].title, format!("{}...", "A".repeat(50)));
    }

    #[test]
    fn top_projects_orders_by_share_and_keeps_ties_stable() {
        let grants = [
            domestic(dec!(100), "2023-24", None, None),
            domestic(dec!(300), "2023-24", None, None),
            domestic(dec!(100), "2023-24", None, None),
        ];
        let mut yearly = engine(2018).yearly_contributions(&grants, &[]).unwrap();
        let bucket = yearly.remove(&2023).unwrap();

        let top = bucket.top_projects(2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].total_value, dec!(300));
        assert_eq!(top[1], bucket.projects[0]);
    }
}
