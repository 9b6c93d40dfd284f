//! The contribution report: a taxpayer's tax breakdown composed with the
//! grant corpus.
//!
//! [`ContributionReport::build`] is pure. Given the same calculation, grants
//! and current year it always produces an equal report.

use std::collections::BTreeMap;

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amortization::{
    AmortizationEngine, GrantKind, ProjectContribution, YearlyContribution, truncate_with_ellipsis,
};
use super::common::check_amount;
use super::error::{CalculationError, ValidationError};
use super::formatting::Amount;
use super::projection::{FutureProjection, ProjectedYear, Scenario};
use super::share::GrantShareAllocator;
use crate::{GlobalAffairsGrant, Grant, TaxCalculation};

pub const DEFAULT_TAXPAYER_SINCE_YEAR: i32 = 2018;
pub const DEFAULT_SESSION_KEY: &str = "anonymous";

const NOTABLE_DOMESTIC_CATEGORY: &str = "Notable Domestic Grant";
const MAJOR_INTERNATIONAL_CATEGORY: &str = "Major International Development";
const FEATURED_GRANTS_PER_SOURCE: usize = 5;
const TOP_PROJECTS_PER_YEAR: usize = 5;
const DESCRIPTION_DISPLAY_CHARS: usize = 200;

fn default_since_year() -> i32 {
    DEFAULT_TAXPAYER_SINCE_YEAR
}

fn default_include_gac() -> bool {
    true
}

fn default_session_key() -> String {
    DEFAULT_SESSION_KEY.to_string()
}

/// Caller input for one contribution calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub annual_income: Decimal,
    pub gst_eligible_spending: Decimal,
    #[serde(default = "default_since_year")]
    pub taxpayer_since_year: i32,
    #[serde(default = "default_include_gac")]
    pub include_gac: bool,
    #[serde(default = "default_session_key")]
    pub session_key: String,
}

impl CalculationRequest {
    pub fn new(
        annual_income: Decimal,
        gst_eligible_spending: Decimal,
    ) -> Self {
        Self {
            annual_income,
            gst_eligible_spending,
            taxpayer_since_year: DEFAULT_TAXPAYER_SINCE_YEAR,
            include_gac: true,
            session_key: default_session_key(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_amount("annual_income", self.annual_income)?;
        check_amount("gst_eligible_spending", self.gst_eligible_spending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationSummary {
    pub annual_income: Amount,
    pub monthly_income: Amount,
    pub gst_eligible_spending: Amount,
    pub monthly_gst_spending: Amount,
    pub federal_income_tax: Amount,
    pub monthly_federal_tax: Amount,
    pub gst_paid: Amount,
    pub monthly_gst_paid: Amount,
    pub total_tax_contribution: Amount,
    pub monthly_tax_contribution: Amount,
    pub revenue_share_percentage: Decimal,
    pub grants_allocation_percentage: Decimal,
    pub grants_portion_of_taxes: Amount,
    pub monthly_grants_portion: Amount,
    pub taxpayer_since_year: i32,
}

impl CalculationSummary {
    fn from_calculation(calculation: &TaxCalculation) -> Self {
        let contribution = calculation.contribution();
        Self {
            annual_income: contribution.annual_income.into(),
            monthly_income: contribution.monthly_income.into(),
            gst_eligible_spending: contribution.gst_eligible_spending.into(),
            monthly_gst_spending: contribution.monthly_gst_spending.into(),
            federal_income_tax: contribution.federal_income_tax.into(),
            monthly_federal_tax: contribution.monthly_federal_tax.into(),
            gst_paid: contribution.gst_paid.into(),
            monthly_gst_paid: contribution.monthly_gst_paid.into(),
            total_tax_contribution: contribution.total_tax_contribution.into(),
            monthly_tax_contribution: contribution.monthly_tax_contribution.into(),
            revenue_share_percentage: contribution.revenue_share_percentage,
            grants_allocation_percentage: contribution.grants_allocation_percentage,
            grants_portion_of_taxes: contribution.grants_portion_of_taxes().into(),
            monthly_grants_portion: contribution.monthly_grants_portion().into(),
            taxpayer_since_year: calculation.taxpayer_since_year,
        }
    }
}

/// A featured grant with the taxpayer's share of its full value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantShare {
    pub id: String,
    pub title: String,
    pub total_value: Amount,
    pub user_share: Amount,
    pub recipient: String,
    pub fiscal_year: String,
    pub grant_type: GrantKind,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub title: String,
    pub recipient: String,
    pub annual_value: Amount,
    pub user_annual_share: Amount,
    pub total_value: Amount,
    pub duration_years: i32,
    pub start_year: i32,
    pub end_year: i32,
    pub grant_type: GrantKind,
}

impl From<ProjectContribution> for ProjectSummary {
    fn from(project: ProjectContribution) -> Self {
        Self {
            title: project.title,
            recipient: project.recipient,
            annual_value: project.annual_value.into(),
            user_annual_share: project.user_annual_share.into(),
            total_value: project.total_value.into(),
            duration_years: project.duration_years,
            start_year: project.start_year,
            end_year: project.end_year,
            grant_type: project.grant_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBreakdown {
    pub year: i32,
    pub total_contribution: Amount,
    pub domestic_contribution: Amount,
    pub gac_contribution: Amount,
    pub grant_count: u32,
    pub domestic_count: u32,
    pub gac_count: u32,
    pub top_projects: Vec<ProjectSummary>,
}

impl YearBreakdown {
    fn new(
        year: i32,
        contribution: &YearlyContribution,
    ) -> Self {
        Self {
            year,
            total_contribution: contribution.total_contribution.into(),
            domestic_contribution: contribution.domestic_contribution.into(),
            gac_contribution: contribution.gac_contribution.into(),
            grant_count: contribution.grant_count,
            domestic_count: contribution.domestic_count,
            gac_count: contribution.gac_count,
            top_projects: contribution
                .top_projects(TOP_PROJECTS_PER_YEAR)
                .into_iter()
                .map(ProjectSummary::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedAmount {
    pub total_contribution: Amount,
    pub grant_count: u32,
    pub scenario: Scenario,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_new_contribution: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuing_contribution: Option<Amount>,
}

impl From<&ProjectedYear> for ProjectedAmount {
    fn from(year: &ProjectedYear) -> Self {
        Self {
            total_contribution: year.total_contribution.into(),
            grant_count: year.grant_count,
            scenario: year.scenario,
            estimated_new_contribution: year.estimated_new_contribution.map(Amount::new),
            continuing_contribution: year.continuing_contribution.map(Amount::new),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub continuing_only: BTreeMap<i32, ProjectedAmount>,
    pub with_new_projects: BTreeMap<i32, ProjectedAmount>,
    pub historical_average: Amount,
    pub historical_average_count: u32,
}

impl From<&FutureProjection> for ProjectionSummary {
    fn from(projection: &FutureProjection) -> Self {
        let convert = |years: &BTreeMap<i32, ProjectedYear>| {
            years
                .iter()
                .map(|(year, projected)| (*year, ProjectedAmount::from(projected)))
                .collect()
        };
        Self {
            continuing_only: convert(&projection.continuing_only),
            with_new_projects: convert(&projection.with_new_projects),
            historical_average: projection.historical_average.annual_contribution.into(),
            historical_average_count: projection.historical_average.grant_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTotals {
    pub value: Amount,
    pub share: Amount,
    /// Share of the combined total, 0-100.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub domestic: SourceTotals,
    pub gac: SourceTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_grants_value: Amount,
    pub total_grants_share: Amount,
    pub monthly_grants_share: Amount,
    pub breakdown: Breakdown,
}

impl Totals {
    fn compute(
        allocator: &GrantShareAllocator,
        domestic_value: Decimal,
        gac_value: Decimal,
    ) -> Self {
        let domestic_share = allocator.share_of(domestic_value);
        let gac_share = allocator.share_of(gac_value);
        let total_value = domestic_value + gac_value;
        let total_share = domestic_share + gac_share;

        let percentage = |share: Decimal| {
            if total_share.is_zero() {
                Decimal::ZERO
            } else {
                share / total_share * Decimal::ONE_HUNDRED
            }
        };

        Self {
            total_grants_value: total_value.into(),
            total_grants_share: total_share.into(),
            monthly_grants_share: allocator.monthly_share_of(total_value).into(),
            breakdown: Breakdown {
                domestic: SourceTotals {
                    value: domestic_value.into(),
                    share: domestic_share.into(),
                    percentage: percentage(domestic_share),
                },
                gac: SourceTotals {
                    value: gac_value.into(),
                    share: gac_share.into(),
                    percentage: percentage(gac_share),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionReport {
    pub calculation: CalculationSummary,
    pub grant_shares: Vec<GrantShare>,
    pub yearly_breakdown: Vec<YearBreakdown>,
    pub future_projections: ProjectionSummary,
    pub totals: Totals,
    pub include_gac: bool,
}

impl ContributionReport {
    /// Composes the full report for a recorded calculation.
    ///
    /// When `include_gac` is false, GAC grants are left out of the shares,
    /// the yearly breakdown and the totals. Future projections always
    /// amortize the whole corpus, GAC included.
    pub fn build(
        calculation: &TaxCalculation,
        grants: &[Grant],
        gac_grants: &[GlobalAffairsGrant],
        include_gac: bool,
        current_year: i32,
        projection_years: u32,
    ) -> Result<Self, CalculationError> {
        let all_gac_grants = gac_grants;
        let gac_grants: &[GlobalAffairsGrant] = if include_gac { gac_grants } else { &[] };
        let allocator = calculation.allocator();
        let engine =
            AmortizationEngine::new(allocator, calculation.taxpayer_since_year, current_year);

        let yearly = engine.yearly_contributions(grants, gac_grants)?;
        let projection = if include_gac {
            FutureProjection::project(&yearly, current_year, projection_years)
        } else {
            let whole_corpus = engine.yearly_contributions(grants, all_gac_grants)?;
            FutureProjection::project(&whole_corpus, current_year, projection_years)
        };

        let domestic_value: Decimal = grants.iter().map(|g| g.agreement_value).sum();
        let gac_value: Decimal = gac_grants.iter().map(|g| g.maximum_contribution).sum();

        Ok(Self {
            calculation: CalculationSummary::from_calculation(calculation),
            grant_shares: featured_grant_shares(&allocator, grants, gac_grants),
            yearly_breakdown: yearly
                .iter()
                .map(|(year, contribution)| YearBreakdown::new(*year, contribution))
                .collect(),
            future_projections: ProjectionSummary::from(&projection),
            totals: Totals::compute(&allocator, domestic_value, gac_value),
            include_gac,
        })
    }
}

/// Top notable domestic grants and top major GAC grants, largest share first.
fn featured_grant_shares(
    allocator: &GrantShareAllocator,
    grants: &[Grant],
    gac_grants: &[GlobalAffairsGrant],
) -> Vec<GrantShare> {
    let mut notable: Vec<&Grant> = grants.iter().filter(|g| g.is_notable).collect();
    notable.sort_by(|a, b| {
        b.agreement_value
            .cmp(&a.agreement_value)
            .then_with(|| b.agreement_start_date.cmp(&a.agreement_start_date))
    });

    let mut major: Vec<&GlobalAffairsGrant> =
        gac_grants.iter().filter(|g| g.is_major_funding()).collect();
    major.sort_by(|a, b| b.maximum_contribution.cmp(&a.maximum_contribution));

    let domestic = notable
        .into_iter()
        .take(FEATURED_GRANTS_PER_SOURCE)
        .map(|grant| GrantShare {
            id: grant.id.to_string(),
            title: grant.agreement_title.clone(),
            total_value: grant.agreement_value.into(),
            user_share: allocator.share_of(grant.agreement_value).into(),
            recipient: grant.recipient_legal_name.clone(),
            fiscal_year: grant.fiscal_year.clone(),
            grant_type: GrantKind::Domestic,
            category: NOTABLE_DOMESTIC_CATEGORY.to_string(),
        });

    let international = major
        .into_iter()
        .take(FEATURED_GRANTS_PER_SOURCE)
        .map(|grant| GrantShare {
            id: format!("gac_{}", grant.id),
            title: grant.title.clone(),
            total_value: grant.maximum_contribution.into(),
            user_share: allocator.share_of(grant.maximum_contribution).into(),
            recipient: grant.primary_country().to_string(),
            fiscal_year: grant
                .start_date
                .map_or_else(|| "N/A".to_string(), |d| d.year().to_string()),
            grant_type: GrantKind::Gac,
            category: MAJOR_INTERNATIONAL_CATEGORY.to_string(),
        });

    let mut shares: Vec<GrantShare> = domestic.chain(international).collect();
    shares.sort_by(|a, b| b.user_share.value.cmp(&a.user_share.value));
    shares
}

/// One grant seen through a recorded calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantShareLookup {
    pub grant_id: i64,
    pub title: String,
    pub recipient: String,
    pub description: String,
    pub fiscal_year: String,
    pub total_value: Amount,
    pub user_share: Amount,
    pub monthly_share: Amount,
    pub percentage_of_income: Decimal,
    pub is_notable: bool,
    pub notable_reason: String,
}

impl GrantShareLookup {
    pub fn new(
        calculation: &TaxCalculation,
        grant: &Grant,
    ) -> Self {
        let allocator = calculation.allocator();
        let share = allocator.share_of(grant.agreement_value);

        Self {
            grant_id: grant.id,
            title: grant.agreement_title.clone(),
            recipient: grant.recipient_legal_name.clone(),
            description: truncate_with_ellipsis(&grant.description, DESCRIPTION_DISPLAY_CHARS),
            fiscal_year: grant.fiscal_year.clone(),
            total_value: grant.agreement_value.into(),
            user_share: share.into(),
            monthly_share: allocator.monthly_share_of(grant.agreement_value).into(),
            percentage_of_income: GrantShareAllocator::percentage_of_income(
                share,
                calculation.annual_income,
            ),
            is_notable: grant.is_notable,
            notable_reason: grant.notable_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::GacStatus;

    fn calculation() -> TaxCalculation {
        TaxCalculation {
            id: 1,
            session_key: "s1".to_string(),
            annual_income: dec!(100000),
            monthly_income: dec!(100000) / dec!(12),
            gst_eligible_spending: dec!(20000),
            monthly_gst_spending: dec!(20000) / dec!(12),
            taxpayer_since_year: 2018,
            federal_income_tax: dec!(17571.72),
            monthly_federal_tax: dec!(17571.72) / dec!(12),
            gst_paid: dec!(1000),
            monthly_gst_paid: dec!(1000) / dec!(12),
            total_tax_contribution: dec!(18571.72),
            monthly_tax_contribution: dec!(18571.72) / dec!(12),
            // Effective share of 1: a grant's user share is value / 100.
            revenue_share_percentage: dec!(1),
            grants_allocation_percentage: dec!(100),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn domestic(
        id: i64,
        value: Decimal,
        notable: bool,
        start: Option<NaiveDate>,
    ) -> Grant {
        Grant {
            id,
            agreement_title: format!("Grant {id}"),
            recipient_legal_name: "Recipient".to_string(),
            agreement_value: value,
            fiscal_year: "2023-24".to_string(),
            agreement_start_date: start,
            agreement_end_date: start,
            is_notable: notable,
            ..Grant::default()
        }
    }

    fn gac(
        id: i64,
        value: Decimal,
    ) -> GlobalAffairsGrant {
        GlobalAffairsGrant {
            id,
            title: format!("Project {id}"),
            country: "Kenya: 100.00%".to_string(),
            maximum_contribution: value,
            status: GacStatus::Operational,
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31),
            ..GlobalAffairsGrant::default()
        }
    }

    fn corpus() -> (Vec<Grant>, Vec<GlobalAffairsGrant>) {
        let grants = vec![
            domestic(1, dec!(50000), true, NaiveDate::from_ymd_opt(2023, 5, 1)),
            domestic(2, dec!(2000), false, None),
            domestic(3, dec!(50000), true, NaiveDate::from_ymd_opt(2024, 5, 1)),
        ];
        let gac_grants = vec![gac(7, dec!(4000000)), gac(8, dec!(500))];
        (grants, gac_grants)
    }

    fn build(include_gac: bool) -> ContributionReport {
        let (grants, gac_grants) = corpus();
        ContributionReport::build(&calculation(), &grants, &gac_grants, include_gac, 2025, 10)
            .unwrap()
    }

    // ===== request tests =====

    #[test]
    fn request_defaults_apply_when_deserializing() {
        let request: CalculationRequest =
            serde_json::from_str(r#"{"annual_income":"50000","gst_eligible_spending":"1000"}"#)
                .unwrap();

        assert_eq!(request, CalculationRequest::new(dec!(50000), dec!(1000)));
        assert_eq!(request.session_key, "anonymous");
        assert_eq!(request.taxpayer_since_year, 2018);
        assert!(request.include_gac);
    }

    #[test]
    fn request_rejects_negative_income() {
        let request = CalculationRequest::new(dec!(-5), dec!(0));

        assert_eq!(
            request.validate(),
            Err(ValidationError::NegativeAmount {
                field: "annual_income",
                value: dec!(-5),
            })
        );
    }

    // ===== build tests =====

    #[test]
    fn build_is_deterministic() {
        assert_eq!(build(true), build(true));
    }

    #[test]
    fn grant_shares_rank_notable_and_major_grants() {
        let report = build(true);

        let ids: Vec<&str> = report.grant_shares.iter().map(|s| s.id.as_str()).collect();

        // GAC 7 has the largest share; equal-value domestic grants order by later start.
        assert_eq!(ids, vec!["gac_7", "3", "1"]);
        assert_eq!(report.grant_shares[0].category, "Major International Development");
        assert_eq!(report.grant_shares[0].recipient, "Kenya");
        assert_eq!(report.grant_shares[0].fiscal_year, "2022");
        assert_eq!(report.grant_shares[0].user_share.value, dec!(40000));
        assert_eq!(report.grant_shares[1].category, "Notable Domestic Grant");
    }

    #[test]
    fn excluding_gac_drops_international_everywhere() {
        let report = build(false);

        assert!(report.grant_shares.iter().all(|s| s.grant_type == GrantKind::Domestic));
        assert!(report.yearly_breakdown.iter().all(|y| y.gac_count == 0));
        assert_eq!(report.totals.total_grants_value.value, dec!(102000));
        assert_eq!(report.totals.breakdown.gac.percentage, Decimal::ZERO);
        assert_eq!(report.totals.breakdown.domestic.percentage, dec!(100));
        assert!(!report.include_gac);
    }

    #[test]
    fn projections_cover_gac_even_when_excluded() {
        let without_gac = build(false);
        let with_gac = build(true);

        assert_eq!(without_gac.future_projections, with_gac.future_projections);
        let domestic_only_2023 = without_gac
            .yearly_breakdown
            .iter()
            .find(|y| y.year == 2023)
            .map(|y| y.total_contribution.value);
        let with_gac_2023 = with_gac
            .yearly_breakdown
            .iter()
            .find(|y| y.year == 2023)
            .map(|y| y.total_contribution.value);
        assert!(domestic_only_2023 < with_gac_2023);
    }

    #[test]
    fn totals_combine_both_sources() {
        let report = build(true);

        assert_eq!(report.totals.total_grants_value.value, dec!(4102500));
        assert_eq!(report.totals.total_grants_share.value, dec!(41025));
        assert_eq!(report.totals.monthly_grants_share.value, dec!(41025) / dec!(12));
        assert_eq!(report.totals.breakdown.domestic.share.value, dec!(1020));
    }

    #[test]
    fn percentages_are_zero_without_any_share() {
        let report =
            ContributionReport::build(&calculation(), &[], &[], true, 2025, 10).unwrap();

        assert_eq!(report.totals.breakdown.domestic.percentage, Decimal::ZERO);
        assert_eq!(report.totals.breakdown.gac.percentage, Decimal::ZERO);
        assert!(report.yearly_breakdown.is_empty());
        assert_eq!(report.future_projections.with_new_projects.len(), 10);
    }

    #[test]
    fn yearly_breakdown_is_ascending() {
        let report = build(true);

        let years: Vec<i32> = report.yearly_breakdown.iter().map(|y| y.year).collect();

        assert_eq!(years, vec![2022, 2023, 2024]);
        assert_eq!(report.yearly_breakdown[0].gac_count, 2);
        assert_eq!(report.yearly_breakdown[0].top_projects[0].title, "Project 7");
    }

    #[test]
    fn calculation_summary_includes_grants_portion() {
        let report = build(true);

        // 18571.72 × 100 / 100
        assert_eq!(report.calculation.grants_portion_of_taxes.value, dec!(18571.72));
        assert_eq!(report.calculation.grants_portion_of_taxes.formatted, "$18,571.72");
    }

    // ===== GrantShareLookup tests =====

    #[test]
    fn share_lookup_reports_percentage_of_income() {
        let mut grant = domestic(4, dec!(250000), false, None);
        grant.description = "d".repeat(250);

        let lookup = GrantShareLookup::new(&calculation(), &grant);

        assert_eq!(lookup.user_share.value, dec!(2500));
        assert_eq!(lookup.percentage_of_income, dec!(2.5));
        assert_eq!(lookup.description, format!("{}...", "d".repeat(200)));
    }
}
