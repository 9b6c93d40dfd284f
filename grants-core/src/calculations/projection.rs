//! Forward projection of yearly contributions.
//!
//! Two scenarios are produced from the amortized history:
//!
//! - **continuing only**: future years already covered by known multi-year
//!   projects, unchanged.
//! - **with new projects**: the same years, plus the historical yearly
//!   average layered on top of every year in `current + 1 ..= current + N`.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use grants_core::calculations::{FutureProjection, YearlyContribution, YearlyContributions};
//!
//! let mut history = YearlyContributions::new();
//! history.insert(2022, YearlyContribution { total_contribution: dec!(1000), ..Default::default() });
//! history.insert(2023, YearlyContribution { total_contribution: dec!(2000), ..Default::default() });
//!
//! let projection = FutureProjection::project(&history, 2025, 10);
//!
//! assert_eq!(projection.historical_average.annual_contribution, dec!(1500));
//! assert_eq!(projection.with_new_projects[&2026].total_contribution, dec!(1500));
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amortization::YearlyContributions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    ContinuingOnly,
    WithNewProjects,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedYear {
    pub total_contribution: Decimal,
    pub grant_count: u32,
    pub scenario: Scenario,

    /// Average-based estimate for projects not yet known. Only set on
    /// with-new-projects years.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_new_contribution: Option<Decimal>,

    /// Portion coming from already-known projects. Only set on
    /// with-new-projects years.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuing_contribution: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalAverage {
    pub annual_contribution: Decimal,
    /// Floored mean of yearly grant counts.
    pub grant_count: u32,
}

impl HistoricalAverage {
    /// Mean over every year up to and including `current_year`. Zero when
    /// there is no such year.
    pub fn from_history(
        yearly: &YearlyContributions,
        current_year: i32,
    ) -> Self {
        let past: Vec<_> = yearly.range(..=current_year).map(|(_, year)| year).collect();
        if past.is_empty() {
            return Self::default();
        }

        let years = past.len() as u32;
        let total: Decimal = past.iter().map(|year| year.total_contribution).sum();
        let count: u32 = past.iter().map(|year| year.grant_count).sum();

        Self {
            annual_contribution: total / Decimal::from(years),
            grant_count: count / years,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureProjection {
    pub continuing_only: BTreeMap<i32, ProjectedYear>,
    pub with_new_projects: BTreeMap<i32, ProjectedYear>,
    pub historical_average: HistoricalAverage,
}

impl FutureProjection {
    /// Projects `years` years past `current_year` from the amortized history.
    pub fn project(
        yearly: &YearlyContributions,
        current_year: i32,
        years: u32,
    ) -> Self {
        let continuing_only: BTreeMap<i32, ProjectedYear> = yearly
            .range(current_year.saturating_add(1)..)
            .map(|(year, contribution)| {
                (
                    *year,
                    ProjectedYear {
                        total_contribution: contribution.total_contribution,
                        grant_count: contribution.grant_count,
                        scenario: Scenario::ContinuingOnly,
                        estimated_new_contribution: None,
                        continuing_contribution: None,
                    },
                )
            })
            .collect();

        let average = HistoricalAverage::from_history(yearly, current_year);

        let mut with_new_projects = continuing_only.clone();
        for offset in 1..=years as i32 {
            let year = current_year + offset;
            let (continuing, continuing_count) = continuing_only
                .get(&year)
                .map_or((Decimal::ZERO, 0), |p| (p.total_contribution, p.grant_count));

            with_new_projects.insert(
                year,
                ProjectedYear {
                    total_contribution: continuing + average.annual_contribution,
                    grant_count: continuing_count + average.grant_count,
                    scenario: Scenario::WithNewProjects,
                    estimated_new_contribution: Some(average.annual_contribution),
                    continuing_contribution: Some(continuing),
                },
            );
        }

        Self {
            continuing_only,
            with_new_projects,
            historical_average: average,
        }
    }
}
