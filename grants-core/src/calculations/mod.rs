//! Tax-contribution and grant-share calculations.
//!
//! The calculators are layered leaf to root:
//!
//! 1. [`IncomeTaxSchedule`] and [`consumption_tax`] turn income and spending
//!    into taxes paid.
//! 2. [`TaxContributionCalculator`] combines them with the revenue share.
//! 3. [`GrantShareAllocator`] scales a grant's value to the taxpayer's share.
//! 4. [`AmortizationEngine`] spreads shares over project years and
//!    [`FutureProjection`] extrapolates them forward.
//! 5. [`ContributionReport`] composes everything into one serializable value.
//!
//! Every calculator is pure and takes its rates from an [`AllocationConfig`].

pub mod amortization;
pub mod common;
pub mod config;
pub mod contribution;
pub mod error;
pub mod formatting;
pub mod income_tax;
pub mod projection;
pub mod report;
pub mod share;

pub use amortization::{
    AmortizationEngine, GrantKind, ProjectContribution, YearSpan, YearlyContribution,
    YearlyContributions, domestic_span, gac_span, truncate_with_ellipsis,
};
pub use config::AllocationConfig;
pub use contribution::{
    TaxContribution, TaxContributionCalculator, consumption_tax, revenue_share_percentage,
};
pub use error::{CalculationError, ValidationError};
pub use formatting::{Amount, format_currency};
pub use income_tax::IncomeTaxSchedule;
pub use projection::{FutureProjection, HistoricalAverage, ProjectedYear, Scenario};
pub use report::{
    CalculationRequest, CalculationSummary, ContributionReport, GrantShare, GrantShareLookup,
    ProjectionSummary, Totals, YearBreakdown,
};
pub use share::GrantShareAllocator;
