//! Named configuration for the contribution calculators.
//!
//! Every rate, bracket and constant the calculators use lives in an
//! [`AllocationConfig`] so that a tax year can be swapped in without
//! touching the arithmetic. The default carries the 2024 federal figures.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use grants_core::calculations::AllocationConfig;
//!
//! let config = AllocationConfig::default();
//!
//! assert_eq!(config.tax_year, 2024);
//! assert_eq!(config.consumption_tax_rate, dec!(0.05));
//! assert_eq!(config.total_federal_revenue, dec!(430000000000));
//! assert_eq!(config.grants_allocation_percentage, dec!(2.5));
//! assert_eq!(config.projection_years, 10);
//! assert!(config.validate().is_ok());
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::income_tax::IncomeTaxSchedule;
use crate::{TaxBracket, TaxYearConfig};

pub const DEFAULT_TAX_YEAR: i32 = 2024;
pub const DEFAULT_CONSUMPTION_TAX_RATE: Decimal = dec!(0.05);
pub const DEFAULT_TOTAL_FEDERAL_REVENUE: Decimal = dec!(430000000000);
pub const DEFAULT_GRANTS_ALLOCATION_PERCENTAGE: Decimal = dec!(2.5);
pub const DEFAULT_PROJECTION_YEARS: u32 = 10;

/// (min income, max income, rate) for the 2024 federal schedule.
const FEDERAL_BRACKETS_2024: [(Decimal, Option<Decimal>, Decimal); 5] = [
    (dec!(0), Some(dec!(53359)), dec!(0.15)),
    (dec!(53359), Some(dec!(106717)), dec!(0.205)),
    (dec!(106717), Some(dec!(164921)), dec!(0.26)),
    (dec!(164921), Some(dec!(264383)), dec!(0.29)),
    (dec!(264383), None, dec!(0.33)),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub tax_year: i32,

    /// Progressive income tax brackets, ordered by `min_income`.
    pub brackets: Vec<TaxBracket>,

    /// Flat consumption tax (GST) rate as a fraction.
    pub consumption_tax_rate: Decimal,

    /// Estimated total federal revenue the taxpayer's contribution is
    /// measured against.
    pub total_federal_revenue: Decimal,

    /// Percentage (0-100) of the federal budget assumed to fund grants and
    /// contributions.
    pub grants_allocation_percentage: Decimal,

    /// Number of future years in the with-new-projects projection.
    pub projection_years: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        let brackets = FEDERAL_BRACKETS_2024
            .iter()
            .map(|(min_income, max_income, tax_rate)| TaxBracket {
                tax_year: DEFAULT_TAX_YEAR,
                min_income: *min_income,
                max_income: *max_income,
                tax_rate: *tax_rate,
            })
            .collect();

        Self {
            tax_year: DEFAULT_TAX_YEAR,
            brackets,
            consumption_tax_rate: DEFAULT_CONSUMPTION_TAX_RATE,
            total_federal_revenue: DEFAULT_TOTAL_FEDERAL_REVENUE,
            grants_allocation_percentage: DEFAULT_GRANTS_ALLOCATION_PERCENTAGE,
            projection_years: DEFAULT_PROJECTION_YEARS,
        }
    }
}

impl AllocationConfig {
    /// Builds a configuration from stored tax-year data.
    ///
    /// The projection horizon is not stored per year and keeps its default.
    pub fn from_tax_year(
        config: &TaxYearConfig,
        brackets: Vec<TaxBracket>,
    ) -> Self {
        Self {
            tax_year: config.tax_year,
            brackets,
            consumption_tax_rate: config.gst_rate,
            total_federal_revenue: config.total_federal_revenue,
            grants_allocation_percentage: config.grants_allocation_percentage,
            projection_years: DEFAULT_PROJECTION_YEARS,
        }
    }

    pub fn income_tax_schedule(&self) -> IncomeTaxSchedule<'_> {
        IncomeTaxSchedule::new(&self.brackets)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if:
    /// - the brackets are empty, non-contiguous or carry a rate outside [0, 1]
    /// - `consumption_tax_rate` is not in [0, 1]
    /// - `total_federal_revenue` is not positive
    /// - `grants_allocation_percentage` is not in [0, 100]
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.income_tax_schedule().validate()?;

        if self.consumption_tax_rate < Decimal::ZERO || self.consumption_tax_rate > Decimal::ONE {
            return Err(ValidationError::InvalidRate {
                field: "consumption_tax_rate",
                value: self.consumption_tax_rate,
            });
        }
        if self.total_federal_revenue <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveRevenue(
                self.total_federal_revenue,
            ));
        }
        if self.grants_allocation_percentage < Decimal::ZERO
            || self.grants_allocation_percentage > Decimal::ONE_HUNDRED
        {
            return Err(ValidationError::InvalidAllocationPercentage(
                self.grants_allocation_percentage,
            ));
        }
        Ok(())
    }
}
