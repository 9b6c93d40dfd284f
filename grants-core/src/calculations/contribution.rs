//! Tax contribution breakdown: income tax, consumption tax, revenue share.
//!
//! | Figure                      | Formula                                      |
//! |-----------------------------|----------------------------------------------|
//! | `federal_income_tax`        | progressive brackets over `annual_income`    |
//! | `gst_paid`                  | `gst_eligible_spending × consumption rate`   |
//! | `total_tax_contribution`    | `federal_income_tax + gst_paid`              |
//! | `revenue_share_percentage`  | `total / total_federal_revenue × 100`        |
//! | `monthly_*`                 | annual figure / 12                           |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use grants_core::calculations::{AllocationConfig, TaxContributionCalculator};
//!
//! let calculator = TaxContributionCalculator::new(AllocationConfig::default());
//! let result = calculator.calculate(dec!(53359), dec!(20000)).unwrap();
//!
//! assert_eq!(result.federal_income_tax, dec!(8003.85));
//! assert_eq!(result.gst_paid, dec!(1000));
//! assert_eq!(result.total_tax_contribution, dec!(9003.85));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::common::{check_amount, checked_divide, monthly};
use super::config::AllocationConfig;
use super::error::CalculationError;
use super::share::GrantShareAllocator;

/// Flat consumption tax on eligible spending.
pub fn consumption_tax(
    eligible_spending: Decimal,
    rate: Decimal,
) -> Decimal {
    eligible_spending * rate
}

/// Fraction of total revenue, on a 0-100 scale, that `contribution` represents.
pub fn revenue_share_percentage(
    contribution: Decimal,
    total_revenue: Decimal,
) -> Result<Decimal, CalculationError> {
    Ok(checked_divide(contribution, total_revenue, "revenue share")? * Decimal::ONE_HUNDRED)
}

/// Annual and monthly tax figures for one taxpayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxContribution {
    pub annual_income: Decimal,
    pub monthly_income: Decimal,
    pub gst_eligible_spending: Decimal,
    pub monthly_gst_spending: Decimal,
    pub federal_income_tax: Decimal,
    pub monthly_federal_tax: Decimal,
    pub gst_paid: Decimal,
    pub monthly_gst_paid: Decimal,
    pub total_tax_contribution: Decimal,
    pub monthly_tax_contribution: Decimal,
    pub revenue_share_percentage: Decimal,
    pub grants_allocation_percentage: Decimal,
}

impl TaxContribution {
    pub fn allocator(&self) -> GrantShareAllocator {
        GrantShareAllocator::new(
            self.revenue_share_percentage,
            self.grants_allocation_percentage,
        )
    }

    /// Portion of the taxpayer's total contribution that funds grants.
    pub fn grants_portion_of_taxes(&self) -> Decimal {
        self.total_tax_contribution * self.grants_allocation_percentage / Decimal::ONE_HUNDRED
    }

    pub fn monthly_grants_portion(&self) -> Decimal {
        monthly(self.grants_portion_of_taxes())
    }
}

#[derive(Debug, Clone)]
pub struct TaxContributionCalculator {
    config: AllocationConfig,
}

impl TaxContributionCalculator {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Computes the full breakdown for one taxpayer.
    ///
    /// # Errors
    ///
    /// * [`CalculationError::Validation`] for an invalid configuration or a
    ///   negative income or spending amount.
    /// * [`CalculationError::DivisionByZero`] if the revenue total is zero.
    pub fn calculate(
        &self,
        annual_income: Decimal,
        gst_eligible_spending: Decimal,
    ) -> Result<TaxContribution, CalculationError> {
        self.config.validate()?;
        check_amount("annual_income", annual_income)?;
        check_amount("gst_eligible_spending", gst_eligible_spending)?;

        let federal_income_tax = self.config.income_tax_schedule().tax_owed(annual_income)?;
        let gst_paid = consumption_tax(gst_eligible_spending, self.config.consumption_tax_rate);
        let total_tax_contribution = federal_income_tax + gst_paid;
        let revenue_share_percentage =
            revenue_share_percentage(total_tax_contribution, self.config.total_federal_revenue)?;

        debug!(
            %annual_income,
            %federal_income_tax,
            %gst_paid,
            %revenue_share_percentage,
            "computed tax contribution"
        );

        Ok(TaxContribution {
            annual_income,
            monthly_income: monthly(annual_income),
            gst_eligible_spending,
            monthly_gst_spending: monthly(gst_eligible_spending),
            federal_income_tax,
            monthly_federal_tax: monthly(federal_income_tax),
            gst_paid,
            monthly_gst_paid: monthly(gst_paid),
            total_tax_contribution,
            monthly_tax_contribution: monthly(total_tax_contribution),
            revenue_share_percentage,
            grants_allocation_percentage: self.config.grants_allocation_percentage,
        })
    }
}
