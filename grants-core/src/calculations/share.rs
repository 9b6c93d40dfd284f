//! Per-grant share allocation.
//!
//! A taxpayer's share of a grant is the grant value scaled by their revenue
//! share and by the fraction of the budget assumed to fund grants. Both
//! factors are percentages, so the value is divided by 100 twice:
//!
//! ```text
//! effective_share = revenue_share_percentage × grants_allocation_percentage / 100
//! user_share      = grant_value × effective_share / 100
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::common::monthly;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantShareAllocator {
    revenue_share_percentage: Decimal,
    grants_allocation_percentage: Decimal,
}

impl GrantShareAllocator {
    pub fn new(
        revenue_share_percentage: Decimal,
        grants_allocation_percentage: Decimal,
    ) -> Self {
        Self {
            revenue_share_percentage,
            grants_allocation_percentage,
        }
    }

    pub fn effective_share(&self) -> Decimal {
        self.revenue_share_percentage * self.grants_allocation_percentage / Decimal::ONE_HUNDRED
    }

    /// The taxpayer's annual share of a grant worth `grant_value`.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use grants_core::calculations::GrantShareAllocator;
    ///
    /// let allocator = GrantShareAllocator::new(dec!(0.001), dec!(2.5));
    ///
    /// assert_eq!(allocator.share_of(dec!(1000000)), dec!(0.25));
    /// ```
    pub fn share_of(
        &self,
        grant_value: Decimal,
    ) -> Decimal {
        grant_value * self.effective_share() / Decimal::ONE_HUNDRED
    }

    pub fn monthly_share_of(
        &self,
        grant_value: Decimal,
    ) -> Decimal {
        monthly(self.share_of(grant_value))
    }

    /// `share` as a percentage of `annual_income`, or zero without income.
    pub fn percentage_of_income(
        share: Decimal,
        annual_income: Decimal,
    ) -> Decimal {
        if annual_income > Decimal::ZERO {
            share / annual_income * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    }
}
