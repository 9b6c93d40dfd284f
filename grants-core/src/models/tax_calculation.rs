use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::{GrantShareAllocator, TaxContribution};

/// A recorded tax-contribution calculation. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculation {
    pub id: i64,
    pub session_key: String,

    // Inputs
    pub annual_income: Decimal,
    pub monthly_income: Decimal,
    pub gst_eligible_spending: Decimal,
    pub monthly_gst_spending: Decimal,
    pub taxpayer_since_year: i32,

    // Derived
    pub federal_income_tax: Decimal,
    pub monthly_federal_tax: Decimal,
    pub gst_paid: Decimal,
    pub monthly_gst_paid: Decimal,
    pub total_tax_contribution: Decimal,
    pub monthly_tax_contribution: Decimal,
    pub revenue_share_percentage: Decimal,
    pub grants_allocation_percentage: Decimal,

    pub created_at: DateTime<Utc>,
}

impl TaxCalculation {
    /// Share allocator bound to this calculation's revenue share.
    pub fn allocator(&self) -> GrantShareAllocator {
        GrantShareAllocator::new(
            self.revenue_share_percentage,
            self.grants_allocation_percentage,
        )
    }

    /// Breakdown view of the stored figures.
    pub fn contribution(&self) -> TaxContribution {
        TaxContribution {
            annual_income: self.annual_income,
            monthly_income: self.monthly_income,
            gst_eligible_spending: self.gst_eligible_spending,
            monthly_gst_spending: self.monthly_gst_spending,
            federal_income_tax: self.federal_income_tax,
            monthly_federal_tax: self.monthly_federal_tax,
            gst_paid: self.gst_paid,
            monthly_gst_paid: self.monthly_gst_paid,
            total_tax_contribution: self.total_tax_contribution,
            monthly_tax_contribution: self.monthly_tax_contribution,
            revenue_share_percentage: self.revenue_share_percentage,
            grants_allocation_percentage: self.grants_allocation_percentage,
        }
    }
}

/// For recording new calculations (no id or timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxCalculation {
    pub session_key: String,
    pub annual_income: Decimal,
    pub monthly_income: Decimal,
    pub gst_eligible_spending: Decimal,
    pub monthly_gst_spending: Decimal,
    pub taxpayer_since_year: i32,
    pub federal_income_tax: Decimal,
    pub monthly_federal_tax: Decimal,
    pub gst_paid: Decimal,
    pub monthly_gst_paid: Decimal,
    pub total_tax_contribution: Decimal,
    pub monthly_tax_contribution: Decimal,
    pub revenue_share_percentage: Decimal,
    pub grants_allocation_percentage: Decimal,
}

impl NewTaxCalculation {
    pub fn from_contribution(
        session_key: impl Into<String>,
        taxpayer_since_year: i32,
        contribution: &TaxContribution,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            annual_income: contribution.annual_income,
            monthly_income: contribution.monthly_income,
            gst_eligible_spending: contribution.gst_eligible_spending,
            monthly_gst_spending: contribution.monthly_gst_spending,
            taxpayer_since_year,
            federal_income_tax: contribution.federal_income_tax,
            monthly_federal_tax: contribution.monthly_federal_tax,
            gst_paid: contribution.gst_paid,
            monthly_gst_paid: contribution.monthly_gst_paid,
            total_tax_contribution: contribution.total_tax_contribution,
            monthly_tax_contribution: contribution.monthly_tax_contribution,
            revenue_share_percentage: contribution.revenue_share_percentage,
            grants_allocation_percentage: contribution.grants_allocation_percentage,
        }
    }
}
