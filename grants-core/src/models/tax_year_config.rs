use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Revenue and allocation parameters for a single tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearConfig {
    pub tax_year: i32,
    /// Estimated total federal revenue collected in the year.
    pub total_federal_revenue: Decimal,
    /// Flat consumption tax (GST) rate as a fraction, e.g. `0.05`.
    pub gst_rate: Decimal,
    /// Share of the federal budget assumed to fund grants, on a 0-100 scale.
    pub grants_allocation_percentage: Decimal,
}
