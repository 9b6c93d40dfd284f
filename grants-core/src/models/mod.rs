mod gac_grant;
mod grant;
mod tax_bracket;
mod tax_calculation;
mod tax_year_config;

pub use gac_grant::{GacStatus, GlobalAffairsGrant, NewGlobalAffairsGrant};
pub use grant::{Grant, MAJOR_FUNDING_THRESHOLD, NewGrant, is_major_funding};
pub use tax_bracket::TaxBracket;
pub use tax_calculation::{NewTaxCalculation, TaxCalculation};
pub use tax_year_config::TaxYearConfig;
