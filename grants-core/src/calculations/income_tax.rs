//! Progressive federal income tax.
//!
//! Income is consumed bracket by bracket: each bracket taxes at most its
//! width at its marginal rate and passes the remainder on to the next one.
//! The 2024 federal schedule used by default is:
//!
//! | Bracket width | Rate  |
//! |---------------|-------|
//! | 53,359        | 15%   |
//! | 53,358        | 20.5% |
//! | 58,204        | 26%   |
//! | 99,462        | 29%   |
//! | remainder     | 33%   |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use grants_core::calculations::{AllocationConfig, IncomeTaxSchedule};
//!
//! let config = AllocationConfig::default();
//! let schedule = IncomeTaxSchedule::new(&config.brackets);
//!
//! // 53,359 × 15% + 53,358 × 20.5%
//! assert_eq!(schedule.tax_owed(dec!(106717)).unwrap(), dec!(18942.24));
//! ```

use rust_decimal::Decimal;

use super::error::ValidationError;
use crate::TaxBracket;

/// Calculator over an ordered, contiguous list of brackets.
#[derive(Debug, Clone, Copy)]
pub struct IncomeTaxSchedule<'a> {
    brackets: &'a [TaxBracket],
}

impl<'a> IncomeTaxSchedule<'a> {
    pub fn new(brackets: &'a [TaxBracket]) -> Self {
        Self { brackets }
    }

    /// Checks that the brackets start at zero, are contiguous, carry rates
    /// in `[0, 1]` and that only the last one is open-ended.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(first) = self.brackets.first() else {
            return Err(ValidationError::InvalidBrackets(
                "at least one bracket is required".to_string(),
            ));
        };
        if !first.min_income.is_zero() {
            return Err(ValidationError::InvalidBrackets(format!(
                "first bracket must start at 0, starts at {}",
                first.min_income
            )));
        }

        let last_index = self.brackets.len() - 1;
        for (index, bracket) in self.brackets.iter().enumerate() {
            if bracket.tax_rate < Decimal::ZERO || bracket.tax_rate > Decimal::ONE {
                return Err(ValidationError::InvalidRate {
                    field: "tax_rate",
                    value: bracket.tax_rate,
                });
            }
            match (bracket.max_income, self.brackets.get(index + 1)) {
                (Some(max), _) if max <= bracket.min_income => {
                    return Err(ValidationError::InvalidBrackets(format!(
                        "bracket starting at {} has non-positive width",
                        bracket.min_income
                    )));
                }
                (Some(max), Some(next)) if max != next.min_income => {
                    return Err(ValidationError::InvalidBrackets(format!(
                        "gap between {} and {}",
                        max, next.min_income
                    )));
                }
                (Some(max), None) => {
                    return Err(ValidationError::InvalidBrackets(format!(
                        "last bracket must be open-ended, ends at {}",
                        max
                    )));
                }
                (None, Some(_)) => {
                    return Err(ValidationError::InvalidBrackets(format!(
                        "only the last bracket may be open-ended (bracket {} of {})",
                        index + 1,
                        last_index + 1
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Total tax owed on `income`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeAmount`] for negative income.
    pub fn tax_owed(
        &self,
        income: Decimal,
    ) -> Result<Decimal, ValidationError> {
        if income < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount {
                field: "annual_income",
                value: income,
            });
        }

        let mut remaining = income;
        let mut tax = Decimal::ZERO;
        for bracket in self.brackets {
            if remaining <= Decimal::ZERO {
                break;
            }
            let taxable = match bracket.width() {
                Some(width) => remaining.min(width),
                None => remaining,
            };
            tax += taxable * bracket.tax_rate;
            remaining -= taxable;
        }
        Ok(tax)
    }
}
