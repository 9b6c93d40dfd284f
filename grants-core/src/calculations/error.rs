use rust_decimal::Decimal;
use thiserror::Error;

/// Malformed caller input or configuration. Nothing is computed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be non-negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("{field} must be at most {max}, got {value}")]
    AmountTooLarge {
        field: &'static str,
        value: Decimal,
        max: Decimal,
    },

    #[error("{field} must be between 0 and 1, got {value}")]
    InvalidRate { field: &'static str, value: Decimal },

    #[error("grants allocation percentage must be between 0 and 100, got {0}")]
    InvalidAllocationPercentage(Decimal),

    #[error("total federal revenue must be positive, got {0}")]
    NonPositiveRevenue(Decimal),

    #[error("invalid tax brackets: {0}")]
    InvalidBrackets(String),
}

/// Failure raised while computing a contribution report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// A ratio had a zero denominator. Points at bad upstream data rather
    /// than bad user input.
    #[error("division by zero while computing {0}")]
    DivisionByZero(&'static str),
}

impl CalculationError {
    /// Coarse classification used when reporting the error to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DivisionByZero(_) => "calculation",
        }
    }
}
