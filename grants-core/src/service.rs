//! Request-level orchestration over a [`GrantRepository`].
//!
//! The service fetches a snapshot of the corpus, runs the pure calculators
//! and records the calculation. The current year is always passed in.

use thiserror::Error;
use tracing::{info, warn};

use crate::calculations::{
    AllocationConfig, CalculationError, CalculationRequest, ContributionReport, GrantShareLookup,
    TaxContributionCalculator, ValidationError,
};
use crate::db::{GrantRepository, RepositoryError};
use crate::models::NewTaxCalculation;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContributionError {
    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("grant {0} not found")]
    GrantNotFound(i64),

    #[error("no calculation recorded for session '{0}'")]
    NoCalculation(String),
}

impl From<ValidationError> for ContributionError {
    fn from(err: ValidationError) -> Self {
        Self::Calculation(CalculationError::Validation(err))
    }
}

impl ContributionError {
    /// `"validation"`, `"calculation"`, `"not_found"` or `"server"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Calculation(err) => err.kind(),
            Self::GrantNotFound(_) | Self::NoCalculation(_) => "not_found",
            Self::Repository(_) => "server",
        }
    }
}

/// Allocation settings for `tax_year` from the store.
///
/// Falls back to the built-in defaults when the year has no stored
/// configuration or no brackets.
pub async fn load_allocation_config(
    repo: &dyn GrantRepository,
    tax_year: i32,
) -> Result<AllocationConfig, RepositoryError> {
    let stored = match repo.get_tax_year_config(tax_year).await {
        Ok(stored) => stored,
        Err(RepositoryError::NotFound) => {
            warn!(tax_year, "no stored tax year configuration; using defaults");
            return Ok(AllocationConfig::default());
        }
        Err(err) => return Err(err),
    };

    let brackets = repo.get_tax_brackets(tax_year).await?;
    if brackets.is_empty() {
        warn!(tax_year, "no stored brackets; using default schedule");
        let defaults = AllocationConfig::default();
        return Ok(AllocationConfig::from_tax_year(&stored, defaults.brackets));
    }
    Ok(AllocationConfig::from_tax_year(&stored, brackets))
}

pub struct ContributionService<'a> {
    repo: &'a dyn GrantRepository,
    calculator: TaxContributionCalculator,
}

impl<'a> ContributionService<'a> {
    pub fn new(
        repo: &'a dyn GrantRepository,
        config: AllocationConfig,
    ) -> Self {
        Self {
            repo,
            calculator: TaxContributionCalculator::new(config),
        }
    }

    pub fn config(&self) -> &AllocationConfig {
        self.calculator.config()
    }

    /// Computes, records and reports one taxpayer's contribution.
    ///
    /// Nothing is written when the request or configuration is invalid.
    pub async fn calculate(
        &self,
        request: &CalculationRequest,
        current_year: i32,
    ) -> Result<ContributionReport, ContributionError> {
        request.validate()?;
        let contribution = self
            .calculator
            .calculate(request.annual_income, request.gst_eligible_spending)?;

        // GAC grants feed the projections even when excluded from the rest.
        let grants = self.repo.all_grants().await?;
        let gac_grants = self.repo.all_gac_grants().await?;

        let calculation = self
            .repo
            .create_calculation(NewTaxCalculation::from_contribution(
                request.session_key.clone(),
                request.taxpayer_since_year,
                &contribution,
            ))
            .await?;

        let report = ContributionReport::build(
            &calculation,
            &grants,
            &gac_grants,
            request.include_gac,
            current_year,
            self.config().projection_years,
        )?;

        info!(
            calculation_id = calculation.id,
            session = %request.session_key,
            grants = grants.len(),
            gac_grants = gac_grants.len(),
            "contribution report built"
        );
        Ok(report)
    }

    /// One grant's share under the latest calculation of `session_key`.
    pub async fn grant_share(
        &self,
        grant_id: i64,
        session_key: &str,
    ) -> Result<GrantShareLookup, ContributionError> {
        let grant = match self.repo.get_grant(grant_id).await {
            Ok(grant) => grant,
            Err(RepositoryError::NotFound) => {
                return Err(ContributionError::GrantNotFound(grant_id));
            }
            Err(err) => return Err(err.into()),
        };
        let calculation = match self.repo.latest_calculation_for_session(session_key).await {
            Ok(calculation) => calculation,
            Err(RepositoryError::NotFound) => {
                return Err(ContributionError::NoCalculation(session_key.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(GrantShareLookup::new(&calculation, &grant))
    }
}
