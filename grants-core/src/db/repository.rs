use async_trait::async_trait;
use thiserror::Error;

use super::filter::{GacGrantFilter, GrantFilter};
use crate::models::{
    GlobalAffairsGrant, Grant, NewGlobalAffairsGrant, NewGrant, NewTaxCalculation, TaxBracket,
    TaxCalculation, TaxYearConfig,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result of a get-or-create insert, carrying the row id either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Existing(i64),
}

impl InsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Existing(id) => *id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

#[async_trait]
pub trait GrantRepository: Send + Sync {
    // Tax year config
    async fn get_tax_year_config(&self, year: i32) -> Result<TaxYearConfig, RepositoryError>;
    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    // Tax brackets
    async fn get_tax_brackets(&self, tax_year: i32) -> Result<Vec<TaxBracket>, RepositoryError>;
    async fn insert_tax_bracket(&self, bracket: &TaxBracket) -> Result<(), RepositoryError>;
    async fn delete_tax_brackets(&self, tax_year: i32) -> Result<u64, RepositoryError>;
    /// Swaps the whole schedule of `tax_year` for `brackets` in one
    /// transaction. Returns the number of rows removed.
    async fn replace_tax_brackets(
        &self,
        tax_year: i32,
        brackets: &[TaxBracket],
    ) -> Result<u64, RepositoryError>;

    // Domestic grants
    /// Inserts unless a grant with the same reference number exists.
    async fn insert_grant(&self, grant: &NewGrant) -> Result<InsertOutcome, RepositoryError>;
    async fn get_grant(&self, id: i64) -> Result<Grant, RepositoryError>;
    async fn list_grants(&self, filter: &GrantFilter) -> Result<Vec<Grant>, RepositoryError>;
    async fn all_grants(&self) -> Result<Vec<Grant>, RepositoryError>;
    async fn count_grants(&self) -> Result<u64, RepositoryError>;
    async fn delete_all_grants(&self) -> Result<u64, RepositoryError>;
    async fn set_notable(&self, id: i64, reason: &str) -> Result<(), RepositoryError>;
    async fn reset_notable_flags(&self) -> Result<u64, RepositoryError>;

    // GAC grants
    /// Inserts unless a grant with the same project number exists.
    async fn insert_gac_grant(
        &self,
        grant: &NewGlobalAffairsGrant,
    ) -> Result<InsertOutcome, RepositoryError>;
    async fn get_gac_grant(&self, id: i64) -> Result<GlobalAffairsGrant, RepositoryError>;
    async fn list_gac_grants(
        &self,
        filter: &GacGrantFilter,
    ) -> Result<Vec<GlobalAffairsGrant>, RepositoryError>;
    async fn all_gac_grants(&self) -> Result<Vec<GlobalAffairsGrant>, RepositoryError>;
    async fn delete_all_gac_grants(&self) -> Result<u64, RepositoryError>;

    // Tax calculations
    async fn create_calculation(
        &self,
        calc: NewTaxCalculation,
    ) -> Result<TaxCalculation, RepositoryError>;
    async fn get_calculation(&self, id: i64) -> Result<TaxCalculation, RepositoryError>;

    /// Most recent calculation recorded for `session_key`.
    async fn latest_calculation_for_session(
        &self,
        session_key: &str,
    ) -> Result<TaxCalculation, RepositoryError>;
}
