//! Command handlers shared by the `grants` binary and its tests.
//!
//! Each handler takes an open repository and returns a serializable
//! value; printing is left to [`crate::render`] or `serde_json`.

use anyhow::{Context, Result};
use grants_core::calculations::config::DEFAULT_TAX_YEAR;
use grants_core::calculations::{
    AllocationConfig, CalculationRequest, ContributionReport, GrantShareLookup,
};
use grants_core::db::{GacGrantFilter, GrantFilter, RepositoryRegistry};
use grants_core::stats::{
    GacSummary, GroupAggregate, GroupKey, GrantSummary, ValueBand, group_by, summarize,
    summarize_gac, top_groups, value_distribution,
};
use grants_core::{
    ContributionService, GacStatus, GlobalAffairsGrant, Grant, GrantRepository,
    load_allocation_config,
};
use grants_db_sqlite::SqliteRepositoryFactory;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::AllocationOverrides;

/// Registry with every backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Allocation settings: the configured tax year (else the newest stored
/// one, else the default year) with the file's overrides on top.
pub async fn resolve_allocation(
    repo: &dyn GrantRepository,
    overrides: &AllocationOverrides,
) -> Result<AllocationConfig> {
    let tax_year = match overrides.tax_year {
        Some(year) => year,
        None => repo
            .list_tax_years()
            .await
            .context("Failed to list tax years")?
            .first()
            .copied()
            .unwrap_or(DEFAULT_TAX_YEAR),
    };

    let stored = load_allocation_config(repo, tax_year)
        .await
        .with_context(|| format!("Failed to load allocation config for {tax_year}"))?;
    let config = overrides.apply(stored);
    debug!(
        tax_year = config.tax_year,
        allocation = %config.grants_allocation_percentage,
        revenue = %config.total_federal_revenue,
        "allocation config resolved"
    );
    Ok(config)
}

pub async fn calculate(
    repo: &dyn GrantRepository,
    config: AllocationConfig,
    request: &CalculationRequest,
    current_year: i32,
) -> Result<ContributionReport> {
    let service = ContributionService::new(repo, config);
    service
        .calculate(request, current_year)
        .await
        .with_context(|| {
            format!(
                "Failed to calculate contribution for session '{}'",
                request.session_key
            )
        })
}

pub async fn grant_share(
    repo: &dyn GrantRepository,
    config: AllocationConfig,
    grant_id: i64,
    session_key: &str,
) -> Result<GrantShareLookup> {
    let service = ContributionService::new(repo, config);
    service
        .grant_share(grant_id, session_key)
        .await
        .with_context(|| format!("Failed to look up grant {grant_id}"))
}

pub const TOP_RECIPIENTS: usize = 20;
pub const TOP_PROGRAMS: usize = 15;
pub const TOP_SECTORS: usize = 15;

/// Corpus statistics printed by `grants stats`.
///
/// Recipients, programs and sectors keep only the largest groups by total
/// value. Recipient types are listed in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub domestic: GrantSummary,
    pub value_distribution: Vec<ValueBand>,
    pub by_fiscal_year: Vec<GroupAggregate>,
    pub by_province: Vec<GroupAggregate>,
    pub top_recipients: Vec<GroupAggregate>,
    pub top_programs: Vec<GroupAggregate>,
    pub top_sectors: Vec<GroupAggregate>,
    pub by_recipient_type: Vec<GroupAggregate>,
    pub gac: GacSummary,
}

impl StatsReport {
    pub fn compute(
        grants: &[Grant],
        gac_grants: &[GlobalAffairsGrant],
    ) -> Self {
        Self {
            domestic: summarize(grants),
            value_distribution: value_distribution(grants),
            by_fiscal_year: group_by(grants, GroupKey::FiscalYear),
            by_province: group_by(grants, GroupKey::Province),
            top_recipients: top_groups(grants, GroupKey::Recipient, TOP_RECIPIENTS),
            top_programs: top_groups(grants, GroupKey::Program, TOP_PROGRAMS),
            top_sectors: top_groups(grants, GroupKey::Sector, TOP_SECTORS),
            by_recipient_type: group_by(grants, GroupKey::RecipientType),
            gac: summarize_gac(gac_grants),
        }
    }
}

pub async fn stats(repo: &dyn GrantRepository) -> Result<StatsReport> {
    let grants = repo.all_grants().await.context("Failed to load grants")?;
    let gac_grants = repo
        .all_gac_grants()
        .await
        .context("Failed to load GAC projects")?;
    info!(grants = grants.len(), gac_grants = gac_grants.len(), "computing statistics");

    Ok(StatsReport::compute(&grants, &gac_grants))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "grants", rename_all = "lowercase")]
pub enum SearchResults {
    Domestic(Vec<Grant>),
    Gac(Vec<GlobalAffairsGrant>),
}

impl SearchResults {
    pub fn len(&self) -> usize {
        match self {
            Self::Domestic(grants) => grants.len(),
            Self::Gac(grants) => grants.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Criteria given to `grants search`. Province and fiscal year only
/// apply to domestic grants; status and country only to GAC projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub domestic: GrantFilter,
    pub gac: bool,
    pub gac_status: Option<GacStatus>,
    pub country: Option<String>,
}

impl SearchQuery {
    fn gac_filter(&self) -> GacGrantFilter {
        GacGrantFilter {
            query: self.domestic.query.clone(),
            status: self.gac_status,
            country: self.country.clone(),
            min_value: self.domestic.min_value,
            max_value: self.domestic.max_value,
            major_only: self.domestic.major_only,
            sort: self.domestic.sort,
            limit: self.domestic.limit,
        }
    }
}

pub async fn search(
    repo: &dyn GrantRepository,
    query: &SearchQuery,
) -> Result<SearchResults> {
    let results = if query.gac {
        SearchResults::Gac(
            repo.list_gac_grants(&query.gac_filter())
                .await
                .context("Failed to search GAC projects")?,
        )
    } else {
        SearchResults::Domestic(
            repo.list_grants(&query.domestic)
                .await
                .context("Failed to search grants")?,
        )
    };
    debug!(matches = results.len(), gac = query.gac, "search complete");
    Ok(results)
}
