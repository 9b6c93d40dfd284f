use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use grants_core::db::{GacGrantFilter, GrantFilter, GrantSort};
use grants_core::{
    GacStatus, GlobalAffairsGrant, Grant, GrantRepository, InsertOutcome, MAJOR_FUNDING_THRESHOLD,
    NewGlobalAffairsGrant, NewGrant, NewTaxCalculation, RepositoryError, TaxBracket,
    TaxCalculation, TaxYearConfig,
};
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row};
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

const GRANT_COLUMNS: &str = "id, reference_number, recipient_province, recipient_city,
    recipient_legal_name, recipient_operating_name, recipient_type, recipient_postal_code,
    agreement_title, agreement_number, agreement_value, description, expected_results,
    agreement_start_date, agreement_end_date, naics_identifier, naics_sector, program_name,
    program_purpose, fiscal_year, is_major_funding, is_notable, notable_reason";

const GAC_GRANT_COLUMNS: &str = "id, project_number, date_modified, title, description, status,
    start_date, end_date, country, region, executing_agency_partner, maximum_contribution,
    program_name, dac_sector, policy_markers, expected_results";

const CALCULATION_COLUMNS: &str = "id, session_key, annual_income, monthly_income,
    gst_eligible_spending, monthly_gst_spending, taxpayer_since_year, federal_income_tax,
    monthly_federal_tax, gst_paid, monthly_gst_paid, total_tax_contribution,
    monthly_tax_contribution, revenue_share_percentage, grants_allocation_percentage, created_at";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Executes every `.sql` file in `seeds_dir`, in file name order.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn get<'r, T>(
    row: &'r SqliteRow,
    column: &str,
) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_grant(row: &SqliteRow) -> Result<Grant, RepositoryError> {
    Ok(Grant {
        id: get(row, "id")?,
        reference_number: get(row, "reference_number")?,
        recipient_province: get(row, "recipient_province")?,
        recipient_city: get(row, "recipient_city")?,
        recipient_legal_name: get(row, "recipient_legal_name")?,
        recipient_operating_name: get(row, "recipient_operating_name")?,
        recipient_type: get(row, "recipient_type")?,
        recipient_postal_code: get(row, "recipient_postal_code")?,
        agreement_title: get(row, "agreement_title")?,
        agreement_number: get(row, "agreement_number")?,
        agreement_value: get_decimal(row, "agreement_value")?,
        description: get(row, "description")?,
        expected_results: get(row, "expected_results")?,
        agreement_start_date: get::<Option<NaiveDate>>(row, "agreement_start_date")?,
        agreement_end_date: get::<Option<NaiveDate>>(row, "agreement_end_date")?,
        naics_identifier: get(row, "naics_identifier")?,
        naics_sector: get(row, "naics_sector")?,
        program_name: get(row, "program_name")?,
        program_purpose: get(row, "program_purpose")?,
        fiscal_year: get(row, "fiscal_year")?,
        is_major_funding: get(row, "is_major_funding")?,
        is_notable: get(row, "is_notable")?,
        notable_reason: get(row, "notable_reason")?,
    })
}

fn row_to_gac_grant(row: &SqliteRow) -> Result<GlobalAffairsGrant, RepositoryError> {
    let status: String = get(row, "status")?;
    let status = GacStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid GAC status: {}", status)))?;

    Ok(GlobalAffairsGrant {
        id: get(row, "id")?,
        project_number: get(row, "project_number")?,
        date_modified: get(row, "date_modified")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        status,
        start_date: get::<Option<NaiveDate>>(row, "start_date")?,
        end_date: get::<Option<NaiveDate>>(row, "end_date")?,
        country: get(row, "country")?,
        region: get(row, "region")?,
        executing_agency_partner: get(row, "executing_agency_partner")?,
        maximum_contribution: get_decimal(row, "maximum_contribution")?,
        program_name: get(row, "program_name")?,
        dac_sector: get(row, "dac_sector")?,
        policy_markers: get(row, "policy_markers")?,
        expected_results: get(row, "expected_results")?,
    })
}

fn row_to_calculation(row: &SqliteRow) -> Result<TaxCalculation, RepositoryError> {
    Ok(TaxCalculation {
        id: get(row, "id")?,
        session_key: get(row, "session_key")?,
        annual_income: get_decimal(row, "annual_income")?,
        monthly_income: get_decimal(row, "monthly_income")?,
        gst_eligible_spending: get_decimal(row, "gst_eligible_spending")?,
        monthly_gst_spending: get_decimal(row, "monthly_gst_spending")?,
        taxpayer_since_year: get(row, "taxpayer_since_year")?,
        federal_income_tax: get_decimal(row, "federal_income_tax")?,
        monthly_federal_tax: get_decimal(row, "monthly_federal_tax")?,
        gst_paid: get_decimal(row, "gst_paid")?,
        monthly_gst_paid: get_decimal(row, "monthly_gst_paid")?,
        total_tax_contribution: get_decimal(row, "total_tax_contribution")?,
        monthly_tax_contribution: get_decimal(row, "monthly_tax_contribution")?,
        revenue_share_percentage: get_decimal(row, "revenue_share_percentage")?,
        grants_allocation_percentage: get_decimal(row, "grants_allocation_percentage")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

/// Appends a case-insensitive `LIKE` over `columns` for a non-blank query.
fn push_text_search(
    builder: &mut QueryBuilder<'_, Sqlite>,
    query: Option<&str>,
    columns: &[&str],
) {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return;
    };
    let pattern = format!("%{}%", query);
    builder.push(" AND (");
    for (index, column) in columns.iter().enumerate() {
        if index > 0 {
            builder.push(" OR ");
        }
        builder.push(*column).push(" LIKE ").push_bind(pattern.clone());
    }
    builder.push(")");
}

fn push_value_bounds(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    min_value: Option<rust_decimal::Decimal>,
    max_value: Option<rust_decimal::Decimal>,
) {
    if let Some(min) = min_value {
        builder
            .push(format!(" AND CAST({column} AS REAL) >= CAST("))
            .push_bind(decimal_to_text(min))
            .push(" AS REAL)");
    }
    if let Some(max) = max_value {
        builder
            .push(format!(" AND CAST({column} AS REAL) <= CAST("))
            .push_bind(decimal_to_text(max))
            .push(" AS REAL)");
    }
}

fn order_clause(
    sort: GrantSort,
    value_column: &str,
    date_column: &str,
    title_column: &str,
) -> String {
    match sort {
        GrantSort::ValueDesc => format!(" ORDER BY CAST({value_column} AS REAL) DESC, id"),
        GrantSort::ValueAsc => format!(" ORDER BY CAST({value_column} AS REAL) ASC, id"),
        GrantSort::DateDesc => format!(" ORDER BY {date_column} DESC, id"),
        GrantSort::DateAsc => format!(" ORDER BY {date_column} ASC, id"),
        GrantSort::Title => format!(" ORDER BY {title_column} ASC, id"),
    }
}

#[async_trait]
impl GrantRepository for SqliteRepository {
    async fn get_tax_year_config(
        &self,
        year: i32,
    ) -> Result<TaxYearConfig, RepositoryError> {
        let row = sqlx::query(
            "SELECT tax_year, total_federal_revenue, gst_rate, grants_allocation_percentage
             FROM tax_year_config WHERE tax_year = ?",
        )
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(TaxYearConfig {
            tax_year: get(&row, "tax_year")?,
            total_federal_revenue: get_decimal(&row, "total_federal_revenue")?,
            gst_rate: get_decimal(&row, "gst_rate")?,
            grants_allocation_percentage: get_decimal(&row, "grants_allocation_percentage")?,
        })
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query("SELECT tax_year FROM tax_year_config ORDER BY tax_year DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(|row| get(row, "tax_year")).collect()
    }

    async fn get_tax_brackets(
        &self,
        tax_year: i32,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT tax_year, min_income, max_income, tax_rate
             FROM tax_brackets
             WHERE tax_year = ?
             ORDER BY CAST(min_income AS REAL)",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter()
            .map(|row| {
                Ok(TaxBracket {
                    tax_year: get(row, "tax_year")?,
                    min_income: get_decimal(row, "min_income")?,
                    max_income: get_optional_decimal(row, "max_income")?,
                    tax_rate: get_decimal(row, "tax_rate")?,
                })
            })
            .collect()
    }

    async fn insert_tax_bracket(
        &self,
        bracket: &TaxBracket,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tax_brackets (tax_year, min_income, max_income, tax_rate)
             VALUES (?, ?, ?, ?)",
        )
        .bind(bracket.tax_year)
        .bind(decimal_to_text(bracket.min_income))
        .bind(bracket.max_income.map(decimal_to_text))
        .bind(decimal_to_text(bracket.tax_rate))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn delete_tax_brackets(
        &self,
        tax_year: i32,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_brackets WHERE tax_year = ?")
            .bind(tax_year)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    async fn replace_tax_brackets(
        &self,
        tax_year: i32,
        brackets: &[TaxBracket],
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let removed = sqlx::query("DELETE FROM tax_brackets WHERE tax_year = ?")
            .bind(tax_year)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

        for bracket in brackets {
            if bracket.tax_year != tax_year {
                return Err(RepositoryError::Database(format!(
                    "bracket for {} in the {} schedule",
                    bracket.tax_year, tax_year
                )));
            }
            sqlx::query(
                "INSERT INTO tax_brackets (tax_year, min_income, max_income, tax_rate)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(tax_year)
            .bind(decimal_to_text(bracket.min_income))
            .bind(bracket.max_income.map(decimal_to_text))
            .bind(decimal_to_text(bracket.tax_rate))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(tax_year, removed, inserted = brackets.len(), "replaced tax brackets");
        Ok(removed)
    }

    async fn insert_grant(
        &self,
        grant: &NewGrant,
    ) -> Result<InsertOutcome, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO grants (
                reference_number, recipient_province, recipient_city, recipient_legal_name,
                recipient_operating_name, recipient_type, recipient_postal_code,
                agreement_title, agreement_number, agreement_value, description,
                expected_results, agreement_start_date, agreement_end_date,
                naics_identifier, naics_sector, program_name, program_purpose,
                fiscal_year, is_major_funding
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (reference_number) DO NOTHING",
        )
        .bind(&grant.reference_number)
        .bind(&grant.recipient_province)
        .bind(&grant.recipient_city)
        .bind(&grant.recipient_legal_name)
        .bind(&grant.recipient_operating_name)
        .bind(&grant.recipient_type)
        .bind(&grant.recipient_postal_code)
        .bind(&grant.agreement_title)
        .bind(&grant.agreement_number)
        .bind(decimal_to_text(grant.agreement_value))
        .bind(&grant.description)
        .bind(&grant.expected_results)
        .bind(grant.agreement_start_date)
        .bind(grant.agreement_end_date)
        .bind(&grant.naics_identifier)
        .bind(&grant.naics_sector)
        .bind(&grant.program_name)
        .bind(&grant.program_purpose)
        .bind(&grant.fiscal_year)
        .bind(grant.is_major_funding())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() > 0 {
            return Ok(InsertOutcome::Inserted(result.last_insert_rowid()));
        }

        let row = sqlx::query("SELECT id FROM grants WHERE reference_number = ?")
            .bind(&grant.reference_number)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(InsertOutcome::Existing(get(&row, "id")?))
    }

    async fn get_grant(
        &self,
        id: i64,
    ) -> Result<Grant, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {GRANT_COLUMNS} FROM grants WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_grant(&row)
    }

    async fn list_grants(
        &self,
        filter: &GrantFilter,
    ) -> Result<Vec<Grant>, RepositoryError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {GRANT_COLUMNS} FROM grants WHERE 1 = 1"));

        push_text_search(
            &mut builder,
            filter.query.as_deref(),
            &["agreement_title", "recipient_legal_name", "description"],
        );
        if let Some(province) = filter.province.as_deref().filter(|p| !p.is_empty()) {
            builder
                .push(" AND LOWER(recipient_province) = LOWER(")
                .push_bind(province.to_string())
                .push(")");
        }
        if let Some(fiscal_year) = filter.fiscal_year.as_deref().filter(|f| !f.is_empty()) {
            builder.push(" AND fiscal_year = ").push_bind(fiscal_year.to_string());
        }
        push_value_bounds(&mut builder, "agreement_value", filter.min_value, filter.max_value);
        if let Some(recipient_type) = filter.recipient_type.as_deref().filter(|t| !t.is_empty()) {
            builder.push(" AND recipient_type = ").push_bind(recipient_type.to_string());
        }
        if filter.notable_only {
            builder.push(" AND is_notable = 1");
        }
        if filter.major_only {
            builder.push(" AND is_major_funding = 1");
        }
        builder.push(order_clause(
            filter.sort,
            "agreement_value",
            "agreement_start_date",
            "agreement_title",
        ));
        builder.push(" LIMIT ").push_bind(i64::from(filter.effective_limit()));

        let rows = builder.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_grant).collect()
    }

    async fn all_grants(&self) -> Result<Vec<Grant>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {GRANT_COLUMNS} FROM grants ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(row_to_grant).collect()
    }

    async fn count_grants(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM grants")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let count: i64 = get(&row, "count")?;
        Ok(count as u64)
    }

    async fn delete_all_grants(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM grants")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    async fn set_notable(
        &self,
        id: i64,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE grants SET is_notable = 1, notable_reason = ? WHERE id = ?")
            .bind(reason)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn reset_notable_flags(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE grants SET is_notable = 0, notable_reason = '' WHERE is_notable = 1",
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    async fn insert_gac_grant(
        &self,
        grant: &NewGlobalAffairsGrant,
    ) -> Result<InsertOutcome, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO gac_grants (
                project_number, date_modified, title, description, status, start_date,
                end_date, country, region, executing_agency_partner, maximum_contribution,
                program_name, dac_sector, policy_markers, expected_results
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (project_number) DO NOTHING",
        )
        .bind(&grant.project_number)
        .bind(grant.date_modified)
        .bind(&grant.title)
        .bind(&grant.description)
        .bind(grant.status.as_str())
        .bind(grant.start_date)
        .bind(grant.end_date)
        .bind(&grant.country)
        .bind(&grant.region)
        .bind(&grant.executing_agency_partner)
        .bind(decimal_to_text(grant.maximum_contribution))
        .bind(&grant.program_name)
        .bind(&grant.dac_sector)
        .bind(&grant.policy_markers)
        .bind(&grant.expected_results)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() > 0 {
            return Ok(InsertOutcome::Inserted(result.last_insert_rowid()));
        }

        let row = sqlx::query("SELECT id FROM gac_grants WHERE project_number = ?")
            .bind(&grant.project_number)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(InsertOutcome::Existing(get(&row, "id")?))
    }

    async fn get_gac_grant(
        &self,
        id: i64,
    ) -> Result<GlobalAffairsGrant, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {GAC_GRANT_COLUMNS} FROM gac_grants WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_gac_grant(&row)
    }

    async fn list_gac_grants(
        &self,
        filter: &GacGrantFilter,
    ) -> Result<Vec<GlobalAffairsGrant>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {GAC_GRANT_COLUMNS} FROM gac_grants WHERE 1 = 1"
        ));

        push_text_search(
            &mut builder,
            filter.query.as_deref(),
            &["title", "description", "country"],
        );
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(country) = filter.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            builder.push(" AND country LIKE ").push_bind(format!("%{}%", country));
        }
        push_value_bounds(
            &mut builder,
            "maximum_contribution",
            filter.min_value,
            filter.max_value,
        );
        if filter.major_only {
            builder
                .push(" AND CAST(maximum_contribution AS REAL) >= CAST(")
                .push_bind(decimal_to_text(MAJOR_FUNDING_THRESHOLD))
                .push(" AS REAL)");
        }
        builder.push(order_clause(filter.sort, "maximum_contribution", "start_date", "title"));
        builder.push(" LIMIT ").push_bind(i64::from(filter.effective_limit()));

        let rows = builder.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_gac_grant).collect()
    }

    async fn all_gac_grants(&self) -> Result<Vec<GlobalAffairsGrant>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {GAC_GRANT_COLUMNS} FROM gac_grants ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(row_to_gac_grant).collect()
    }

    async fn delete_all_gac_grants(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM gac_grants")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    async fn create_calculation(
        &self,
        calc: NewTaxCalculation,
    ) -> Result<TaxCalculation, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO tax_calculations (
                session_key, annual_income, monthly_income, gst_eligible_spending,
                monthly_gst_spending, taxpayer_since_year, federal_income_tax,
                monthly_federal_tax, gst_paid, monthly_gst_paid, total_tax_contribution,
                monthly_tax_contribution, revenue_share_percentage,
                grants_allocation_percentage, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&calc.session_key)
        .bind(decimal_to_text(calc.annual_income))
        .bind(decimal_to_text(calc.monthly_income))
        .bind(decimal_to_text(calc.gst_eligible_spending))
        .bind(decimal_to_text(calc.monthly_gst_spending))
        .bind(calc.taxpayer_since_year)
        .bind(decimal_to_text(calc.federal_income_tax))
        .bind(decimal_to_text(calc.monthly_federal_tax))
        .bind(decimal_to_text(calc.gst_paid))
        .bind(decimal_to_text(calc.monthly_gst_paid))
        .bind(decimal_to_text(calc.total_tax_contribution))
        .bind(decimal_to_text(calc.monthly_tax_contribution))
        .bind(decimal_to_text(calc.revenue_share_percentage))
        .bind(decimal_to_text(calc.grants_allocation_percentage))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.get_calculation(result.last_insert_rowid()).await
    }

    async fn get_calculation(
        &self,
        id: i64,
    ) -> Result<TaxCalculation, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CALCULATION_COLUMNS} FROM tax_calculations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_calculation(&row)
    }

    async fn latest_calculation_for_session(
        &self,
        session_key: &str,
    ) -> Result<TaxCalculation, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CALCULATION_COLUMNS} FROM tax_calculations
             WHERE session_key = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(session_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_calculation(&row)
    }
}
