//! Integration tests for the importers using the SQLite backend.

use std::path::Path;

use chrono::NaiveDate;
use grants_core::db::{GacGrantFilter, GrantFilter};
use grants_core::flagging::{NotableRules, flag_notable_grants};
use grants_core::{GacStatus, GrantRepository};
use grants_data::{
    DomesticGrantImporter, GacGrantImporter, ImportError, ImportSummary, TaxBracketLoader,
};
use grants_db_sqlite::SqliteRepository;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;

const TEST_CSV_2024: &str = include_str!("../test-data/tax_brackets_2024.csv");
const DOMESTIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/test-data/domestic");
const GAC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/test-data/gac");

async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    repo
}

fn import_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

// =========================================================================
// tax bracket tests
// =========================================================================

#[tokio::test]
async fn test_load_2024_brackets() {
    let repo = setup_test_db().await;

    let records = TaxBracketLoader::parse(TEST_CSV_2024.as_bytes()).expect("Failed to parse CSV");
    let summary = TaxBracketLoader::load(&repo, &records)
        .await
        .expect("Failed to load brackets");

    assert_eq!(summary.inserted, 5);
    let brackets = repo.get_tax_brackets(2024).await.unwrap();
    assert_eq!(brackets[0].max_income, Some(dec!(55867)));
    assert_eq!(brackets[4].tax_rate, dec!(0.33));
    assert_eq!(brackets[4].max_income, None);
}

#[tokio::test]
async fn test_load_brackets_is_idempotent() {
    let repo = setup_test_db().await;
    let records = TaxBracketLoader::parse(TEST_CSV_2024.as_bytes()).expect("Failed to parse CSV");

    TaxBracketLoader::load(&repo, &records).await.unwrap();
    TaxBracketLoader::load(&repo, &records).await.unwrap();

    assert_eq!(repo.get_tax_brackets(2024).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_load_brackets_leaves_other_years() {
    let repo = setup_test_db().await;
    let other = "tax_year,min_income,max_income,rate\n2023,0,53359,0.15\n2023,53359,,0.205\n";
    TaxBracketLoader::load(&repo, &TaxBracketLoader::parse(other.as_bytes()).unwrap())
        .await
        .unwrap();

    let records = TaxBracketLoader::parse(TEST_CSV_2024.as_bytes()).unwrap();
    TaxBracketLoader::load(&repo, &records).await.unwrap();

    assert_eq!(repo.get_tax_brackets(2023).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_load_invalid_schedule_keeps_previous_brackets() {
    let repo = setup_test_db().await;
    let records = TaxBracketLoader::parse(TEST_CSV_2024.as_bytes()).unwrap();
    TaxBracketLoader::load(&repo, &records).await.unwrap();
    let before = repo.get_tax_brackets(2024).await.unwrap();
    // Top bracket is bounded, so income above 246752 would go untaxed.
    let bounded = "tax_year,min_income,max_income,rate\n\
        2024,0,55867,0.15\n2024,55867,246752,0.205\n";

    let err = TaxBracketLoader::load(&repo, &TaxBracketLoader::parse(bounded.as_bytes()).unwrap())
        .await
        .expect_err("bounded top bracket should be rejected");

    assert!(matches!(err, ImportError::InvalidSchedule { tax_year: 2024, .. }));
    assert_eq!(repo.get_tax_brackets(2024).await.unwrap(), before);
}

#[tokio::test]
async fn test_load_rejects_every_year_when_one_is_invalid() {
    let repo = setup_test_db().await;
    let mixed = "tax_year,min_income,max_income,rate\n\
        2023,0,53359,0.15\n2023,53359,,0.205\n\
        2025,100,,0.15\n";

    let err = TaxBracketLoader::load(&repo, &TaxBracketLoader::parse(mixed.as_bytes()).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::InvalidSchedule { tax_year: 2025, .. }));
    assert!(repo.get_tax_brackets(2023).await.unwrap().is_empty());
}

// =========================================================================
// domestic grant tests
// =========================================================================

#[tokio::test]
async fn test_import_domestic_directory() {
    let repo = setup_test_db().await;

    let summary = DomesticGrantImporter::import_dir(&repo, Path::new(DOMESTIC_DIR))
        .await
        .expect("Failed to import grants");

    assert_eq!(
        summary,
        ImportSummary {
            parsed: 6,
            inserted: 5,
            existing: 1,
            skipped: 1,
        }
    );
    assert_eq!(repo.count_grants().await, Ok(5));
}

#[tokio::test]
async fn test_domestic_fiscal_years_and_layouts() {
    let repo = setup_test_db().await;
    DomesticGrantImporter::import_dir(&repo, Path::new(DOMESTIC_DIR))
        .await
        .unwrap();

    let legacy = repo
        .list_grants(&GrantFilter {
            fiscal_year: Some("2018-19".to_string()),
            ..GrantFilter::default()
        })
        .await
        .unwrap();
    let references: Vec<&str> = legacy.iter().map(|g| g.reference_number.as_str()).collect();

    assert_eq!(legacy.len(), 3);
    assert_eq!(references[0], "legacy_2018-19_CMHC-2002");
    assert!(legacy[0].is_major_funding);
    assert_eq!(legacy[0].agreement_start_date, NaiveDate::from_ymd_opt(2018, 4, 1));
    assert!(references.iter().any(|r| r.starts_with("auto_2018-19_")));

    let current = repo
        .list_grants(&GrantFilter {
            province: Some("bc".to_string()),
            ..GrantFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].reference_number, "GC-2024-0001");
    assert_eq!(current[0].agreement_value, dec!(15000000.00));
    assert_eq!(current[0].fiscal_year, "2024-25");
    assert_eq!(current[0].description, "Pilot plant for direct air capture");
}

#[tokio::test]
async fn test_import_then_flag() {
    let repo = setup_test_db().await;
    DomesticGrantImporter::import_dir(&repo, Path::new(DOMESTIC_DIR))
        .await
        .unwrap();

    let flagged = flag_notable_grants(&repo, &NotableRules::standard(), false)
        .await
        .unwrap();
    let notable = repo
        .list_grants(&GrantFilter {
            notable_only: true,
            ..GrantFilter::default()
        })
        .await
        .unwrap();

    assert_eq!(flagged, notable.len() as u64);
    let titles: Vec<&str> = notable.iter().map(|g| g.agreement_title.as_str()).collect();
    assert!(titles.contains(&"Summer music festival"));
    assert!(titles.contains(&"Carbon capture pilot"));
    assert!(!titles.contains(&"Roof replacement"));
}

#[tokio::test]
async fn test_import_domestic_missing_directory() {
    let repo = setup_test_db().await;

    let result = DomesticGrantImporter::import_dir(&repo, Path::new("./no-such-dir")).await;

    assert!(matches!(result, Err(ImportError::Io(_))));
}

// =========================================================================
// GAC tests
// =========================================================================

#[tokio::test]
async fn test_import_gac_directory() {
    let repo = setup_test_db().await;

    let summary = GacGrantImporter::import_dir(&repo, Path::new(GAC_DIR), import_date())
        .await
        .expect("Failed to import GAC projects");

    assert_eq!(
        summary,
        ImportSummary {
            parsed: 4,
            inserted: 3,
            existing: 1,
            skipped: 1,
        }
    );
}

#[tokio::test]
async fn test_gac_status_comes_from_file() {
    let repo = setup_test_db().await;
    GacGrantImporter::import_dir(&repo, Path::new(GAC_DIR), import_date())
        .await
        .unwrap();

    let closed = repo
        .list_gac_grants(&GacGrantFilter {
            status: Some(GacStatus::Closed),
            ..GacGrantFilter::default()
        })
        .await
        .unwrap();

    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].project_number, "A-034567");
    assert_eq!(closed[0].date_modified, import_date());
    assert!(closed[0].has_environment_marker());

    let first_seen = repo
        .list_gac_grants(&GacGrantFilter {
            query: Some("Safe water".to_string()),
            ..GacGrantFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(first_seen.len(), 1);
    assert_eq!(first_seen[0].status, GacStatus::Operational);
    assert_eq!(first_seen[0].description, "Boreholes and latrines");
    assert_eq!(first_seen[0].primary_country(), "Mali");
}

#[tokio::test]
async fn test_gac_defaults_and_day_first_dates() {
    let repo = setup_test_db().await;
    GacGrantImporter::import_dir(&repo, Path::new(GAC_DIR), import_date())
        .await
        .unwrap();

    let haiti_projects = repo
        .list_gac_grants(&GacGrantFilter {
            country: Some("Haiti".to_string()),
            ..GacGrantFilter::default()
        })
        .await
        .unwrap();

    assert_eq!(haiti_projects.len(), 1);
    assert_eq!(haiti_projects[0].program_name, "Unknown Program");
    assert_eq!(haiti_projects[0].start_date, NaiveDate::from_ymd_opt(2022, 1, 15));
    assert_eq!(haiti_projects[0].end_date, None);
    assert_eq!(haiti_projects[0].maximum_contribution, dec!(850000));
}
