//! Importer for the federal grants and contributions open-data exports.
//!
//! The exports are positional. Files from 2024-25 onward carry more than 35
//! columns and lead with the reference number; older files start at the
//! recipient province and have no reference number of their own.
//!
//! | field | current layout | legacy layout |
//! |-------|----------------|---------------|
//! | reference number | 0 | derived |
//! | province | 1 | 0 |
//! | city | 2 | 1 |
//! | legal name | 4 | 3 |
//! | operating name | 5 | 4 |
//! | recipient type | 7 | 6 |
//! | postal code | 8 | 7 |
//! | agreement title | 14 | 13 |
//! | agreement number | 16 | 15 |
//! | agreement value | 17 | 16 |
//! | description | 18 | 17 |
//! | expected results | 20 | 19 |
//! | start date | 22 | 21 |
//! | end date | 23 | 22 |
//! | NAICS identifier | 24 | 23 |
//! | NAICS sector | 25 | 24 |
//! | program name | 27 | 26 |
//! | program purpose | 29 | 28 |

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use csv::StringRecord;
use grants_core::{GrantRepository, NewGrant};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::fields::{parse_currency, parse_date, truncate};
use crate::{ImportError, ImportSummary, Parsed};

static FISCAL_YEAR_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})_(\d{2})").expect("valid fiscal year pattern"));

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Rows shorter than this are ignored outright.
const MIN_COLUMNS: usize = 10;
/// Rows wider than this use the current layout.
const CURRENT_LAYOUT_MIN_COLUMNS: usize = 36;

/// Column indexes of one export layout.
struct Layout {
    reference_number: Option<usize>,
    province: usize,
    city: usize,
    legal_name: usize,
    operating_name: usize,
    recipient_type: usize,
    postal_code: usize,
    title: usize,
    agreement_number: usize,
    value: usize,
    description: usize,
    expected_results: usize,
    start_date: usize,
    end_date: usize,
    naics_identifier: usize,
    naics_sector: usize,
    program_name: usize,
    program_purpose: usize,
}

const CURRENT_LAYOUT: Layout = Layout {
    reference_number: Some(0),
    province: 1,
    city: 2,
    legal_name: 4,
    operating_name: 5,
    recipient_type: 7,
    postal_code: 8,
    title: 14,
    agreement_number: 16,
    value: 17,
    description: 18,
    expected_results: 20,
    start_date: 22,
    end_date: 23,
    naics_identifier: 24,
    naics_sector: 25,
    program_name: 27,
    program_purpose: 29,
};

const LEGACY_LAYOUT: Layout = Layout {
    reference_number: None,
    province: 0,
    city: 1,
    legal_name: 3,
    operating_name: 4,
    recipient_type: 6,
    postal_code: 7,
    title: 13,
    agreement_number: 15,
    value: 16,
    description: 17,
    expected_results: 19,
    start_date: 21,
    end_date: 22,
    naics_identifier: 23,
    naics_sector: 24,
    program_name: 26,
    program_purpose: 28,
};

/// `"YYYY-YY"` from a name such as `2024_25_grants.csv`, else `"unknown"`.
pub fn fiscal_year_from_filename(file_name: &str) -> String {
    FISCAL_YEAR_IN_NAME
        .captures(file_name)
        .map(|caps| format!("{}-{}", &caps[1], &caps[2]))
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_header_line(line: &str) -> bool {
    line.contains("Reference Number") || line.contains("recipient_province")
}

fn row_hash(row: &StringRecord) -> String {
    let mut hasher = DefaultHasher::new();
    for field in row.iter() {
        field.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

fn column<'r>(
    row: &'r StringRecord,
    index: usize,
) -> Result<&'r str, String> {
    row.get(index)
        .ok_or_else(|| format!("missing column {} (row has {})", index, row.len()))
}

fn text(
    row: &StringRecord,
    index: usize,
    max_chars: usize,
) -> Result<String, String> {
    column(row, index).map(|value| truncate(value, max_chars))
}

/// Builds a grant from one data row.
///
/// Values that fail to parse become zero and unparseable dates become
/// `None`; only rows missing a mapped column are rejected.
pub(crate) fn parse_row(
    row: &StringRecord,
    fiscal_year: &str,
) -> Result<NewGrant, String> {
    let layout = if row.len() >= CURRENT_LAYOUT_MIN_COLUMNS {
        &CURRENT_LAYOUT
    } else {
        &LEGACY_LAYOUT
    };

    let agreement_number = text(row, layout.agreement_number, 100)?;
    let reference_number = match layout.reference_number {
        Some(index) => {
            let reference = column(row, index)?;
            if reference.is_empty() {
                format!("auto_{}_{}", fiscal_year, row_hash(row))
            } else {
                truncate(reference, 100)
            }
        }
        None if agreement_number.is_empty() => format!("auto_{}_{}", fiscal_year, row_hash(row)),
        None => truncate(&format!("legacy_{}_{}", fiscal_year, agreement_number), 100),
    };

    Ok(NewGrant {
        reference_number,
        recipient_province: text(row, layout.province, 50)?,
        recipient_city: text(row, layout.city, 100)?,
        recipient_legal_name: text(row, layout.legal_name, 500)?,
        recipient_operating_name: text(row, layout.operating_name, 500)?,
        recipient_type: text(row, layout.recipient_type, 10)?,
        recipient_postal_code: text(row, layout.postal_code, 10)?,
        agreement_title: text(row, layout.title, 1000)?,
        agreement_number,
        agreement_value: parse_currency(column(row, layout.value)?).unwrap_or_default(),
        description: text(row, layout.description, 2000)?,
        expected_results: text(row, layout.expected_results, 2000)?,
        agreement_start_date: parse_date(column(row, layout.start_date)?, &DATE_FORMATS),
        agreement_end_date: parse_date(column(row, layout.end_date)?, &DATE_FORMATS),
        naics_identifier: text(row, layout.naics_identifier, 20)?,
        naics_sector: text(row, layout.naics_sector, 200)?,
        program_name: text(row, layout.program_name, 500)?,
        program_purpose: text(row, layout.program_purpose, 1000)?,
        fiscal_year: truncate(fiscal_year, 10),
    })
}

pub struct DomesticGrantImporter;

impl DomesticGrantImporter {
    /// Parse one export. `fiscal_year` is stamped on every grant.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn parse<R: Read>(
        mut reader: R,
        fiscal_year: &str,
    ) -> Result<Parsed<NewGrant>, ImportError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let content = String::from_utf8_lossy(&bytes);

        let skip_first = content.lines().next().is_some_and(is_header_line);
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut parsed = Parsed::default();
        for (index, result) in csv_reader.records().enumerate() {
            if skip_first && index == 0 {
                continue;
            }
            let row = result?;
            if row.len() < MIN_COLUMNS {
                parsed.skipped += 1;
                continue;
            }
            match parse_row(&row, fiscal_year) {
                Ok(grant) => parsed.records.push(grant),
                Err(reason) => {
                    warn!(row = index + 1, %reason, "skipping grant row");
                    parsed.skipped += 1;
                }
            }
        }

        Ok(parsed)
    }

    /// Insert parsed grants; already stored reference numbers are left alone.
    pub async fn load<R: GrantRepository + ?Sized>(
        repo: &R,
        parsed: &Parsed<NewGrant>,
    ) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary {
            parsed: parsed.records.len(),
            skipped: parsed.skipped,
            ..ImportSummary::default()
        };

        for grant in &parsed.records {
            let outcome = repo.insert_grant(grant).await?;
            debug!(reference = %grant.reference_number, ?outcome, "stored grant");
            summary.record(outcome);
        }

        Ok(summary)
    }

    /// Parse and load one file, taking the fiscal year from its name.
    pub async fn import_file<R: GrantRepository + ?Sized>(
        repo: &R,
        path: &Path,
    ) -> Result<ImportSummary, ImportError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fiscal_year = fiscal_year_from_filename(&file_name);

        let file = std::fs::File::open(path)?;
        let parsed = Self::parse(file, &fiscal_year)?;
        let summary = Self::load(repo, &parsed).await?;

        info!(file = %file_name, fiscal_year = %fiscal_year, %summary, "imported grants file");
        Ok(summary)
    }

    /// Import every `.csv` file in `dir`, in file name order.
    pub async fn import_dir<R: GrantRepository + ?Sized>(
        repo: &R,
        dir: &Path,
    ) -> Result<ImportSummary, ImportError> {
        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        files.sort();

        let mut total = ImportSummary::default();
        for path in files {
            total.merge(Self::import_file(repo, &path).await?);
        }
        Ok(total)
    }
}
