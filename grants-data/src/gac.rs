//! Importer for the Global Affairs Canada project browser exports.
//!
//! One file per project status; the status is not a column. Columns are
//! matched by header name after trimming, which also accepts the export's
//! `" Description"` header.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use grants_core::{GacStatus, GrantRepository, NewGlobalAffairsGrant};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::fields::{parse_currency, parse_date, truncate};
use crate::{ImportError, ImportSummary, Parsed};

/// Export file names and the status each one holds.
pub const GAC_FILES: [(&str, GacStatus); 3] = [
    ("GFC_operational.csv", GacStatus::Operational),
    ("GFC_closed.csv", GacStatus::Closed),
    ("GFC_terminating.csv", GacStatus::Terminating),
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];

const DEFAULT_TITLE: &str = "Untitled Project";
const DEFAULT_PROGRAM: &str = "Unknown Program";

/// Header positions, resolved once per file.
struct Columns {
    project_number: Option<usize>,
    date_modified: Option<usize>,
    title: Option<usize>,
    description: Option<usize>,
    start_date: Option<usize>,
    end_date: Option<usize>,
    country: Option<usize>,
    region: Option<usize>,
    executing_agency_partner: Option<usize>,
    maximum_contribution: Option<usize>,
    program_name: Option<usize>,
    dac_sector: Option<usize>,
    policy_markers: Option<usize>,
    expected_results: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Self {
        let exact = |name: &str| headers.iter().position(|h| h.trim() == name);

        Self {
            // Tolerates a byte-order mark glued to the first header.
            project_number: headers.iter().position(|h| h.contains("Project Number")),
            date_modified: exact("Date Modified"),
            title: exact("Title"),
            description: exact("Description"),
            start_date: exact("Start Date"),
            end_date: exact("End Date"),
            country: exact("Country"),
            region: exact("Region"),
            executing_agency_partner: exact("Executing Agency Partner"),
            maximum_contribution: exact("Maximum Contribution"),
            program_name: exact("Program Name"),
            dac_sector: exact("DAC Sector"),
            policy_markers: exact("Policy Markers"),
            expected_results: exact("Expected Results"),
        }
    }
}

fn field<'r>(
    row: &'r StringRecord,
    index: Option<usize>,
) -> &'r str {
    index.and_then(|i| row.get(i)).map(str::trim).unwrap_or_default()
}

fn text(
    row: &StringRecord,
    index: Option<usize>,
    max_chars: usize,
) -> String {
    truncate(field(row, index), max_chars)
}

fn or_default(
    value: String,
    default: &str,
) -> String {
    if value.is_empty() { default.to_string() } else { value }
}

/// Why a GAC row was not turned into a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    MissingProjectNumber,
    NoContribution,
}

fn parse_row(
    row: &StringRecord,
    columns: &Columns,
    status: GacStatus,
    today: NaiveDate,
) -> Result<NewGlobalAffairsGrant, Rejection> {
    let project_number = text(row, columns.project_number, 100);
    if project_number.is_empty() {
        return Err(Rejection::MissingProjectNumber);
    }

    let maximum_contribution = parse_currency(field(row, columns.maximum_contribution))
        .filter(|value| *value > Decimal::ZERO)
        .ok_or(Rejection::NoContribution)?;

    Ok(NewGlobalAffairsGrant {
        project_number,
        date_modified: parse_date(field(row, columns.date_modified), &DATE_FORMATS)
            .unwrap_or(today),
        title: or_default(text(row, columns.title, 500), DEFAULT_TITLE),
        description: text(row, columns.description, 2000),
        status,
        start_date: parse_date(field(row, columns.start_date), &DATE_FORMATS),
        end_date: parse_date(field(row, columns.end_date), &DATE_FORMATS),
        country: text(row, columns.country, 255),
        region: text(row, columns.region, 255),
        executing_agency_partner: text(row, columns.executing_agency_partner, 500),
        maximum_contribution,
        program_name: or_default(text(row, columns.program_name, 500), DEFAULT_PROGRAM),
        dac_sector: text(row, columns.dac_sector, 500),
        policy_markers: text(row, columns.policy_markers, 1000),
        expected_results: text(row, columns.expected_results, 2000),
    })
}

pub struct GacGrantImporter;

impl GacGrantImporter {
    /// Parse one export whose projects all have `status`.
    ///
    /// `today` stands in for a missing or unreadable modification date.
    /// Repeated project numbers after the first are skipped.
    pub fn parse<R: Read>(
        reader: R,
        status: GacStatus,
        today: NaiveDate,
    ) -> Result<Parsed<NewGlobalAffairsGrant>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns = Columns::resolve(csv_reader.headers()?);

        let mut seen = HashSet::new();
        let mut parsed = Parsed::default();
        for (index, result) in csv_reader.records().enumerate() {
            let row = result?;
            match parse_row(&row, &columns, status, today) {
                Ok(grant) if seen.insert(grant.project_number.clone()) => {
                    parsed.records.push(grant)
                }
                Ok(grant) => {
                    debug!(project = %grant.project_number, "duplicate project number");
                    parsed.skipped += 1;
                }
                Err(rejection) => {
                    // Header is line 1.
                    debug!(line = index + 2, ?rejection, "skipping GAC row");
                    parsed.skipped += 1;
                }
            }
        }

        Ok(parsed)
    }

    pub async fn load<R: GrantRepository + ?Sized>(
        repo: &R,
        parsed: &Parsed<NewGlobalAffairsGrant>,
    ) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary {
            parsed: parsed.records.len(),
            skipped: parsed.skipped,
            ..ImportSummary::default()
        };

        for grant in &parsed.records {
            summary.record(repo.insert_gac_grant(grant).await?);
        }

        Ok(summary)
    }

    /// Import the three status files from `dir`. Missing files are warned
    /// about and skipped.
    pub async fn import_dir<R: GrantRepository + ?Sized>(
        repo: &R,
        dir: &Path,
        today: NaiveDate,
    ) -> Result<ImportSummary, ImportError> {
        let mut total = ImportSummary::default();

        for (file_name, status) in GAC_FILES {
            let path = dir.join(file_name);
            if !path.is_file() {
                warn!(file = %path.display(), "GAC export not found");
                continue;
            }

            let file = std::fs::File::open(&path)?;
            let parsed = Self::parse(file, status, today)?;
            let summary = Self::load(repo, &parsed).await?;
            info!(file = file_name, status = status.as_str(), %summary, "imported GAC file");
            total.merge(summary);
        }

        Ok(total)
    }
}
