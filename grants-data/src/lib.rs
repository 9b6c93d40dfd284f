//! CSV importers for the grant corpora and the federal tax brackets.
//!
//! Every importer is split into a synchronous `parse` step over any
//! [`std::io::Read`] and an async `load` step that writes through a
//! [`grants_core::GrantRepository`], so parsing can be tested without a
//! database and loading works with any backend.
//!
//! | importer | input | keyed by |
//! |----------|-------|----------|
//! | [`TaxBracketLoader`] | `tax_year,min_income,max_income,rate` | tax year (replaced) |
//! | [`DomesticGrantImporter`] | positional open-data exports | reference number |
//! | [`GacGrantImporter`] | `GFC_<status>.csv` with headers | project number |

use std::fmt;

use grants_core::calculations::ValidationError;
use grants_core::{InsertOutcome, RepositoryError};
use thiserror::Error;

mod brackets;
mod domestic;
mod fields;
mod gac;

pub use brackets::{TaxBracketLoader, TaxBracketRecord};
pub use domestic::{DomesticGrantImporter, fiscal_year_from_filename};
pub use fields::{parse_currency, parse_date, truncate};
pub use gac::{GAC_FILES, GacGrantImporter};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid {tax_year} bracket schedule: {source}")]
    InvalidSchedule {
        tax_year: i32,
        #[source]
        source: ValidationError,
    },
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParse(err.to_string())
    }
}

/// Records accepted by a `parse` step, plus the rows it dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// Counts reported by every importer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub parsed: usize,
    pub inserted: usize,
    /// Records whose key was already stored.
    pub existing: usize,
    pub skipped: usize,
}

impl ImportSummary {
    pub fn record(
        &mut self,
        outcome: InsertOutcome,
    ) {
        match outcome {
            InsertOutcome::Inserted(_) => self.inserted += 1,
            InsertOutcome::Existing(_) => self.existing += 1,
        }
    }

    pub fn merge(
        &mut self,
        other: ImportSummary,
    ) {
        self.parsed += other.parsed;
        self.inserted += other.inserted;
        self.existing += other.existing;
        self.skipped += other.skipped;
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{} parsed, {} inserted, {} already present, {} skipped",
            self.parsed, self.inserted, self.existing, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn summary_records_outcomes() {
        let mut summary = ImportSummary::default();

        summary.record(InsertOutcome::Inserted(1));
        summary.record(InsertOutcome::Existing(1));
        summary.record(InsertOutcome::Inserted(2));

        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.existing, 1);
    }

    #[test]
    fn summaries_merge_field_by_field() {
        let mut total = ImportSummary {
            parsed: 3,
            inserted: 2,
            existing: 1,
            skipped: 4,
        };

        total.merge(ImportSummary {
            parsed: 1,
            inserted: 1,
            existing: 0,
            skipped: 2,
        });

        assert_eq!(
            total.to_string(),
            "4 parsed, 3 inserted, 1 already present, 6 skipped"
        );
    }

    #[test]
    fn csv_errors_become_parse_errors() {
        let err = csv::ReaderBuilder::new()
            .from_reader("a,b\n1\n".as_bytes())
            .records()
            .find_map(Result::err)
            .expect("short row is an error without flexible()");

        assert!(matches!(ImportError::from(err), ImportError::CsvParse(_)));
    }
}
