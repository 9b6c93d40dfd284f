use std::collections::BTreeMap;
use std::io::Read;

use grants_core::calculations::IncomeTaxSchedule;
use grants_core::{GrantRepository, TaxBracket};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::{ImportError, ImportSummary};

/// A single record from the tax brackets CSV file.
///
/// - `tax_year`: the tax year (e.g., 2024)
/// - `min_income`: lower bound of the bracket
/// - `max_income`: upper bound (empty for the top bracket)
/// - `rate`: marginal rate as a decimal (e.g., 0.15 for 15%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub tax_year: i32,
    pub min_income: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub max_income: Option<Decimal>,
    pub rate: Decimal,
}

impl From<&TaxBracketRecord> for TaxBracket {
    fn from(record: &TaxBracketRecord) -> Self {
        TaxBracket {
            tax_year: record.tax_year,
            min_income: record.min_income,
            max_income: record.max_income,
            tax_rate: record.rate,
        }
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for federal bracket schedules.
pub struct TaxBracketLoader;

impl TaxBracketLoader {
    /// Parse tax bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Replace the stored schedule of every tax year present in `records`.
    ///
    /// Every year's schedule is validated before anything is written, and
    /// each year is swapped in one transaction, so loading the same file
    /// twice leaves one copy and a rejected file leaves the store untouched.
    pub async fn load<R: GrantRepository + ?Sized>(
        repo: &R,
        records: &[TaxBracketRecord],
    ) -> Result<ImportSummary, ImportError> {
        let mut by_year: BTreeMap<i32, Vec<TaxBracket>> = BTreeMap::new();
        for record in records {
            by_year
                .entry(record.tax_year)
                .or_default()
                .push(TaxBracket::from(record));
        }

        for (tax_year, brackets) in by_year.iter_mut() {
            brackets.sort_by_key(|b| b.min_income);
            IncomeTaxSchedule::new(brackets)
                .validate()
                .map_err(|source| ImportError::InvalidSchedule {
                    tax_year: *tax_year,
                    source,
                })?;
        }

        let mut summary = ImportSummary {
            parsed: records.len(),
            ..ImportSummary::default()
        };

        for (tax_year, brackets) in &by_year {
            let removed = repo.replace_tax_brackets(*tax_year, brackets).await?;
            summary.inserted += brackets.len();
            info!(tax_year, removed, inserted = brackets.len(), "replaced tax brackets");
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const TEST_CSV: &str = r#"tax_year,min_income,max_income,rate
2024,0,55867,0.15
2024,55867,111733,0.205
2024,111733,173205,0.26
2024,173205,246752,0.29
2024,246752,,0.33
"#;

    #[test]
    fn test_parse_csv_single_bracket() {
        let csv = "tax_year,min_income,max_income,rate\n2024,0,55867,0.15";

        let records = TaxBracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(
            records,
            vec![TaxBracketRecord {
                tax_year: 2024,
                min_income: dec!(0),
                max_income: Some(dec!(55867)),
                rate: dec!(0.15),
            }]
        );
    }

    #[test]
    fn test_parse_csv_unlimited_max_income() {
        let records = TaxBracketLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records.len(), 5);
        assert_eq!(records[4].max_income, None);
        assert_eq!(records[4].min_income, dec!(246752));
        assert_eq!(records[4].rate, dec!(0.33));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let csv = "tax_year, min_income, max_income, rate\n2024, 0 , 55867 , 0.15";

        let records = TaxBracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records[0].max_income, Some(dec!(55867)));
    }

    #[test]
    fn test_parse_invalid_csv_missing_column() {
        let csv = "tax_year,min_income\n2024,0";

        let err = TaxBracketLoader::parse(csv.as_bytes()).expect_err("Should fail for missing column");

        let ImportError::CsvParse(msg) = err else {
            panic!("Expected CsvParse error, got: {:?}", err);
        };
        assert!(msg.contains("missing field"), "Expected 'missing field' in error, got: {}", msg);
    }

    #[test]
    fn test_parse_invalid_csv_bad_decimal() {
        let csv = "tax_year,min_income,max_income,rate\n2024,abc,55867,0.15";

        let err = TaxBracketLoader::parse(csv.as_bytes()).expect_err("Should fail for invalid decimal");

        assert!(matches!(err, ImportError::CsvParse(_)));
    }

    #[test]
    fn test_parse_empty_csv() {
        let csv = "tax_year,min_income,max_income,rate\n";

        let records = TaxBracketLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert!(records.is_empty());
    }

    #[test]
    fn test_record_converts_to_bracket() {
        let records = TaxBracketLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");

        let bracket = TaxBracket::from(&records[1]);

        assert_eq!(
            bracket,
            TaxBracket {
                tax_year: 2024,
                min_income: dec!(55867),
                max_income: Some(dec!(111733)),
                tax_rate: dec!(0.205),
            }
        );
    }
}
