use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{parse_industry_list, LenderAccount, LenderId};

#[derive(Debug, thiserror::Error)]
pub enum LenderImportError {
    #[error("failed to read lender export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid lender CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("lender row {row} has no Id")]
    MissingId { row: usize },
}

/// Reads a lender catalog exported as CSV.
pub struct LenderCsvImporter;

impl LenderCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<LenderAccount>, LenderImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<LenderAccount>, LenderImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut lenders = Vec::new();

        for (index, record) in csv_reader.deserialize::<LenderRow>().enumerate() {
            let row = record?;
            if row.id.trim().is_empty() {
                return Err(LenderImportError::MissingId { row: index + 1 });
            }

            lenders.push(LenderAccount {
                id: LenderId(row.id),
                name: row.name,
                minimum_credit_score: row.minimum_credit_score,
                minimum_monthly_deposit: row.minimum_monthly_deposit,
                restricted_industries: row
                    .restricted_industries
                    .as_deref()
                    .map(parse_industry_list)
                    .unwrap_or_default(),
                record_type: row.record_type,
            });
        }

        Ok(lenders)
    }
}

#[derive(Debug, Deserialize)]
struct LenderRow {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(
        rename = "Minimum Credit Score",
        default,
        deserialize_with = "blank_as_none"
    )]
    minimum_credit_score: Option<u16>,
    #[serde(
        rename = "Minimum Monthly Deposit",
        default,
        deserialize_with = "blank_as_none"
    )]
    minimum_monthly_deposit: Option<f64>,
    #[serde(rename = "Restricted Industries", default)]
    restricted_industries: Option<String>,
    #[serde(rename = "Record Type", default, deserialize_with = "blank_string_as_none")]
    record_type: Option<String>,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .replace(['$', ','], "")
            .parse::<T>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn blank_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "Id,Name,Minimum Credit Score,Minimum Monthly Deposit,Restricted Industries,Record Type\n\
001A,Harbor Capital,650,\"$4,000\",Gambling;Cannabis,API_Lenders\n\
001B,Prairie Funding,,2500,,\n";

    #[test]
    fn parses_currency_and_picklist_cells() {
        let lenders = LenderCsvImporter::from_reader(EXPORT.as_bytes()).expect("csv parses");
        assert_eq!(lenders.len(), 2);

        let harbor = &lenders[0];
        assert_eq!(harbor.minimum_credit_score, Some(650));
        assert_eq!(harbor.minimum_monthly_deposit, Some(4000.0));
        assert!(harbor.restricts("cannabis"));
        assert_eq!(harbor.record_type.as_deref(), Some("API_Lenders"));
    }

    #[test]
    fn blank_thresholds_stay_missing() {
        let lenders = LenderCsvImporter::from_reader(EXPORT.as_bytes()).expect("csv parses");
        let prairie = &lenders[1];
        assert_eq!(prairie.minimum_credit_score, None);
        assert!(prairie.restricted_industries.is_empty());
        assert_eq!(prairie.record_type, None);
    }

    #[test]
    fn rejects_rows_without_an_id() {
        let export = "Id,Name\n,Nameless Bank\n";
        match LenderCsvImporter::from_reader(export.as_bytes()) {
            Err(LenderImportError::MissingId { row: 1 }) => {}
            other => panic!("expected missing id error, got {other:?}"),
        }
    }
}
