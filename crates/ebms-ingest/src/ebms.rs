//! Local eBMS CSV export path
//!
//! A simpler normalization pipeline than the GBIF path: no pagination, no
//! retry. Headers are canonicalized, legacy field encodings are decoded
//! (hemisphere-suffixed coordinates, `d/m/Y` dates, `"V"` verification
//! flags), and rows become typed `EbmsOccurrence` values ready for batch
//! insertion keyed on `occurrence_id`.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::normalize::{canonicalize_column_name, parse_coordinate, parse_date, NormalizeError};

/// Date format used by the legacy eBMS export
const EBMS_DATE_FORMAT: &str = "%d/%m/%Y";

/// Result type for the CSV path
pub type Result<T> = std::result::Result<T, EbmsFileError>;

/// Errors raised while loading a local export
#[derive(Debug, thiserror::Error)]
pub enum EbmsFileError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Row {row}: {source}")]
    MalformedRow {
        row: usize,
        #[source]
        source: NormalizeError,
    },

    #[error("Row {row}: malformed {column}: {value:?}")]
    MalformedValue {
        row: usize,
        column: String,
        value: String,
    },
}

/// A normalized occurrence row from the local eBMS export
///
/// `occurrence_id` is the natural key for duplicate suppression. The raw
/// coordinate strings are preserved in `latitude_full`/`longitude_full`
/// before hemisphere decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EbmsOccurrence {
    pub sample_id: i64,
    pub occurrence_id: i64,
    pub location: Option<String>,
    pub location_id: Option<i64>,
    pub country: Option<String>,
    pub date: Option<NaiveDate>,
    pub recorder_name: Option<String>,
    pub identified_by: Option<String>,
    pub accepted_species_name: Option<String>,
    pub authority: Option<String>,
    pub family: String,
    pub verification_status: bool,
    pub verified_by: Option<String>,
    pub count_inside: i64,
    pub count_outside: i64,
    pub latitude_full: String,
    pub longitude_full: String,
    pub latitude: f64,
    pub longitude: f64,
    pub record_status: Option<String>,
    pub record_substatus: Option<String>,
    pub comments: Option<String>,
    pub occurrence_comment: Option<String>,
}

/// Load and normalize a local eBMS CSV export.
///
/// Headers are matched after canonicalization, so `"Sample ID"` and
/// `sample_id` are equivalent. Rows with malformed required fields fail the
/// load with their row number; optional fields degrade to `None`.
pub fn load_occurrences(path: &Path) -> Result<Vec<EbmsOccurrence>> {
    let mut reader = csv::Reader::from_path(path)?;

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| (canonicalize_column_name(name), idx))
        .collect();

    for required in ["occurrence_id", "sample_id", "latitude", "longitude"] {
        if !columns.contains_key(required) {
            return Err(EbmsFileError::MissingColumn(required.to_string()));
        }
    }

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        // Row numbers are 1-based and skip the header line
        let row_number = idx + 2;
        let row = row?;
        records.push(parse_row(&row, &columns, row_number)?);
    }

    info!(
        path = %path.display(),
        records = records.len(),
        "Loaded eBMS export"
    );

    Ok(records)
}

fn parse_row(
    row: &csv::StringRecord,
    columns: &HashMap<String, usize>,
    row_number: usize,
) -> Result<EbmsOccurrence> {
    let field = |name: &str| -> Option<&str> {
        columns
            .get(name)
            .and_then(|&idx| row.get(idx))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let required_int = |name: &str| -> Result<i64> {
        let value = field(name).ok_or_else(|| EbmsFileError::MalformedValue {
            row: row_number,
            column: name.to_string(),
            value: String::new(),
        })?;
        value.parse().map_err(|_| EbmsFileError::MalformedValue {
            row: row_number,
            column: name.to_string(),
            value: value.to_string(),
        })
    };

    let required_coordinate = |name: &str| -> Result<(String, f64)> {
        let raw = field(name).ok_or_else(|| EbmsFileError::MalformedValue {
            row: row_number,
            column: name.to_string(),
            value: String::new(),
        })?;
        let decoded = parse_coordinate(raw)
            .map_err(|source| EbmsFileError::MalformedRow {
                row: row_number,
                source,
            })?;
        Ok((raw.to_string(), decoded))
    };

    let (latitude_full, latitude) = required_coordinate("latitude")?;
    let (longitude_full, longitude) = required_coordinate("longitude")?;

    let date = match field("date") {
        Some(raw) => Some(
            parse_date(raw, EBMS_DATE_FORMAT).map_err(|source| EbmsFileError::MalformedRow {
                row: row_number,
                source,
            })?,
        ),
        None => None,
    };

    Ok(EbmsOccurrence {
        sample_id: required_int("sample_id")?,
        occurrence_id: required_int("occurrence_id")?,
        location: field("location").map(str::to_string),
        location_id: field("location_id").and_then(|v| v.parse().ok()),
        country: field("country").map(str::to_string),
        date,
        recorder_name: field("recorder_name").map(str::to_string),
        identified_by: field("identified_by").map(str::to_string),
        accepted_species_name: field("accepted_species_name").map(str::to_string),
        authority: field("authority").map(str::to_string),
        family: field("family").unwrap_or("Unknown").to_string(),
        verification_status: field("verification_status") == Some("V"),
        verified_by: field("verified_by").map(str::to_string),
        count_inside: field("count_inside").and_then(|v| v.parse().ok()).unwrap_or(0),
        count_outside: field("count_outside").and_then(|v| v.parse().ok()).unwrap_or(0),
        latitude_full,
        longitude_full,
        latitude,
        longitude,
        record_status: field("record_status").map(str::to_string),
        record_substatus: field("record_substatus").map(str::to_string),
        comments: field("comments").map(str::to_string),
        occurrence_comment: field("occurrence_comment").map(str::to_string),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Sample ID,Occurrence ID,Location,Country,Date,Recorder Name,\
Accepted Species Name,Family,Verification Status,Count Inside,Count Outside,Latitude,Longitude";

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_load_normalizes_legacy_encodings() {
        let file = write_csv(&format!(
            "{}\n1001,5001,Parque Biologico,Portugal,24/05/2023,Doe J.,\
Pieris rapae,Pieridae,V,2,1,41.23N,8.60W\n",
            HEADER
        ));

        let records = load_occurrences(file.path()).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.sample_id, 1001);
        assert_eq!(record.occurrence_id, 5001);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2023, 5, 24));
        assert!(record.verification_status);
        assert_eq!(record.count_inside, 2);
        assert_eq!(record.latitude, 41.23);
        assert_eq!(record.longitude, -8.60);
        // Raw coordinates preserved before decoding
        assert_eq!(record.latitude_full, "41.23N");
        assert_eq!(record.longitude_full, "8.60W");
    }

    #[test]
    fn test_defaults_for_absent_optionals() {
        let file = write_csv(&format!(
            "{}\n1001,5001,,,,,,,U,,,41.23N,8.60W\n",
            HEADER
        ));

        let records = load_occurrences(file.path()).unwrap();
        let record = &records[0];

        assert_eq!(record.family, "Unknown");
        assert!(!record.verification_status);
        assert_eq!(record.count_inside, 0);
        assert_eq!(record.count_outside, 0);
        assert_eq!(record.date, None);
        assert_eq!(record.country, None);
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_csv("Sample ID,Latitude,Longitude\n1,41.23N,8.60W\n");

        let result = load_occurrences(file.path());
        assert!(matches!(result, Err(EbmsFileError::MissingColumn(col)) if col == "occurrence_id"));
    }

    #[test]
    fn test_malformed_coordinate_reports_row() {
        let file = write_csv(&format!(
            "{}\n1001,5001,,,,,,,V,0,0,41.23N,8.60W\n1002,5002,,,,,,,V,0,0,bogus,8.60W\n",
            HEADER
        ));

        let result = load_occurrences(file.path());
        assert!(matches!(
            result,
            Err(EbmsFileError::MalformedRow { row: 3, .. })
        ));
    }

    #[test]
    fn test_malformed_date_reports_row() {
        let file = write_csv(&format!(
            "{}\n1001,5001,,,2023-05-24,,,,V,0,0,41.23N,8.60W\n",
            HEADER
        ));

        let result = load_occurrences(file.path());
        assert!(matches!(
            result,
            Err(EbmsFileError::MalformedRow { row: 2, .. })
        ));
    }

    #[test]
    fn test_empty_file_yields_no_records() {
        let file = write_csv(&format!("{}\n", HEADER));
        let records = load_occurrences(file.path()).unwrap();
        assert!(records.is_empty());
    }
}
