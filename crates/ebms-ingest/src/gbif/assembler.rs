// GBIF Record Assembly
//
// Maps raw occurrence-search JSON records into typed `GbifOccurrence` rows.
// The mapping table from GBIF field names to canonical column names is fixed;
// unknown fields are dropped by design. Assembly is total and
// order-preserving: malformed optional fields degrade to None instead of
// failing the batch.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use crate::gbif::models::{GbifOccurrence, RawOccurrence};
use crate::normalize::split_multi_valued;

/// GBIF source field names (canonical names live on `GbifOccurrence`)
const KEY: &str = "key";
const LOCATION_ID: &str = "locationID";
const COUNTRY: &str = "country";
const STATE_PROVINCE: &str = "stateProvince";
const COUNTY: &str = "county";
const MUNICIPALITY: &str = "municipality";
const EVENT_DATE: &str = "eventDate";
const RECORDED_BY: &str = "recordedBy";
const IDENTIFIED_BY: &str = "identifiedBy";
const SPECIES: &str = "species";
const GENUS: &str = "genus";
const FAMILY: &str = "family";
const LIFE_STAGE: &str = "lifeStage";
const INDIVIDUAL_COUNT: &str = "individualCount";
const DECIMAL_LATITUDE: &str = "decimalLatitude";
const DECIMAL_LONGITUDE: &str = "decimalLongitude";
const SAMPLING_PROTOCOL: &str = "samplingProtocol";
const EVENT_TIME: &str = "eventTime";
const NAME_AUTHORSHIP: &str = "scientificNameAuthorship";

/// Assemble a raw page batch into normalized occurrence rows.
///
/// Order-preserving. Raw records without the `key` natural key cannot be
/// deduplicated at write time and are skipped with a warning; an empty input
/// yields an empty batch.
pub fn assemble(raw_records: &[RawOccurrence]) -> Vec<GbifOccurrence> {
    let mut records = Vec::with_capacity(raw_records.len());

    for (index, raw) in raw_records.iter().enumerate() {
        match assemble_one(raw) {
            Some(record) => records.push(record),
            None => {
                warn!(index, "Skipping occurrence without a natural key");
            },
        }
    }

    records
}

fn assemble_one(raw: &RawOccurrence) -> Option<GbifOccurrence> {
    let occurrence_key = get_i64(raw, KEY)?;

    let species = get_string(raw, SPECIES);
    let genus = get_string(raw, GENUS);
    // Preferred name falls back from species to genus
    let name = species.clone().or_else(|| genus.clone());

    let event_time = get_string(raw, EVENT_TIME);
    // Fixed-arity decomposition of the combined time range
    let mut time_parts = split_multi_valued(event_time.as_deref(), Some(2));
    let event_end_time = non_empty(time_parts.pop());
    let event_start_time = non_empty(time_parts.pop());

    Some(GbifOccurrence {
        occurrence_key,
        location_id: get_string(raw, LOCATION_ID),
        country: get_string(raw, COUNTRY),
        province: get_string(raw, STATE_PROVINCE),
        county: get_string(raw, COUNTY),
        municipality: get_string(raw, MUNICIPALITY),
        date: get_event_date(raw),
        recorded_by: get_string(raw, RECORDED_BY),
        identified_by: get_string(raw, IDENTIFIED_BY),
        species,
        genus,
        name,
        family: get_string(raw, FAMILY),
        life_stage: get_string(raw, LIFE_STAGE),
        count: get_i64(raw, INDIVIDUAL_COUNT),
        latitude: get_f64(raw, DECIMAL_LATITUDE),
        longitude: get_f64(raw, DECIMAL_LONGITUDE),
        trap: get_string(raw, SAMPLING_PROTOCOL),
        event_time,
        event_start_time,
        event_end_time,
        name_authorship: get_string(raw, NAME_AUTHORSHIP),
    })
}

fn non_empty(part: Option<String>) -> Option<String> {
    part.filter(|s| !s.is_empty())
}

fn get_string(raw: &RawOccurrence, field: &str) -> Option<String> {
    match raw.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        // GBIF serializes some identifiers as bare numbers
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn get_i64(raw: &RawOccurrence, field: &str) -> Option<i64> {
    match raw.get(field) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn get_f64(raw: &RawOccurrence, field: &str) -> Option<f64> {
    match raw.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

/// GBIF event dates are ISO-8601, sometimes with a time suffix; only the
/// calendar date is kept. Malformed values degrade to None.
fn get_event_date(raw: &RawOccurrence) -> Option<NaiveDate> {
    let raw_date = get_string(raw, EVENT_DATE)?;
    let date_part = raw_date.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawOccurrence {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be a JSON object"),
        }
    }

    fn sample_record() -> RawOccurrence {
        raw(json!({
            "key": 4509177554u64,
            "locationID": "1481",
            "country": "Portugal",
            "stateProvince": "Porto",
            "county": "Vila Nova de Gaia",
            "municipality": "Avintes",
            "eventDate": "2023-05-24T00:00:00",
            "recordedBy": "Doe, J.|Smith, A.",
            "identifiedBy": "Doe, J.",
            "species": "Pieris rapae",
            "genus": "Pieris",
            "family": "Pieridae",
            "lifeStage": "Adult",
            "individualCount": 3,
            "decimalLatitude": 41.23,
            "decimalLongitude": -8.60,
            "samplingProtocol": "LED light trap",
            "eventTime": "08:00/09:30",
            "scientificNameAuthorship": "(Linnaeus, 1758)",
            "datasetKey": "ignored-extra-field"
        }))
    }

    #[test]
    fn test_renames_known_fields() {
        let records = assemble(&[sample_record()]);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.occurrence_key, 4509177554);
        assert_eq!(record.location_id.as_deref(), Some("1481"));
        assert_eq!(record.province.as_deref(), Some("Porto"));
        assert_eq!(record.trap.as_deref(), Some("LED light trap"));
        assert_eq!(record.count, Some(3));
        assert_eq!(record.latitude, Some(41.23));
        assert_eq!(record.longitude, Some(-8.60));
        assert_eq!(record.name_authorship.as_deref(), Some("(Linnaeus, 1758)"));
        assert_eq!(
            record.date,
            NaiveDate::from_ymd_opt(2023, 5, 24)
        );
    }

    #[test]
    fn test_preferred_name_uses_species() {
        let records = assemble(&[sample_record()]);
        assert_eq!(records[0].name.as_deref(), Some("Pieris rapae"));
    }

    #[test]
    fn test_preferred_name_falls_back_to_genus() {
        let mut record = sample_record();
        record.remove("species");

        let records = assemble(&[record]);
        assert_eq!(records[0].species, None);
        assert_eq!(records[0].name.as_deref(), Some("Pieris"));
    }

    #[test]
    fn test_event_time_fixed_arity_split() {
        let records = assemble(&[sample_record()]);
        let record = &records[0];

        assert_eq!(record.event_start_time.as_deref(), Some("08:00"));
        assert_eq!(record.event_end_time.as_deref(), Some("09:30"));
        // Raw combined value stays recoverable
        assert_eq!(record.event_time.as_deref(), Some("08:00/09:30"));
    }

    #[test]
    fn test_event_time_single_component() {
        let mut record = sample_record();
        record.insert("eventTime".to_string(), json!("08:00"));

        let records = assemble(&[record]);
        assert_eq!(records[0].event_start_time.as_deref(), Some("08:00"));
        assert_eq!(records[0].event_end_time, None);
    }

    #[test]
    fn test_malformed_optional_fields_become_none() {
        let mut record = sample_record();
        record.insert("eventDate".to_string(), json!("not-a-date"));
        record.insert("individualCount".to_string(), json!("many"));
        record.insert("decimalLatitude".to_string(), json!({"unexpected": true}));

        let records = assemble(&[record]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, None);
        assert_eq!(records[0].count, None);
        assert_eq!(records[0].latitude, None);
    }

    #[test]
    fn test_record_without_key_is_skipped() {
        let mut keyless = sample_record();
        keyless.remove("key");

        let records = assemble(&[sample_record(), keyless, sample_record()]);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_empty_input_yields_empty_batch() {
        assert!(assemble(&[]).is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let mut first = sample_record();
        first.insert("key".to_string(), json!(1));
        let mut second = sample_record();
        second.insert("key".to_string(), json!(2));

        let records = assemble(&[first, second]);
        assert_eq!(records[0].occurrence_key, 1);
        assert_eq!(records[1].occurrence_key, 2);
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let record = raw(json!({"key": 7, "somethingNew": "value"}));
        let records = assemble(&[record]);

        assert_eq!(records[0].occurrence_key, 7);
        assert_eq!(records[0].country, None);
    }
}
