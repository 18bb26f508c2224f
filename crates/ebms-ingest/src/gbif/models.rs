// GBIF Data Models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::split_multi_valued;

/// One raw occurrence record as returned by the GBIF API
pub type RawOccurrence = serde_json::Map<String, serde_json::Value>;

/// One page of the GBIF occurrence-search response
///
/// `count` is the authoritative catalogue total and is re-read from every
/// response; the fetch loop terminates once `offset` reaches it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    pub offset: i64,
    pub limit: i64,
    pub count: i64,
    #[serde(default)]
    pub end_of_records: bool,
    #[serde(default)]
    pub results: Vec<RawOccurrence>,
}

/// Transient per-month pagination state, owned by the fetcher
///
/// Not persisted across runs: a failed month restarts from offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCursor {
    pub offset: i64,
    pub limit: i64,
    pub request_count: u64,
}

impl FetchCursor {
    pub fn new(limit: i64) -> Self {
        FetchCursor {
            offset: 0,
            limit,
            request_count: 0,
        }
    }

    /// Advance past the page just fetched
    pub fn advance(&mut self) {
        self.offset += self.limit;
        self.request_count += 1;
    }
}

/// A normalized eBMS occurrence from the GBIF path
///
/// Built once per raw record by the assembler; immutable afterwards.
/// `occurrence_key` is the natural key used for duplicate suppression at
/// write time and is never absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbifOccurrence {
    pub occurrence_key: i64,
    pub location_id: Option<String>,
    pub country: Option<String>,
    pub province: Option<String>,
    pub county: Option<String>,
    pub municipality: Option<String>,
    pub date: Option<NaiveDate>,
    /// Raw delimited text as published; split views are derived, see
    /// [`GbifOccurrence::recorded_by_list`]
    pub recorded_by: Option<String>,
    pub identified_by: Option<String>,
    pub species: Option<String>,
    pub genus: Option<String>,
    /// Preferred name: species, falling back to genus
    pub name: Option<String>,
    pub family: Option<String>,
    pub life_stage: Option<String>,
    pub count: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub trap: Option<String>,
    pub event_time: Option<String>,
    pub event_start_time: Option<String>,
    pub event_end_time: Option<String>,
    pub name_authorship: Option<String>,
}

impl GbifOccurrence {
    /// Individual recorders, split from the delimited `recorded_by` text
    pub fn recorded_by_list(&self) -> Vec<String> {
        split_multi_valued(self.recorded_by.as_deref(), None)
    }

    /// Individual identifiers, split from the delimited `identified_by` text
    pub fn identified_by_list(&self) -> Vec<String> {
        split_multi_valued(self.identified_by.as_deref(), None)
    }
}

// ============================================================================
// Tests
// ============================================================================
