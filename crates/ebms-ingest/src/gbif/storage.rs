// Occurrence Storage Layer
//
// Chunked batch inserts into PostgreSQL. Each destination table may carry a
// conflict policy naming its natural-key column(s); rows colliding with an
// existing key are skipped silently (ON CONFLICT DO NOTHING) and excluded
// from the returned insert count. Tables without a policy entry append
// unconditionally.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::ebms::EbmsOccurrence;
use crate::gbif::models::GbifOccurrence;
use crate::gbif::{Result, DEFAULT_OCCURRENCE_CHUNK_SIZE};

/// Destination table for the GBIF path
pub const GBIF_TABLE: &str = "gbif_occurrence";

/// Destination table for the local eBMS export path
///
/// The misspelling is preserved from the legacy schema.
pub const EBMS_TABLE: &str = "ocurrence";

/// Per-table uniqueness configuration for duplicate suppression
#[derive(Debug, Clone)]
pub struct ConflictPolicy {
    keys: HashMap<String, Vec<String>>,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        let mut keys = HashMap::new();
        keys.insert(EBMS_TABLE.to_string(), vec!["occurrence_id".to_string()]);
        keys.insert(GBIF_TABLE.to_string(), vec!["occurrence_key".to_string()]);
        // session_detail is deliberately absent: details are only fetched
        // for sessions that do not have one yet, so inserts cannot collide.
        ConflictPolicy { keys }
    }
}

impl ConflictPolicy {
    /// Empty policy: every table appends unconditionally
    pub fn none() -> Self {
        ConflictPolicy {
            keys: HashMap::new(),
        }
    }

    /// Register the unique-key column(s) for a table
    pub fn with_table(mut self, table: impl Into<String>, columns: Vec<String>) -> Self {
        self.keys.insert(table.into(), columns);
        self
    }

    /// Unique-key column(s) for a table, if any
    pub fn key_columns(&self, table: &str) -> Option<&[String]> {
        self.keys.get(table).map(Vec::as_slice)
    }

    /// SQL conflict clause for a table, or an empty string for
    /// unconditional-append tables
    pub fn conflict_clause(&self, table: &str) -> String {
        match self.keys.get(table) {
            Some(columns) => format!(" ON CONFLICT ({}) DO NOTHING", columns.join(", ")),
            None => String::new(),
        }
    }
}

/// Storage handler for occurrence batches
pub struct OccurrenceStorage {
    db: PgPool,
    policy: ConflictPolicy,
    chunk_size: usize,
}

impl OccurrenceStorage {
    /// Create new storage handler with the default conflict policy
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            policy: ConflictPolicy::default(),
            chunk_size: DEFAULT_OCCURRENCE_CHUNK_SIZE,
        }
    }

    /// Create storage handler with a custom policy and chunk size
    pub fn with_policy(db: PgPool, policy: ConflictPolicy, chunk_size: usize) -> Self {
        Self {
            db,
            policy,
            chunk_size,
        }
    }

    /// Insert a batch of GBIF occurrences into `gbif_occurrence`.
    ///
    /// Returns the number of rows actually written; duplicates skipped by the
    /// conflict policy are not counted. An empty batch is a no-op.
    pub async fn insert_gbif_occurrences(&self, records: &[GbifOccurrence]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let conflict_clause = self.policy.conflict_clause(GBIF_TABLE);
        let mut inserted = 0u64;

        for chunk in records.chunks(self.chunk_size) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                r#"
                INSERT INTO gbif_occurrence (
                    occurrence_key,
                    location_id,
                    country,
                    province,
                    county,
                    municipality,
                    date,
                    recorded_by,
                    identified_by,
                    species,
                    genus,
                    name,
                    family,
                    life_stage,
                    count,
                    latitude,
                    longitude,
                    trap,
                    event_time,
                    event_start_time,
                    event_end_time,
                    name_authorship
                )
                "#,
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.occurrence_key)
                    .push_bind(&record.location_id)
                    .push_bind(&record.country)
                    .push_bind(&record.province)
                    .push_bind(&record.county)
                    .push_bind(&record.municipality)
                    .push_bind(record.date)
                    .push_bind(&record.recorded_by)
                    .push_bind(&record.identified_by)
                    .push_bind(&record.species)
                    .push_bind(&record.genus)
                    .push_bind(&record.name)
                    .push_bind(&record.family)
                    .push_bind(&record.life_stage)
                    .push_bind(record.count)
                    .push_bind(record.latitude)
                    .push_bind(record.longitude)
                    .push_bind(&record.trap)
                    .push_bind(&record.event_time)
                    .push_bind(&record.event_start_time)
                    .push_bind(&record.event_end_time)
                    .push_bind(&record.name_authorship);
            });

            query_builder.push(&conflict_clause);

            let result = query_builder.build().execute(&self.db).await?;
            inserted += result.rows_affected();
        }

        info!(
            table = GBIF_TABLE,
            batch = records.len(),
            inserted,
            skipped = records.len() as u64 - inserted,
            "Stored occurrence batch"
        );

        Ok(inserted)
    }

    /// Insert a batch of local eBMS occurrences into `ocurrence`.
    ///
    /// Same contract as [`OccurrenceStorage::insert_gbif_occurrences`] with
    /// `occurrence_id` as the natural key.
    pub async fn insert_ebms_occurrences(&self, records: &[EbmsOccurrence]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let conflict_clause = self.policy.conflict_clause(EBMS_TABLE);
        let mut inserted = 0u64;

        for chunk in records.chunks(self.chunk_size) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                r#"
                INSERT INTO ocurrence (
                    sample_id,
                    occurrence_id,
                    location,
                    location_id,
                    country,
                    date,
                    recorder_name,
                    identified_by,
                    accepted_species_name,
                    authority,
                    family,
                    verification_status,
                    verified_by,
                    count_inside,
                    count_outside,
                    latitude_full,
                    longitude_full,
                    latitude,
                    longitude,
                    record_status,
                    record_substatus,
                    comments,
                    occurrence_comment
                )
                "#,
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.sample_id)
                    .push_bind(record.occurrence_id)
                    .push_bind(&record.location)
                    .push_bind(record.location_id)
                    .push_bind(&record.country)
                    .push_bind(record.date)
                    .push_bind(&record.recorder_name)
                    .push_bind(&record.identified_by)
                    .push_bind(&record.accepted_species_name)
                    .push_bind(&record.authority)
                    .push_bind(&record.family)
                    .push_bind(record.verification_status)
                    .push_bind(&record.verified_by)
                    .push_bind(record.count_inside)
                    .push_bind(record.count_outside)
                    .push_bind(&record.latitude_full)
                    .push_bind(&record.longitude_full)
                    .push_bind(record.latitude)
                    .push_bind(record.longitude)
                    .push_bind(&record.record_status)
                    .push_bind(&record.record_substatus)
                    .push_bind(&record.comments)
                    .push_bind(&record.occurrence_comment);
            });

            query_builder.push(&conflict_clause);

            let result = query_builder.build().execute(&self.db).await?;
            inserted += result.rows_affected();
        }

        info!(
            table = EBMS_TABLE,
            batch = records.len(),
            inserted,
            skipped = records.len() as u64 - inserted,
            "Stored occurrence batch"
        );

        Ok(inserted)
    }

    /// Get database connection pool
    pub fn db(&self) -> &PgPool {
        &self.db
    }
}

// ============================================================================
// Tests
// ============================================================================
