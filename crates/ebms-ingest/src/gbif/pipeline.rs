// GBIF Ingestion Pipeline Orchestration
//
// Sequences fetch -> assemble -> upsert across a year/month range. Months
// run strictly sequentially with a cool-down between them; a fatal failure
// aborts the remaining months while already-upserted months stay committed.

use std::time::Duration;

use sqlx::PgPool;
use tracing::info;

use crate::gbif::assembler::assemble;
use crate::gbif::client::GbifClient;
use crate::gbif::storage::OccurrenceStorage;
use crate::gbif::{GbifConfig, GbifError, Result};

/// Pipeline phase, reported in progress logs and failure context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Fetch,
    Assemble,
    Upsert,
}

impl std::fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestPhase::Fetch => write!(f, "fetch"),
            IngestPhase::Assemble => write!(f, "assemble"),
            IngestPhase::Upsert => write!(f, "upsert"),
        }
    }
}

/// Aggregate counts for one ingestion run
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    /// Raw records returned by the API
    pub fetched: usize,
    /// Records surviving assembly
    pub assembled: usize,
    /// Rows actually written
    pub inserted: u64,
    /// Rows skipped as natural-key duplicates
    pub skipped: u64,
    /// Months completed
    pub months: u32,
}

/// GBIF occurrence ingestion pipeline
pub struct GbifPipeline {
    config: GbifConfig,
    db: PgPool,
}

impl GbifPipeline {
    /// Create new pipeline
    pub fn new(config: GbifConfig, db: PgPool) -> Self {
        Self { config, db }
    }

    /// Ingest one month, or January through December when `month` is None.
    ///
    /// The range is validated before any network activity. Months execute
    /// strictly sequentially; the aggregate stats cover the whole run, and a
    /// failure carries the month and phase it happened in.
    pub async fn run(&self, year: i32, month: Option<u32>) -> Result<IngestStats> {
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                return Err(GbifError::InvalidRange(format!(
                    "month must be between 1 and 12, got {}",
                    m
                )));
            }
        }

        let client = GbifClient::new(self.config.clone())?;
        let storage = OccurrenceStorage::new(self.db.clone());

        let start_month = month.unwrap_or(1);
        let end_month = month.unwrap_or(12);
        let mut stats = IngestStats::default();

        for current in start_month..=end_month {
            self.ingest_month(&client, &storage, year, current, &mut stats)
                .await
                .map_err(|source| GbifError::Month {
                    year,
                    month: current,
                    phase: phase_of(&source),
                    source: Box::new(source),
                })?;

            stats.months += 1;

            if current < end_month {
                info!(
                    secs = self.config.month_cooldown_secs,
                    "Sleeping between months to ease rate limiter"
                );
                tokio::time::sleep(Duration::from_secs(self.config.month_cooldown_secs)).await;
            }
        }

        info!(
            year,
            months = stats.months,
            fetched = stats.fetched,
            inserted = stats.inserted,
            skipped = stats.skipped,
            "Ingestion run complete"
        );

        Ok(stats)
    }

    async fn ingest_month(
        &self,
        client: &GbifClient,
        storage: &OccurrenceStorage,
        year: i32,
        month: u32,
        stats: &mut IngestStats,
    ) -> Result<()> {
        info!(year, month, phase = %IngestPhase::Fetch, "Fetching occurrences");
        let raw_records = client.fetch_month(year, month).await?;
        stats.fetched += raw_records.len();

        info!(
            year,
            month,
            phase = %IngestPhase::Assemble,
            raw = raw_records.len(),
            "Assembling records"
        );
        let records = assemble(&raw_records);
        stats.assembled += records.len();

        info!(
            year,
            month,
            phase = %IngestPhase::Upsert,
            batch = records.len(),
            "Upserting batch"
        );
        let inserted = storage.insert_gbif_occurrences(&records).await?;
        stats.inserted += inserted;
        stats.skipped += records.len() as u64 - inserted;

        Ok(())
    }

    /// Get pipeline configuration
    pub fn config(&self) -> &GbifConfig {
        &self.config
    }
}

/// Phase a failure belongs to, derived from its error kind
fn phase_of(error: &GbifError) -> IngestPhase {
    match error {
        GbifError::Database(_) => IngestPhase::Upsert,
        _ => IngestPhase::Fetch,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgresql://localhost/test").unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_creation() {
        let pipeline = GbifPipeline::new(GbifConfig::default(), lazy_pool());
        assert_eq!(pipeline.config().page_limit, 300);
    }

    #[tokio::test]
    async fn test_month_out_of_range_rejected_before_network() {
        let pipeline = GbifPipeline::new(GbifConfig::default(), lazy_pool());

        let result = pipeline.run(2023, Some(13)).await;
        assert!(matches!(result, Err(GbifError::InvalidRange(_))));

        let result = pipeline.run(2023, Some(0)).await;
        assert!(matches!(result, Err(GbifError::InvalidRange(_))));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(IngestPhase::Fetch.to_string(), "fetch");
        assert_eq!(IngestPhase::Assemble.to_string(), "assemble");
        assert_eq!(IngestPhase::Upsert.to_string(), "upsert");
    }
}
