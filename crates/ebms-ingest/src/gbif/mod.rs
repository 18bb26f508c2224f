// GBIF Occurrence Ingestion Module
//
// Handles ingestion of eBMS occurrence records published through the GBIF
// occurrence-search API (https://api.gbif.org/v1/occurrence/search).
//
// Pipeline stages:
// - Fetch: paginated retrieval with self-throttling and a single retry on 429
// - Assemble: raw JSON records -> typed occurrence rows
// - Store: chunked batch inserts with per-table conflict policies

pub mod assembler;
pub mod client;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod storage;

// Re-export main types
pub use assembler::assemble;
pub use client::GbifClient;
pub use config::GbifConfig;
pub use models::{FetchCursor, GbifOccurrence, RawOccurrence, RawPage};
pub use pipeline::{GbifPipeline, IngestPhase, IngestStats};
pub use storage::{ConflictPolicy, OccurrenceStorage};

/// eBMS dataset key on GBIF
pub const EBMS_DATASET_KEY: &str = "59161187-c444-48cd-9efc-c286e10d034e";

/// Page size for occurrence-search requests
pub const DEFAULT_PAGE_LIMIT: i64 = 300;

/// Self-throttle: pause after every this many page requests
pub const REQUESTS_PER_COOLDOWN: u64 = 10;

/// Self-throttle pause between request bursts, seconds
pub const DEFAULT_COOLDOWN_SECS: u64 = 5;

/// Backoff before the single retry after an HTTP 429, seconds
pub const DEFAULT_THROTTLE_BACKOFF_SECS: u64 = 30;

/// Pause between months, seconds
pub const DEFAULT_MONTH_COOLDOWN_SECS: u64 = 5;

/// Insert chunk size for batch upserts
pub const DEFAULT_OCCURRENCE_CHUNK_SIZE: usize = 500;

/// Result type for GBIF operations
pub type Result<T> = std::result::Result<T, GbifError>;

/// Error types for GBIF ingestion
#[derive(Debug, thiserror::Error)]
pub enum GbifError {
    #[error("Rate limited by GBIF after retry (offset {offset})")]
    RateLimited { offset: i64 },

    #[error("HTTP error from GBIF: {status}")]
    Http { status: reqwest::StatusCode },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Ingestion failed for {year}-{month:02} during {phase}: {source}")]
    Month {
        year: i32,
        month: u32,
        phase: IngestPhase,
        #[source]
        source: Box<GbifError>,
    },
}
