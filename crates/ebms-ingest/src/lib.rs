//! EBMS Ingest Library
//!
//! Loads butterfly-monitoring occurrence records into PostgreSQL from two
//! sources:
//!
//! - **GBIF**: the paginated occurrence-search API (rate-limited, retried)
//! - **eBMS CSV**: a local tabular export with legacy field encodings
//!
//! Repeated runs are safe: each destination table carries a natural-key
//! conflict policy and duplicate rows are skipped at write time.
//!
//! # Example
//!
//! ```no_run
//! use ebms_ingest::db::DbConfig;
//! use ebms_ingest::gbif::{GbifConfig, GbifPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = DbConfig::from_env().connect().await?;
//!     let pipeline = GbifPipeline::new(GbifConfig::from_env(), pool);
//!     let stats = pipeline.run(2023, Some(5)).await?;
//!     println!("inserted {} records", stats.inserted);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod ebms;
pub mod gbif;
pub mod normalize;
