//! EBMS Ingest - Occurrence ingestion tool

use anyhow::Result;
use clap::Parser;
use ebms_common::logging::{init_logging, LogConfig, LogLevel};
use ebms_ingest::db::DbConfig;
use ebms_ingest::ebms;
use ebms_ingest::gbif::{GbifConfig, GbifPipeline, OccurrenceStorage};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ebms-ingest")]
#[command(author, version, about = "EBMS occurrence ingestion tool")]
struct Cli {
    /// Data source to ingest
    #[command(subcommand)]
    source: Source,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Source {
    /// Ingest occurrences from the GBIF API
    Gbif {
        /// Year to ingest
        #[arg(short, long)]
        year: i32,

        /// Month to ingest (1-12); the whole year when omitted
        #[arg(short, long)]
        month: Option<u32>,

        /// GBIF dataset key (defaults to the eBMS dataset)
        #[arg(short, long)]
        dataset_key: Option<String>,
    },

    /// Ingest a local eBMS CSV export
    File {
        /// Path to the CSV export
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Environment settings first; --verbose then raises the level
    let log_config = apply_verbosity(LogConfig::from_env()?, cli.verbose);
    init_logging(&log_config)?;

    let pool = DbConfig::from_env().connect().await?;

    match cli.source {
        Source::Gbif {
            year,
            month,
            dataset_key,
        } => {
            info!(year, month, "Ingesting GBIF occurrences");

            let mut config = GbifConfig::from_env();
            if let Some(key) = dataset_key {
                config.dataset_key = key;
            }

            let pipeline = GbifPipeline::new(config, pool);
            let stats = pipeline.run(year, month).await?;

            info!(
                inserted = stats.inserted,
                skipped = stats.skipped,
                months = stats.months,
                "GBIF ingestion complete"
            );
        },
        Source::File { path } => {
            info!(path = %path, "Ingesting local eBMS export");

            let records = ebms::load_occurrences(std::path::Path::new(&path))?;
            let storage = OccurrenceStorage::new(pool);
            let inserted = storage.insert_ebms_occurrences(&records).await?;

            info!(
                records = records.len(),
                inserted,
                skipped = records.len() as u64 - inserted,
                "File ingestion complete"
            );
        },
    }

    Ok(())
}

/// Raise the log level to debug when `--verbose` is given; format and
/// filter settings from the environment are kept as-is.
fn apply_verbosity(mut config: LogConfig, verbose: bool) -> LogConfig {
    if verbose {
        config.level = LogLevel::Debug;
    }
    config
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level_to_debug() {
        let config = apply_verbosity(LogConfig::default(), true);
        assert_eq!(config.level, LogLevel::Debug);
    }

    #[test]
    fn test_level_unchanged_without_verbose() {
        let config = apply_verbosity(LogConfig::default(), false);
        assert_eq!(config.level, LogLevel::Info);
    }
}
