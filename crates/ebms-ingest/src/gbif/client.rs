// GBIF Occurrence-Search Client
//
// Drives paged retrieval of one (dataset, year, month) slice. The request
// stream is strictly serialized: GBIF enforces a global rate limit, so the
// client self-throttles between bursts and retries a throttled page exactly
// once before giving up.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{info, warn};

use crate::gbif::models::{FetchCursor, RawOccurrence, RawPage};
use crate::gbif::{GbifConfig, GbifError, Result};

/// HTTP client for the GBIF occurrence-search API
pub struct GbifClient {
    client: Client,
    config: GbifConfig,
}

impl GbifClient {
    /// Create new client with configuration
    pub fn new(config: GbifConfig) -> Result<Self> {
        config.validate().map_err(GbifError::Validation)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("EBMS-Analytics-Ingester/1.0")
            .build()?;

        Ok(GbifClient { client, config })
    }

    /// Fetch all occurrence records for one month of the configured dataset.
    ///
    /// A month with no records yields an empty Vec, not an error. Fails only
    /// after the single throttle retry is exhausted or on a non-throttle
    /// transport/HTTP failure; partial results are discarded by the caller.
    pub async fn fetch_month(&self, year: i32, month: u32) -> Result<Vec<RawOccurrence>> {
        let mut cursor = FetchCursor::new(self.config.page_limit);
        // Sentinel above the page size so the first page is always requested;
        // every response replaces it with the authoritative count.
        let mut total = self.config.page_limit + 1;
        let mut records = Vec::new();

        while cursor.offset < total {
            let page = self.fetch_page_with_retry(year, month, &cursor).await?;

            total = page.count;
            let page_len = page.results.len();

            info!(
                request = cursor.request_count + 1,
                offset = cursor.offset,
                total,
                page_len,
                "Fetched occurrence page"
            );

            records.extend(page.results);
            cursor.advance();

            // An empty page ends the month even if the reported total says
            // otherwise; offset strictly increases so the loop always halts.
            if page_len == 0 {
                break;
            }

            if cursor.request_count % self.config.requests_per_cooldown == 0 {
                info!(
                    secs = self.config.cooldown_secs,
                    "Sleeping between request bursts to ease rate limiter"
                );
                tokio::time::sleep(Duration::from_secs(self.config.cooldown_secs)).await;
            }
        }

        info!(
            year,
            month,
            records = records.len(),
            requests = cursor.request_count,
            "Month fetch complete"
        );

        Ok(records)
    }

    /// Fetch one page, retrying exactly once after an HTTP 429.
    ///
    /// Any other failure propagates immediately without retry.
    async fn fetch_page_with_retry(
        &self,
        year: i32,
        month: u32,
        cursor: &FetchCursor,
    ) -> Result<RawPage> {
        let response = self.request_page(year, month, cursor).await?;

        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Self::decode_page(response).await;
        }

        warn!(
            offset = cursor.offset,
            backoff_secs = self.config.throttle_backoff_secs,
            "Rate limiter hit, backing off before single retry"
        );
        tokio::time::sleep(Duration::from_secs(self.config.throttle_backoff_secs)).await;

        let retry = self.request_page(year, month, cursor).await?;
        if retry.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(GbifError::RateLimited {
                offset: cursor.offset,
            });
        }

        Self::decode_page(retry).await
    }

    /// Issue one occurrence-search request without status handling
    async fn request_page(
        &self,
        year: i32,
        month: u32,
        cursor: &FetchCursor,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(self.config.search_url())
            .query(&[
                ("datasetKey", self.config.dataset_key.as_str()),
                ("year", &year.to_string()),
                ("month", &month.to_string()),
                ("offset", &cursor.offset.to_string()),
                ("limit", &cursor.limit.to_string()),
            ])
            .send()
            .await?;

        Ok(response)
    }

    /// Decode a non-throttled response, mapping HTTP errors
    async fn decode_page(response: reqwest::Response) -> Result<RawPage> {
        let status = response.status();
        if !status.is_success() {
            return Err(GbifError::Http { status });
        }

        Ok(response.json::<RawPage>().await?)
    }

    /// Get configuration
    pub fn config(&self) -> &GbifConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================
