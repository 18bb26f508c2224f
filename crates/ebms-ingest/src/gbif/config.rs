// GBIF HTTP Configuration

use serde::{Deserialize, Serialize};

use crate::gbif::{
    DEFAULT_COOLDOWN_SECS, DEFAULT_MONTH_COOLDOWN_SECS, DEFAULT_PAGE_LIMIT,
    DEFAULT_THROTTLE_BACKOFF_SECS, EBMS_DATASET_KEY, REQUESTS_PER_COOLDOWN,
};

/// Configuration for the GBIF occurrence-search client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbifConfig {
    /// Base URL of the GBIF API (e.g., "https://api.gbif.org/v1")
    pub base_url: String,

    /// Dataset to ingest occurrences from
    pub dataset_key: String,

    /// Page size for occurrence-search requests
    pub page_limit: i64,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,

    /// Pause after every `requests_per_cooldown` page requests, seconds
    pub cooldown_secs: u64,

    /// Page requests between self-throttle pauses
    pub requests_per_cooldown: u64,

    /// Backoff before the single retry after an HTTP 429, seconds
    ///
    /// This is a fixed one-retry policy matching the observed GBIF rate
    /// limit, not an exponential schedule.
    pub throttle_backoff_secs: u64,

    /// Pause between months, seconds
    pub month_cooldown_secs: u64,
}

impl Default for GbifConfig {
    fn default() -> Self {
        GbifConfig {
            base_url: "https://api.gbif.org/v1".to_string(),
            dataset_key: EBMS_DATASET_KEY.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            timeout_secs: 60,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            requests_per_cooldown: REQUESTS_PER_COOLDOWN,
            throttle_backoff_secs: DEFAULT_THROTTLE_BACKOFF_SECS,
            month_cooldown_secs: DEFAULT_MONTH_COOLDOWN_SECS,
        }
    }
}

impl GbifConfig {
    /// Create new config with builder pattern
    pub fn builder() -> GbifConfigBuilder {
        GbifConfigBuilder::default()
    }

    /// URL for the occurrence-search endpoint
    pub fn search_url(&self) -> String {
        format!("{}/occurrence/search", self.base_url)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("GBIF base URL cannot be empty".to_string());
        }

        if self.dataset_key.is_empty() {
            return Err("Dataset key cannot be empty".to_string());
        }

        if self.page_limit <= 0 {
            return Err("Page limit must be greater than 0".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.requests_per_cooldown == 0 {
            return Err("Requests per cooldown must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = GbifConfig::default();

        GbifConfig {
            base_url: std::env::var("GBIF_BASE_URL").unwrap_or(default.base_url),
            dataset_key: std::env::var("GBIF_DATASET_KEY").unwrap_or(default.dataset_key),
            page_limit: std::env::var("GBIF_PAGE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.page_limit),
            timeout_secs: std::env::var("GBIF_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.timeout_secs),
            cooldown_secs: default.cooldown_secs,
            requests_per_cooldown: default.requests_per_cooldown,
            throttle_backoff_secs: default.throttle_backoff_secs,
            month_cooldown_secs: default.month_cooldown_secs,
        }
    }

    /// Configuration for tests: zeroed cool-downs and a small page size
    pub fn test_config(base_url: impl Into<String>) -> Self {
        GbifConfig {
            base_url: base_url.into(),
            dataset_key: EBMS_DATASET_KEY.to_string(),
            page_limit: 2,
            timeout_secs: 5,
            cooldown_secs: 0,
            requests_per_cooldown: REQUESTS_PER_COOLDOWN,
            throttle_backoff_secs: 0,
            month_cooldown_secs: 0,
        }
    }
}

/// Builder for GbifConfig
#[derive(Debug, Default)]
pub struct GbifConfigBuilder {
    base_url: Option<String>,
    dataset_key: Option<String>,
    page_limit: Option<i64>,
    timeout_secs: Option<u64>,
    cooldown_secs: Option<u64>,
    requests_per_cooldown: Option<u64>,
    throttle_backoff_secs: Option<u64>,
    month_cooldown_secs: Option<u64>,
}

impl GbifConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn dataset_key(mut self, key: impl Into<String>) -> Self {
        self.dataset_key = Some(key.into());
        self
    }

    pub fn page_limit(mut self, limit: i64) -> Self {
        self.page_limit = Some(limit);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn cooldown_secs(mut self, secs: u64) -> Self {
        self.cooldown_secs = Some(secs);
        self
    }

    pub fn requests_per_cooldown(mut self, requests: u64) -> Self {
        self.requests_per_cooldown = Some(requests);
        self
    }

    pub fn throttle_backoff_secs(mut self, secs: u64) -> Self {
        self.throttle_backoff_secs = Some(secs);
        self
    }

    pub fn month_cooldown_secs(mut self, secs: u64) -> Self {
        self.month_cooldown_secs = Some(secs);
        self
    }

    pub fn build(self) -> GbifConfig {
        let default = GbifConfig::default();

        GbifConfig {
            base_url: self.base_url.unwrap_or(default.base_url),
            dataset_key: self.dataset_key.unwrap_or(default.dataset_key),
            page_limit: self.page_limit.unwrap_or(default.page_limit),
            timeout_secs: self.timeout_secs.unwrap_or(default.timeout_secs),
            cooldown_secs: self.cooldown_secs.unwrap_or(default.cooldown_secs),
            requests_per_cooldown: self
                .requests_per_cooldown
                .unwrap_or(default.requests_per_cooldown),
            throttle_backoff_secs: self
                .throttle_backoff_secs
                .unwrap_or(default.throttle_backoff_secs),
            month_cooldown_secs: self
                .month_cooldown_secs
                .unwrap_or(default.month_cooldown_secs),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
