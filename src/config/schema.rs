//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the scraper.
//! All types derive Serde traits for deserialization from config files.
//!
//! Every component takes its own section by value in its constructor; there
//! is no process-wide settings singleton, so tests can construct components
//! in isolation.

use serde::{Deserialize, Serialize};

/// Root configuration for the scraper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ScraperConfig {
    /// Upstream API settings (base URL, key, timeouts, retries).
    pub api: ApiConfig,

    /// Cross-process execution lock settings.
    pub lock: LockConfig,

    /// Daily request quota settings.
    pub quota: QuotaConfig,

    /// Fetch loop settings (pagination, stats output).
    pub fetch: FetchConfig,

    /// Article persistence settings.
    pub storage: StorageConfig,
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the API (e.g., "https://api.newsfilter.io").
    pub base_url: String,

    /// Bearer token sent in the `Authorization` header.
    pub api_key: String,

    /// Per-attempt request timeout in seconds.
    pub timeout_secs: u64,

    /// Number of retry attempts for transient failures
    /// (total attempts = retry_attempts + 1).
    pub retry_attempts: u32,

    /// Backoff base multiplier in seconds; attempt n sleeps base * 2^n.
    pub retry_backoff_secs: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.newsfilter.io".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            retry_attempts: 3,
            retry_backoff_secs: 1.0,
        }
    }
}

/// Execution lock configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LockConfig {
    /// Path to the lock marker file.
    pub path: String,

    /// Maximum time to wait for the lock in blocking mode (seconds).
    pub timeout_secs: u64,

    /// Poll interval between acquisition attempts in blocking mode (seconds).
    pub poll_interval_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            path: "/tmp/newsfilter_scraper.lock".to_string(),
            timeout_secs: 300,
            poll_interval_secs: 5,
        }
    }
}

/// Daily request quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Maximum API requests per rolling day.
    pub max_daily_requests: u32,

    /// Path to the persisted quota state file.
    pub tracking_file: String,

    /// UTC hour of day (0-23) at which the window resets.
    pub reset_hour: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_daily_requests: 100,
            tracking_file: "data/rate_limit.json".to_string(),
            reset_hour: 0,
        }
    }
}

/// Fetch loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Articles requested per API call.
    pub page_size: u32,

    /// Upper bound on pages fetched in one run (0 = no bound; the loop stops
    /// on a short page or when the quota gate closes).
    pub max_pages: u32,

    /// Path to the run-statistics history file.
    pub stats_file: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 0,
            stats_file: "data/scraper_stats.json".to_string(),
        }
    }
}

/// Article persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the article store file.
    pub articles_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            articles_file: "data/articles.json".to_string(),
        }
    }
}
