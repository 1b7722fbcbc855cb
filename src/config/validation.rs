//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, reset hour 0-23, quota bounds)
//! - Check the API surface is usable (http(s) base URL, non-empty key)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ScraperConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ScraperConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "quota.reset_hour").
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &ScraperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://") {
        errors.push(err("api.base_url", "must start with http:// or https://"));
    } else if url::Url::parse(&config.api.base_url).is_err() {
        errors.push(err("api.base_url", "is not a valid URL"));
    }

    if config.api.api_key.is_empty() {
        errors.push(err("api.api_key", "must not be empty"));
    }

    if config.api.timeout_secs == 0 {
        errors.push(err("api.timeout_secs", "must be greater than 0"));
    }

    if !(config.api.retry_backoff_secs > 0.0) {
        errors.push(err("api.retry_backoff_secs", "must be greater than 0"));
    }

    if config.lock.path.is_empty() {
        errors.push(err("lock.path", "must not be empty"));
    }

    if config.lock.poll_interval_secs == 0 {
        errors.push(err("lock.poll_interval_secs", "must be greater than 0"));
    }

    if !(1..=1000).contains(&config.quota.max_daily_requests) {
        errors.push(err("quota.max_daily_requests", "must be between 1 and 1000"));
    }

    if config.quota.reset_hour > 23 {
        errors.push(err("quota.reset_hour", "must be between 0 and 23"));
    }

    if config.quota.tracking_file.is_empty() {
        errors.push(err("quota.tracking_file", "must not be empty"));
    }

    if config.fetch.page_size == 0 {
        errors.push(err("fetch.page_size", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
