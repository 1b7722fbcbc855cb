//! Persisted daily request quota.
//!
//! # Responsibilities
//! - Enforce "at most N API calls per rolling day", surviving restarts
//! - Reset lazily when an access crosses the anchored day boundary
//! - Report usage for logging and the management CLI
//!
//! # Design Decisions
//! - The window is anchored at a configurable UTC hour; the anchor stored
//!   in the state file is the start of the current window
//! - Reset is evaluated on every access instead of by a timer, so no
//!   background scheduling exists; every accessor runs the check first
//! - `record_usage` increments unconditionally: recording is a fact, the
//!   gate is `can_proceed`, and the orchestrator calls them separately
//! - Persistence failures are logged, never propagated; quota state is not
//!   worth failing a run over
//! - One writer process per tracking file; the read-modify-write cycle is
//!   not safe under concurrent writers, the execution lock provides that

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::QuotaConfig;

/// Persisted quota state. Rewritten in full on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaState {
    /// Requests consumed in the current window.
    pub used_count: u32,

    /// Start of the current window, RFC 3339 UTC.
    pub last_reset: DateTime<Utc>,

    /// Limit at the time of writing. Stored for audit; the configured
    /// limit is authoritative on load.
    pub limit: u32,
}

/// Point-in-time usage report.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub percentage_used: f64,
    pub last_reset: DateTime<Utc>,
    pub next_reset: DateTime<Utc>,
    pub time_until_reset_secs: u64,
    pub exhausted: bool,
}

/// Most recent instant at `reset_hour:00:00` UTC at or before `now`.
pub fn current_window_start(now: DateTime<Utc>, reset_hour: u32) -> DateTime<Utc> {
    let boundary = now
        .date_naive()
        .and_hms_opt(reset_hour.min(23), 0, 0)
        .expect("hour of day in range")
        .and_utc();
    if now < boundary {
        boundary - Duration::days(1)
    } else {
        boundary
    }
}

/// First reset boundary strictly after `now`.
pub fn next_reset(now: DateTime<Utc>, reset_hour: u32) -> DateTime<Utc> {
    current_window_start(now, reset_hour) + Duration::days(1)
}

/// Tracks API usage against the daily quota.
pub struct QuotaTracker {
    limit: u32,
    reset_hour: u32,
    tracking_file: PathBuf,
    state: QuotaState,
}

impl QuotaTracker {
    /// Load state from the tracking file, starting fresh when the file is
    /// missing or unreadable. Never fails.
    pub fn new(config: QuotaConfig) -> Self {
        let now = Utc::now();
        let tracking_file = PathBuf::from(&config.tracking_file);

        let state = match fs::read_to_string(&tracking_file) {
            Ok(content) => match serde_json::from_str::<QuotaState>(&content) {
                Ok(mut state) => {
                    state.limit = config.max_daily_requests;
                    state
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %tracking_file.display(),
                        "corrupt quota state; starting fresh"
                    );
                    Self::fresh_state(now, config.max_daily_requests, config.reset_hour)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::fresh_state(now, config.max_daily_requests, config.reset_hour)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %tracking_file.display(),
                    "could not read quota state; starting fresh"
                );
                Self::fresh_state(now, config.max_daily_requests, config.reset_hour)
            }
        };

        let mut tracker = Self {
            limit: config.max_daily_requests,
            reset_hour: config.reset_hour,
            tracking_file,
            state,
        };
        tracker.maybe_reset_at(now);
        tracker.persist();
        tracker
    }

    fn fresh_state(now: DateTime<Utc>, limit: u32, reset_hour: u32) -> QuotaState {
        QuotaState {
            used_count: 0,
            last_reset: current_window_start(now, reset_hour),
            limit,
        }
    }

    /// True iff another request fits in the current window.
    pub fn can_proceed(&mut self) -> bool {
        self.can_proceed_at(Utc::now())
    }

    fn can_proceed_at(&mut self, now: DateTime<Utc>) -> bool {
        self.maybe_reset_at(now);
        self.state.used_count < self.limit
    }

    /// Record one consumed request and persist.
    ///
    /// Increments even past the limit; going over is logged, not rejected.
    pub fn record_usage(&mut self) {
        self.record_usage_at(Utc::now());
    }

    fn record_usage_at(&mut self, now: DateTime<Utc>) {
        self.maybe_reset_at(now);

        if self.state.used_count >= self.limit {
            tracing::warn!(
                used = self.state.used_count,
                limit = self.limit,
                "recording usage while already at or over the quota"
            );
        }

        self.state.used_count += 1;
        self.persist();

        tracing::debug!(
            used = self.state.used_count,
            limit = self.limit,
            "API request recorded"
        );

        if self.state.used_count == self.limit {
            tracing::warn!(
                next_reset = %next_reset(now, self.reset_hour),
                "daily quota reached"
            );
        }
    }

    /// Current usage report. Read-only apart from the implicit lazy reset.
    pub fn current_status(&mut self) -> QuotaStatus {
        self.status_at(Utc::now())
    }

    fn status_at(&mut self, now: DateTime<Utc>) -> QuotaStatus {
        self.maybe_reset_at(now);

        let next = next_reset(now, self.reset_hour);
        let until = (next - now).to_std().unwrap_or_default();
        QuotaStatus {
            used: self.state.used_count,
            limit: self.limit,
            remaining: self.limit.saturating_sub(self.state.used_count),
            percentage_used: f64::from(self.state.used_count) / f64::from(self.limit.max(1))
                * 100.0,
            last_reset: self.state.last_reset,
            next_reset: next,
            time_until_reset_secs: until.as_secs(),
            exhausted: self.state.used_count >= self.limit,
        }
    }

    /// Zero the counter and re-anchor at now.
    pub fn force_reset(&mut self) {
        let previous = self.state.used_count;
        self.state.used_count = 0;
        self.state.last_reset = Utc::now();
        self.persist();
        tracing::warn!(
            previous_used = previous,
            limit = self.limit,
            "quota counter force reset"
        );
    }

    fn maybe_reset_at(&mut self, now: DateTime<Utc>) {
        let window_start = current_window_start(now, self.reset_hour);
        if window_start > self.state.last_reset {
            let previous = self.state.used_count;
            self.state.used_count = 0;
            self.state.last_reset = window_start;
            self.persist();
            tracing::info!(
                previous_used = previous,
                limit = self.limit,
                window_start = %window_start,
                "quota window reset"
            );
        }
    }

    fn persist(&self) {
        let mut to_write = self.state.clone();
        to_write.limit = self.limit;

        if let Some(parent) = self.tracking_file.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::error!(error = %e, "could not create quota state directory");
                    return;
                }
            }
        }

        match serde_json::to_string_pretty(&to_write) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.tracking_file, json) {
                    tracing::error!(
                        error = %e,
                        path = %self.tracking_file.display(),
                        "could not save quota state"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "could not serialize quota state"),
        }
    }
}
