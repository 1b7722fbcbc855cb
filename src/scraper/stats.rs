//! Run statistics collection and history.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters for a single scraper run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub success: bool,

    pub articles_fetched: usize,
    pub articles_stored: usize,
    pub articles_duplicate: usize,

    pub api_calls_made: u32,

    #[serde(default)]
    pub errors: Vec<String>,
}

impl RunStats {
    pub fn begin() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            success: false,
            articles_fetched: 0,
            articles_stored: 0,
            articles_duplicate: 0,
            api_calls_made: 0,
            errors: Vec::new(),
        }
    }

    pub fn finish(&mut self, success: bool) {
        self.finished_at = Some(Utc::now());
        self.success = success;
    }

    /// Wall-clock duration of the run, in seconds, once finished.
    pub fn duration_secs(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_seconds())
    }
}

/// Append-only history of run statistics, one JSON array per file.
pub struct StatsHistory {
    path: PathBuf,
}

impl StatsHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append a run record. History that fails to load starts empty; a
    /// failed write is logged and dropped, never fatal.
    pub fn append(&self, stats: &RunStats) {
        let mut history = self.load();
        history.push(stats.clone());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "could not create stats directory");
                    return;
                }
            }
        }

        match serde_json::to_string_pretty(&history) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    tracing::warn!(error = %e, path = %self.path.display(), "could not save run stats");
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not serialize run stats"),
        }
    }

    pub fn load(&self) -> Vec<RunStats> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(history) => history,
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt stats history; starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }
}
