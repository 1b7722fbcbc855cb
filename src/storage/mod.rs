//! Article persistence boundary.
//!
//! # Responsibilities
//! - Domain types matching the upstream JSON (camelCase field names)
//! - The [`ArticleStore`] seam the orchestrator writes through
//! - A JSON-file store implementation with id-based dedup
//!
//! The relational schema and engine live behind the trait; this crate only
//! specifies the boundary and ships a file-backed implementation.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A news source as referenced by articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub name: String,
}

/// One article as delivered by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub source_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: SourceRef,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
}

/// Errors from the article store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data error: {0}")]
    Data(#[from] serde_json::Error),
}

/// Outcome of one upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreReport {
    /// Articles not previously present.
    pub inserted: usize,
    /// Articles skipped because their id already existed.
    pub duplicates: usize,
}

/// Write-side boundary for article persistence.
pub trait ArticleStore {
    /// Insert the given articles, skipping ids already present.
    fn upsert(&mut self, articles: &[Article]) -> Result<StoreReport, StoreError>;

    /// Number of articles currently stored.
    fn count(&self) -> usize;
}

/// JSON-file store: the whole article map is loaded on open and rewritten
/// in full after every upsert batch.
pub struct JsonFileStore {
    path: PathBuf,
    articles: BTreeMap<String, Article>,
}

impl JsonFileStore {
    /// Open the store, loading existing articles. A missing file is an
    /// empty store; an unreadable file is an error, never silently wiped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let articles = if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let map: BTreeMap<String, Article> = serde_json::from_reader(reader)?;
            tracing::info!(count = map.len(), path = %path.display(), "loaded article store");
            map
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, articles })
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.articles)?;
        Ok(())
    }
}

impl ArticleStore for JsonFileStore {
    fn upsert(&mut self, articles: &[Article]) -> Result<StoreReport, StoreError> {
        let mut report = StoreReport::default();
        for article in articles {
            if self.articles.contains_key(&article.id) {
                report.duplicates += 1;
                tracing::debug!(id = %article.id, "article already stored; skipping");
            } else {
                self.articles.insert(article.id.clone(), article.clone());
                report.inserted += 1;
            }
        }
        if report.inserted > 0 {
            self.save()?;
        }
        Ok(report)
    }

    fn count(&self) -> usize {
        self.articles.len()
    }
}
