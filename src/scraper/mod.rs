//! Scraper orchestration.
//!
//! # Responsibilities
//! - Compose the execution lock, quota tracker, API client, and store
//! - Drive the fetch loop: one quota usage per API call, stop on a short
//!   page, the page cap, or a closed quota gate
//! - Produce the run report and statistics
//!
//! The three guard components never call each other; all composition
//! happens here. Nothing in this module terminates the process — the
//! binary maps the report to an exit code.

pub mod stats;

use thiserror::Error;

use crate::client::{ApiClient, ApiError, ArticleQuery};
use crate::config::{FetchConfig, ScraperConfig};
use crate::lock::ExecutionLock;
use crate::quota::QuotaTracker;
use crate::scraper::stats::{RunStats, StatsHistory};
use crate::storage::{ArticleStore, JsonFileStore, StoreError};

/// Failures the orchestrator cannot resolve itself.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("lock error: {0}")]
    Lock(#[from] std::io::Error),
}

/// Why a run ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Fetch loop ran to completion.
    Completed,
    /// Another live instance holds the execution lock.
    SkippedLockHeld,
    /// The daily quota was already exhausted at startup.
    SkippedQuotaExhausted,
    /// A classified error stopped the run.
    Failed,
}

/// Result of one scraper run.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: RunStats,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

/// The batch job: fetch articles from the upstream API and persist them,
/// guarded against duplicate execution, quota exhaustion, and transient
/// faults.
pub struct Scraper {
    lock: ExecutionLock,
    quota: QuotaTracker,
    client: ApiClient,
    store: JsonFileStore,
    fetch: FetchConfig,
    history: StatsHistory,
}

impl Scraper {
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        let client = ApiClient::new(config.api)?;
        let store = JsonFileStore::open(&config.storage.articles_file)?;
        Ok(Self {
            lock: ExecutionLock::new(config.lock),
            quota: QuotaTracker::new(config.quota),
            client,
            store,
            history: StatsHistory::new(&config.fetch.stats_file),
            fetch: config.fetch,
        })
    }

    /// Execute one run. The lock guard releases on every exit path,
    /// including early returns and panics unwinding through this frame.
    pub async fn run(&mut self) -> RunReport {
        let mut stats = RunStats::begin();
        tracing::info!("scraper run starting");

        let Self {
            lock,
            quota,
            client,
            store,
            fetch,
            history,
        } = self;

        let outcome = match lock.guard() {
            Err(e) => {
                tracing::error!(error = %e, "could not attempt lock acquisition");
                stats.errors.push(e.to_string());
                RunOutcome::Failed
            }
            Ok(None) => {
                tracing::warn!("another scraper instance is already running");
                RunOutcome::SkippedLockHeld
            }
            Ok(Some(_guard)) => {
                if quota.can_proceed() {
                    let status = quota.current_status();
                    tracing::info!(
                        used = status.used,
                        limit = status.limit,
                        "quota check passed"
                    );
                    match fetch_and_store(client, quota, store, fetch, &mut stats).await {
                        Ok(()) => RunOutcome::Completed,
                        Err(e) => {
                            tracing::error!(error = %e, "scraper run failed");
                            stats.errors.push(e.to_string());
                            RunOutcome::Failed
                        }
                    }
                } else {
                    let status = quota.current_status();
                    tracing::warn!(
                        used = status.used,
                        limit = status.limit,
                        next_reset = %status.next_reset,
                        "daily quota exhausted; skipping run"
                    );
                    RunOutcome::SkippedQuotaExhausted
                }
                // _guard drops here, releasing the lock.
            }
        };

        stats.finish(outcome == RunOutcome::Completed);
        log_summary(&stats, quota, outcome);
        history.append(&stats);

        RunReport { outcome, stats }
    }
}

async fn fetch_and_store(
    client: &mut ApiClient,
    quota: &mut QuotaTracker,
    store: &mut JsonFileStore,
    fetch: &FetchConfig,
    stats: &mut RunStats,
) -> Result<(), ScraperError> {
    client.authenticate().await?;

    let page_size = fetch.page_size;
    let mut offset = 0u32;
    let mut pages = 0u32;

    loop {
        if !quota.can_proceed() {
            tracing::warn!(fetched = stats.articles_fetched, "quota gate closed mid-run");
            break;
        }

        quota.record_usage();
        stats.api_calls_made += 1;

        let page = client
            .get_articles(&ArticleQuery {
                limit: page_size,
                offset,
                ..ArticleQuery::default()
            })
            .await?;
        stats.articles_fetched += page.len();

        if !page.is_empty() {
            let report = store.upsert(&page)?;
            stats.articles_stored += report.inserted;
            stats.articles_duplicate += report.duplicates;
        }

        if (page.len() as u32) < page_size {
            break;
        }

        offset += page_size;
        pages += 1;
        if fetch.max_pages > 0 && pages >= fetch.max_pages {
            tracing::info!(pages, "page cap reached");
            break;
        }
    }

    Ok(())
}

fn log_summary(stats: &RunStats, quota: &mut QuotaTracker, outcome: RunOutcome) {
    let quota_status = quota.current_status();
    tracing::info!(
        ?outcome,
        duration_secs = stats.duration_secs().unwrap_or(0),
        articles_fetched = stats.articles_fetched,
        articles_stored = stats.articles_stored,
        articles_duplicate = stats.articles_duplicate,
        api_calls = stats.api_calls_made,
        quota_used = quota_status.used,
        quota_limit = quota_status.limit,
        "scraper run finished"
    );
}
