//! Newsfilter scraper library.
//!
//! A cron-driven batch job that fetches articles from the newsfilter API
//! and persists them, guarded by three independent, composable components:
//!
//! - [`lock::ExecutionLock`] — cross-process mutual exclusion via a
//!   filesystem marker, with stale-lock reclamation
//! - [`quota::QuotaTracker`] — persisted rolling-day request quota
//! - [`client::ApiClient`] — HTTP executor with bearer auth, bounded
//!   retries, and a classified failure taxonomy
//!
//! The components never call each other; [`scraper::Scraper`] composes
//! them. Each is usable standalone.

// Core guard components
pub mod client;
pub mod lock;
pub mod quota;
pub mod resilience;

// Orchestration and boundaries
pub mod config;
pub mod scraper;
pub mod storage;

pub use config::ScraperConfig;
pub use scraper::{RunOutcome, Scraper};
