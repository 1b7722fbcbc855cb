//! Upstream API client subsystem.
//!
//! # Responsibilities
//! - Authenticated HTTP access to the newsfilter API (api.rs)
//! - Classified failure taxonomy for the orchestrator (error.rs)

pub mod api;
pub mod error;

pub use api::{classify_status, ApiClient, ArticleQuery, AttemptOutcome};
pub use error::ApiError;
