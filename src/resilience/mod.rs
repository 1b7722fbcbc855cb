//! Resilience primitives.
//!
//! # Data Flow
//! ```text
//! Request to the upstream API:
//!     → per-attempt timeout (client)
//!     → on retryable failure: backoff.rs schedules the next attempt
//!     → on 429: Retry-After cooldown, outside the attempt budget
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline; timeouts are non-negotiable
//! - Retries are bounded by the configured attempt count; the 429 cooldown
//!   is protocol-mandated waiting, not a fault, and consumes no attempt
//! - Classification decides the policy: server/network faults retry,
//!   client faults surface immediately

pub mod backoff;

pub use backoff::backoff_delay;
