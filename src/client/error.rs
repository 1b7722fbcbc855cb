//! Classified errors for the upstream API client.

use thiserror::Error;

/// Errors surfaced by the API client after its own bounded retry policy
/// has run its course.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The authentication probe failed; data calls cannot proceed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Server kept failing (5xx) through every retry attempt.
    #[error("server error {status} after {attempts} attempts")]
    ServerError { status: u16, attempts: u32 },

    /// Connection or transport failure through every retry attempt.
    #[error("network error after {attempts} attempts: {message}")]
    NetworkError { attempts: u32, message: String },

    /// Request timed out on every retry attempt.
    #[error("request timeout after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// Non-retryable client failure (4xx other than 429).
    #[error("request failed with status {status}: {message}")]
    Fatal { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    InvalidResponse(String),

    /// The client itself could not be constructed or the URL is unusable.
    #[error("client setup error: {0}")]
    Setup(String),
}
