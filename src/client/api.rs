//! Upstream API client with bounded retries.
//!
//! # Responsibilities
//! - Issue authenticated requests against the newsfilter API
//! - Classify every attempt outcome and apply the retry policy
//! - Honor 429 Retry-After cooldowns without spending retry attempts
//!
//! # Design Decisions
//! - One reqwest client per `ApiClient`, built in the constructor; its
//!   connection pool lives exactly as long as the client value
//! - Attempts are numbered 0..=retry_attempts; a 429 loops at the same
//!   attempt number because the wait is protocol-mandated, not a fault
//! - Total elapsed time across the retry sequence is unbounded on the 429
//!   path; callers needing a wall-clock deadline must impose it themselves

use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::client::error::ApiError;
use crate::config::ApiConfig;
use crate::resilience::backoff_delay;
use crate::storage::{Article, SourceRef};

/// Wait applied on a 429 with no Retry-After header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Classification of a single request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx; the response is returned to the caller.
    Success,
    /// 5xx; retryable on the exponential schedule.
    RetryableServer,
    /// Transport failure or timeout; retryable on the same schedule.
    RetryableNetwork,
    /// 429; wait out the cooldown and retry at the same attempt number.
    RateLimited,
    /// Any other 4xx; surfaced immediately, never retried.
    FatalClient,
}

/// Map an HTTP status to its retry classification.
pub fn classify_status(status: StatusCode) -> AttemptOutcome {
    if status.is_success() {
        AttemptOutcome::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        AttemptOutcome::RateLimited
    } else if status.is_server_error() {
        AttemptOutcome::RetryableServer
    } else {
        AttemptOutcome::FatalClient
    }
}

/// Filters for an article fetch.
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub limit: u32,
    pub offset: u32,
    pub symbol: Option<String>,
    pub source: Option<String>,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    sources: Vec<SourceRef>,
}

/// Client for the newsfilter API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    retry_attempts: u32,
    backoff_base: Duration,
    authenticated: bool,
}

impl ApiClient {
    /// Build a client from configuration. The underlying connection pool is
    /// created here and released when the client is dropped.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| ApiError::Setup(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("newsfilter-scraper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
            retry_attempts: config.retry_attempts,
            backoff_base: Duration::from_secs_f64(config.retry_backoff_secs.max(0.0)),
            authenticated: false,
        })
    }

    /// Probe `GET /health` with the bearer token.
    ///
    /// Must succeed before data calls; the data methods invoke it
    /// implicitly when no session has been established yet.
    pub async fn authenticate(&mut self) -> Result<(), ApiError> {
        match self
            .execute(Method::GET, "/health", &[], None, true)
            .await
        {
            Ok(_) => {
                self.authenticated = true;
                tracing::info!("API authentication successful");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "API authentication failed");
                Err(ApiError::AuthenticationFailed(e.to_string()))
            }
        }
    }

    /// Fetch one page of articles.
    pub async fn get_articles(&mut self, query: &ArticleQuery) -> Result<Vec<Article>, ApiError> {
        self.ensure_authenticated().await?;

        let mut params = vec![
            ("limit".to_string(), query.limit.to_string()),
            ("offset".to_string(), query.offset.to_string()),
        ];
        if let Some(symbol) = &query.symbol {
            params.push(("symbol".to_string(), symbol.clone()));
        }
        if let Some(source) = &query.source {
            params.push(("source".to_string(), source.clone()));
        }
        if let Some(since) = &query.since {
            params.push(("since".to_string(), since.to_rfc3339()));
        }

        let response = self
            .execute(Method::GET, "/articles", &params, None, true)
            .await?;
        let body: ArticlesResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        tracing::info!(count = body.articles.len(), offset = query.offset, "fetched articles");
        Ok(body.articles)
    }

    /// Fetch the list of available news sources.
    pub async fn get_sources(&mut self) -> Result<Vec<SourceRef>, ApiError> {
        self.ensure_authenticated().await?;

        let response = self
            .execute(Method::GET, "/sources", &[], None, true)
            .await?;
        let body: SourcesResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(body.sources)
    }

    async fn ensure_authenticated(&mut self) -> Result<(), ApiError> {
        if self.authenticated {
            return Ok(());
        }
        tracing::debug!("no established session; authenticating implicitly");
        self.authenticate().await
    }

    /// Issue a request, applying the full retry state machine.
    ///
    /// Returns the response on any 2xx; every other terminal outcome is a
    /// classified [`ApiError`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
        authenticated: bool,
    ) -> Result<Response, ApiError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        let mut attempt: u32 = 0;
        loop {
            let mut request = self.http.request(method.clone(), url.clone());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            if authenticated {
                request = request.bearer_auth(&self.api_key);
            }

            tracing::debug!(%method, path, attempt, "sending API request");

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    match classify_status(status) {
                        AttemptOutcome::Success => return Ok(response),
                        AttemptOutcome::RateLimited => {
                            let wait = retry_after(&response).unwrap_or(DEFAULT_RETRY_AFTER);
                            tracing::warn!(
                                wait_secs = wait.as_secs(),
                                "rate limited by upstream; cooling down"
                            );
                            tokio::time::sleep(wait).await;
                            // Protocol-mandated wait; the attempt slot is
                            // not consumed.
                        }
                        AttemptOutcome::RetryableServer => {
                            if attempt < self.retry_attempts {
                                let delay = backoff_delay(attempt, self.backoff_base);
                                tracing::warn!(
                                    status = status.as_u16(),
                                    delay_ms = delay.as_millis() as u64,
                                    attempt,
                                    "server error; retrying"
                                );
                                tokio::time::sleep(delay).await;
                                attempt += 1;
                            } else {
                                return Err(ApiError::ServerError {
                                    status: status.as_u16(),
                                    attempts: attempt + 1,
                                });
                            }
                        }
                        AttemptOutcome::FatalClient => {
                            let message = response.text().await.unwrap_or_default();
                            return Err(ApiError::Fatal {
                                status: status.as_u16(),
                                message,
                            });
                        }
                        // classify_status never yields this; transport
                        // failures arrive through the Err arm below.
                        AttemptOutcome::RetryableNetwork => unreachable!(),
                    }
                }
                Err(e) => {
                    if attempt < self.retry_attempts {
                        let delay = backoff_delay(attempt, self.backoff_base);
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "request failed; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else if e.is_timeout() {
                        return Err(ApiError::Timeout {
                            attempts: attempt + 1,
                        });
                    } else {
                        return Err(ApiError::NetworkError {
                            attempts: attempt + 1,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
