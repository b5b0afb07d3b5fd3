//! Search-augmented generation backend with exponential backoff.
//!
//! - [`AskAsync`]: core trait for sending one chat request
//! - [`PerplexityClient`]: chat-completions client for the Sonar models
//! - [`RetryAsk`]: decorator that retries transient failures
//!
//! Only transport errors, rate limiting and server errors are retried. A
//! response that arrives but does not match the article schema is the
//! caller's concern and is never retried here.

use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::error::{NewsError, Result};
use crate::utils::truncate_for_log;

/// Trait for sending one request to the generation backend.
pub trait AskAsync {
    /// The type of response returned by the backend.
    type Response;

    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Geo hint passed to the search step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserLocation {
    pub country: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebSearchOptions {
    pub user_location: UserLocation,
}

/// A chat-completion request with search constraints and a structured-output
/// schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Only these domains are searched.
    pub search_domain_filter: Vec<String>,
    /// Earliest publish date, `M/D/YYYY`.
    pub search_after_date_filter: String,
    pub web_search_options: WebSearchOptions,
    pub response_format: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions client for the search-augmented backend.
#[derive(Clone)]
pub struct PerplexityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PerplexityClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for PerplexityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerplexityClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AskAsync for PerplexityClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %request.model))]
    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response> {
        let t0 = Instant::now();
        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis() as u128,
                status = status.as_u16(),
                body = %truncate_for_log(&body, 300),
                "API call failed"
            );
            return Err(NewsError::Request {
                status: status.as_u16(),
                message: truncate_for_log(&body, 300),
            });
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            if e.is_decode() {
                NewsError::SchemaValidation(format!("malformed completion envelope: {e}"))
            } else {
                NewsError::from(e)
            }
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| NewsError::SchemaValidation("response contained no message content".into()))
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`]
/// implementation.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(request).await {
                Ok(resp) => {
                    if attempt > 0 {
                        info!(
                            attempts = attempt + 1,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                            "ask() succeeded after retry"
                        );
                    }
                    return Ok(resp);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
