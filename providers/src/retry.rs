//! HTTP retry policy with exponential backoff.
//!
//! # Retry Policy
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 250ms, doubling per attempt
//! - Max delay: 4 seconds
//! - Jitter: down-jitter up to 25% (multiplier in [0.75, 1.0])
//!
//! # Retryable Conditions
//!
//! - HTTP 408, 429, 5xx
//! - Connect failures and timeouts
//!
//! A valid `Retry-After` header (0 < delay < 60s) replaces the computed backoff.
//! Every attempt carries `X-Retry-Count` (0 for the first request).

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};

pub const RETRY_COUNT_HEADER: &str = "X-Retry-Count";

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Fraction the backoff may be shortened by at random.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    /// Jittered exponential backoff for the retry after `attempt` failures.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(30) as i32;
        let ceiling = self.max_delay.as_secs_f64();
        let delay = (self.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent)).min(ceiling);
        let jitter = 1.0 - rand::random::<f64>() * self.jitter_factor.clamp(0.0, 1.0);
        Duration::from_secs_f64(delay * jitter)
    }

    /// Server-requested delay when present, computed backoff otherwise.
    #[must_use]
    pub fn delay_before_retry(&self, attempt: u32, headers: Option<&HeaderMap>) -> Duration {
        headers
            .and_then(parse_retry_after)
            .unwrap_or_else(|| self.backoff(attempt))
    }
}

/// `Retry-After` in whole seconds. HTTP-date values are ignored.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let delay = Duration::from_secs(raw.trim().parse().ok()?);
    (!delay.is_zero() && delay < MAX_RETRY_AFTER).then_some(delay)
}

#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

/// How a retried request ended.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Non-2xx response that was not retryable or came on the last attempt.
    HttpError(Response),
    /// No response at all. `attempts` counts every request sent.
    Transport {
        attempts: u32,
        source: reqwest::Error,
    },
}

/// Send the request built by `build_request`, retrying per `config`.
///
/// The builder runs once per attempt so each attempt gets its own
/// `X-Retry-Count` header.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        let request = build_request().header(RETRY_COUNT_HEADER, attempt.to_string());
        let retries_left = attempt < config.max_retries;

        let delay = match request.send().await {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                let status = response.status();
                if !retries_left || !should_retry(status) {
                    return RetryOutcome::HttpError(response);
                }
                let delay = config.delay_before_retry(attempt, Some(response.headers()));
                tracing::debug!(%status, attempt, ?delay, "Retrying after error status");
                delay
            }
            Err(source) => {
                if !retries_left || !is_transient(&source) {
                    return RetryOutcome::Transport {
                        attempts: attempt + 1,
                        source,
                    };
                }
                let delay = config.delay_before_retry(attempt, None);
                tracing::debug!(error = %source, attempt, ?delay, "Retrying after transport error");
                delay
            }
        };

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
