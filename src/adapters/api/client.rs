//! HTTP API Client - Rate-limited REST Client
//!
//! Wraps reqwest with a request-rate limiter, a concurrency cap and
//! exponential-backoff retries on 429 and 5xx. Shared by the pricing
//! API and the balance index adapters.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::ApiConfig;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
  /// Base URL, without trailing slash.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Sustained requests per second.
  pub requests_per_second: u32,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for ApiClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.palomadex.com".to_string(),
      timeout: Duration::from_secs(30),
      max_concurrent: 10,
      requests_per_second: 10,
      max_retries: 3,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

impl ApiClientConfig {
  /// Client settings for a given base URL, taking limits from `[api]`.
  pub fn from_api(api: &ApiConfig, base_url: &str) -> Self {
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      timeout: Duration::from_millis(api.timeout_ms),
      max_concurrent: api.max_concurrent,
      requests_per_second: api.requests_per_second,
      max_retries: api.max_retries,
      retry_base_delay: Duration::from_millis(api.retry_base_delay_ms),
    }
  }
}

/// Failure of a request after retries.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// Non-retryable status from the server (4xx other than 429).
  #[error("API error {status}: {body}")]
  Status { status: StatusCode, body: String },
  /// Retries exhausted on transport errors, 429 or 5xx.
  #[error("request failed after retries: {0}")]
  Exhausted(String),
  /// Body could not be decoded.
  #[error("undecodable response: {0}")]
  Decode(String),
}

/// Rate-limited HTTP client.
pub struct ApiClient {
  /// Underlying HTTP client.
  http: Client,
  config: ApiClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
  /// Request-rate limiter.
  limiter: DefaultDirectRateLimiter,
}

impl ApiClient {
  pub fn new(config: ApiClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let rate = NonZeroU32::new(config.requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_second(rate));
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

    Ok(Self {
      http,
      config,
      semaphore,
      limiter,
    })
  }

  pub fn base_url(&self) -> &str {
    &self.config.base_url
  }

  /// GET `path` (with query) and decode the JSON body.
  pub async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, ApiError> {
    let response = self.get(path_and_query).await?;
    response
      .json::<T>()
      .await
      .map_err(|e| ApiError::Decode(e.to_string()))
  }

  /// GET with rate limiting and retries.
  pub async fn get(&self, path_and_query: &str) -> Result<Response, ApiError> {
    let url = format!("{}{}", self.config.base_url, path_and_query);

    let _permit = self
      .semaphore
      .acquire()
      .await
      .map_err(|_| ApiError::Exhausted("client shut down".to_string()))?;

    let mut last_error = String::from("no attempt made");

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }

      self.limiter.until_ready().await;

      match self.http.get(&url).send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(path = path_and_query, "Rate limited, backing off");
            last_error = "rate limited".to_string();
          }
          status if status.is_server_error() => {
            warn!(status = %status, path = path_and_query, "Server error, retrying");
            last_error = format!("server error {status}");
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, "Request failed");
          last_error = e.to_string();
        }
      }
    }

    Err(ApiError::Exhausted(last_error))
  }
}
