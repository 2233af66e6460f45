//! OANDA HTTP Client - Rate-limited v20 REST Transport
//!
//! Wraps reqwest with request pacing, bounded concurrency, retries
//! and Bearer authentication, and implements `BrokerTransport` for
//! the normalization core.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::endpoints;
use super::errors::OandaErrorClassifier;
use crate::adapters::metrics::MetricsRegistry;
use crate::domain::error::TransportError;
use crate::ports::transport::{BrokerTransport, Endpoint, ErrorClassifier, HttpMethod, Params};

/// Configuration for the OANDA HTTP client.
#[derive(Debug, Clone)]
pub struct OandaClientConfig {
  /// Base URL (live or practice host).
  pub base_url: String,
  /// Account every account-scoped path is built under.
  pub account_id: String,
  /// Personal access token.
  pub token: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
  /// Sustained request rate. The broker allows one request per ~8.34ms.
  pub requests_per_second: u32,
}

impl Default for OandaClientConfig {
  fn default() -> Self {
    Self {
      base_url: endpoints::PRACTICE_URL.to_string(),
      account_id: String::new(),
      token: String::new(),
      timeout: Duration::from_secs(30),
      max_concurrent: 10,
      max_retries: 3,
      retry_base_delay: Duration::from_millis(200),
      requests_per_second: 119,
    }
  }
}

/// Rate-limited HTTP transport for the OANDA v20 REST API.
pub struct OandaClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: OandaClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
  /// Request pacing.
  limiter: DefaultDirectRateLimiter,
  /// Error body classifier.
  classifier: OandaErrorClassifier,
  /// Request metrics.
  metrics: Option<Arc<MetricsRegistry>>,
}

impl OandaClient {
  /// Create a new OANDA client.
  pub fn new(config: OandaClientConfig) -> anyhow::Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let rate = NonZeroU32::new(config.requests_per_second)
      .context("requests_per_second must be positive")?;
    let limiter = RateLimiter::direct(Quota::per_second(rate));
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

    Ok(Self {
      http,
      config,
      semaphore,
      limiter,
      classifier: OandaErrorClassifier,
      metrics: None,
    })
  }

  /// Attach a metrics registry.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Build the request for an endpoint: query string for reads, JSON
  /// body for writes.
  fn build(&self, endpoint: &Endpoint, params: &Params) -> RequestBuilder {
    let url = format!(
      "{}{}",
      self.config.base_url,
      endpoints::path(endpoint, &self.config.account_id)
    );
    let request = match endpoint.method() {
      HttpMethod::Get => {
        let query: Vec<(&str, String)> = params
          .iter()
          .map(|(key, value)| (key.as_str(), query_value(value)))
          .collect();
        self.http.get(&url).query(&query)
      }
      HttpMethod::Post => self.http.post(&url).json(params),
      HttpMethod::Put => self.http.put(&url).json(params),
      HttpMethod::Patch => self.http.patch(&url).json(params),
    };
    request.bearer_auth(&self.config.token)
  }

  /// Execute request with pacing, concurrency limit and retries.
  async fn execute_with_retry(
    &self,
    endpoint: &Endpoint,
    request: RequestBuilder,
  ) -> Result<Value, TransportError> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .map_err(|e| TransportError::Http(format!("semaphore closed: {e}")))?;

    let label = endpoint.label();
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        if let Some(metrics) = &self.metrics {
          metrics.retries.with_label_values(&[label]).inc();
        }
        sleep(delay).await;
      }

      self.limiter.until_ready().await;

      let req = request
        .try_clone()
        .ok_or_else(|| TransportError::Http("request body is not clonable".into()))?;

      let started = Instant::now();
      let response = match req.send().await {
        Ok(response) => response,
        Err(e) => {
          warn!(error = %e, attempt, endpoint = label, "Request failed");
          self.observe(label, "network", started);
          last_error = Some(TransportError::Http(e.to_string()));
          continue;
        }
      };

      let status = response.status();
      if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        warn!(status = %status, attempt, endpoint = label, "Transient broker status, retrying");
        self.observe(label, "retry", started);
        let body = response.text().await.unwrap_or_default();
        last_error = Some(TransportError::Status {
          status: status.as_u16(),
          body,
        });
        continue;
      }

      let text = response
        .text()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;
      return self.decode(label, status, &text, started);
    }

    Err(last_error.unwrap_or_else(|| TransportError::Http("max retries exceeded".into())))
  }

  /// Turn a final response into JSON or a classified failure.
  fn decode(
    &self,
    label: &str,
    status: StatusCode,
    text: &str,
    started: Instant,
  ) -> Result<Value, TransportError> {
    let body: Option<Value> = serde_json::from_str(text).ok();

    if let Some(failure) = body.as_ref().and_then(|b| self.classifier.classify(b)) {
      self.observe(label, "exchange_error", started);
      return Err(failure.into());
    }

    if !status.is_success() {
      self.observe(label, "status", started);
      return Err(TransportError::Status {
        status: status.as_u16(),
        body: text.to_string(),
      });
    }

    self.observe(label, "ok", started);
    body.ok_or_else(|| TransportError::Decode(truncate(text, 200)))
  }

  fn observe(&self, label: &str, outcome: &str, started: Instant) {
    if let Some(metrics) = &self.metrics {
      metrics.observe_request(label, outcome, started.elapsed().as_secs_f64() * 1000.0);
    }
  }
}

#[async_trait]
impl BrokerTransport for OandaClient {
  #[instrument(skip(self, endpoint, params), fields(endpoint = endpoint.label()))]
  async fn request(&self, endpoint: Endpoint, params: &Params) -> Result<Value, TransportError> {
    let request = self.build(&endpoint, params);
    self.execute_with_retry(&endpoint, request).await
  }
}

/// Query-string rendering of a parameter value; strings go unquoted.
fn query_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn truncate(text: &str, max: usize) -> String {
  text.chars().take(max).collect()
}
