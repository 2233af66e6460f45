//! Configuration Module - TOML-based Bridge Configuration
//!
//! Loads and validates configuration from `config.toml`. The API
//! token (and optionally the account id) come from the environment
//! and never from the file.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::adapters::oanda::endpoints::{LIVE_URL, PRACTICE_URL};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Broker connection settings.
  pub broker: BrokerConfig,
  /// Transaction history paging.
  #[serde(default)]
  pub pager: PagerConfig,
  /// Logging output.
  #[serde(default)]
  pub logging: LoggingConfig,
}

/// Which OANDA environment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Practice,
  Live,
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
  /// Practice or live host.
  #[serde(default)]
  pub environment: Environment,
  /// Account id. `OANDA_ACCOUNT_ID` overrides it.
  #[serde(default)]
  pub account_id: String,
  /// Explicit host, overriding `environment`.
  #[serde(default)]
  pub base_url: Option<String>,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// Retries on 429 / 5xx / network failures.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Concurrent in-flight requests.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Request pacing; the broker allows one request per ~8.34ms.
  #[serde(default = "default_requests_per_second")]
  pub requests_per_second: u32,
}

impl BrokerConfig {
  /// Host the client talks to.
  pub fn url(&self) -> &str {
    match (&self.base_url, self.environment) {
      (Some(url), _) => url.as_str(),
      (None, Environment::Practice) => PRACTICE_URL,
      (None, Environment::Live) => LIVE_URL,
    }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }
}

/// Transaction history paging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagerConfig {
  /// `pageSize` sent with the summary request; broker default when absent.
  #[serde(default)]
  pub page_size: Option<u32>,
}

/// Logging output.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Filter directive when `RUST_LOG` is unset.
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Emit JSON lines instead of human-readable output.
  #[serde(default = "default_true")]
  pub json: bool,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      json: true,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_timeout() -> u64 {
  30
}

fn default_max_retries() -> u32 {
  3
}

fn default_max_concurrent() -> usize {
  10
}

fn default_requests_per_second() -> u32 {
  119
}
