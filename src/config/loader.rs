//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages
//! for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Environment variable holding the personal access token.
pub const TOKEN_ENV: &str = "OANDA_API_TOKEN";
/// Environment variable overriding `broker.account_id`.
pub const ACCOUNT_ENV: &str = "OANDA_ACCOUNT_ID";

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content, std::env::var(ACCOUNT_ENV).ok())?;

  info!(
    environment = ?config.broker.environment,
    url = config.broker.url(),
    page_size = ?config.pager.page_size,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text. `account_override` wins
/// over the file's `broker.account_id`.
///
/// # Errors
/// TOML syntax errors and validation failures.
pub fn parse_config(content: &str, account_override: Option<String>) -> Result<AppConfig> {
  let mut config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  if let Some(account) = account_override.filter(|a| !a.is_empty()) {
    config.broker.account_id = account;
  }

  validate_config(&config)?;
  Ok(config)
}

/// Read the API token from the environment.
///
/// # Errors
/// When `OANDA_API_TOKEN` is unset or empty.
pub fn api_token() -> Result<String> {
  let token = std::env::var(TOKEN_ENV).with_context(|| format!("{TOKEN_ENV} is not set"))?;
  anyhow::ensure!(!token.trim().is_empty(), "{TOKEN_ENV} is empty");
  Ok(token)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  let broker = &config.broker;

  anyhow::ensure!(
    !broker.account_id.is_empty(),
    "broker.account_id (or {ACCOUNT_ENV}) must be set"
  );
  anyhow::ensure!(
    broker.url().starts_with("https://") || broker.url().starts_with("http://"),
    "broker.base_url must be an http(s) URL, got {}",
    broker.url()
  );
  anyhow::ensure!(broker.timeout_seconds > 0, "broker.timeout_seconds must be positive");
  anyhow::ensure!(
    broker.max_concurrent > 0,
    "broker.max_concurrent must be positive"
  );
  anyhow::ensure!(
    broker.requests_per_second > 0 && broker.requests_per_second <= 120,
    "broker.requests_per_second must be in (0, 120], got {}",
    broker.requests_per_second
  );

  if let Some(size) = config.pager.page_size {
    anyhow::ensure!(
      (1..=1000).contains(&size),
      "pager.page_size must be in [1, 1000], got {size}"
    );
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Environment;

  const MINIMAL: &str = r#"
[broker]
account_id = "101-004-1234567-001"
"#;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_defaults_applied() {
    let config = parse_config(MINIMAL, None).unwrap();
    assert_eq!(config.broker.environment, Environment::Practice);
    assert_eq!(config.broker.url(), "https://api-fxpractice.oanda.com");
    assert_eq!(config.broker.max_retries, 3);
    assert_eq!(config.pager.page_size, None);
    assert_eq!(config.logging.level, "info");
  }

  #[test]
  fn test_account_override() {
    let config = parse_config(MINIMAL, Some("001-999".into())).unwrap();
    assert_eq!(config.broker.account_id, "001-999");
  }

  #[test]
  fn test_missing_account_rejected() {
    let result = parse_config("[broker]\nenvironment = \"live\"\n", None);
    assert!(result.is_err());
  }

  #[test]
  fn test_live_environment_and_page_size() {
    let text = r#"
[broker]
environment = "live"
account_id = "001-004-1"

[pager]
page_size = 5000
"#;
    assert!(parse_config(text, None).is_err());
    let ok = text.replace("5000", "500");
    let config = parse_config(&ok, None).unwrap();
    assert_eq!(config.broker.url(), "https://api-fxtrade.oanda.com");
    assert_eq!(config.pager.page_size, Some(500));
  }
}
