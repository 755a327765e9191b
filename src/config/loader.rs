//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages
//! for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Overrides `rpc.http_url`.
pub const ENV_RPC_URL: &str = "SOLANA_RPC_URL";
/// Overrides `rpc.ws_url`.
pub const ENV_WS_URL: &str = "SOLANA_WS_URL";

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
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

  let config = parse_config(&content, |key| std::env::var(key).ok())?;

  info!(
    mode = %config.monitor.mode,
    mint = %config.asset.mint,
    venues = config.venues.len(),
    poll_interval_secs = config.monitor.poll_interval_seconds,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse, override and validate a config document.
///
/// `env` looks up override variables; tests pass a closure instead of
/// touching the process environment.
pub fn parse_config(content: &str, env: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
  let mut config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  apply_env_overrides(&mut config, env);
  validate_config(&config)?;
  Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig, env: impl Fn(&str) -> Option<String>) {
  if let Some(url) = env(ENV_RPC_URL).filter(|v| !v.is_empty()) {
    config.rpc.http_url = url;
  }
  if let Some(url) = env(ENV_WS_URL).filter(|v| !v.is_empty()) {
    config.rpc.ws_url = Some(url);
  }
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty identifiers and URLs
/// - Positive cadence, capacities and retry budget
/// - A non-negative noise threshold
/// - Unique, non-empty venue rules
fn validate_config(config: &AppConfig) -> Result<()> {
  // Asset validation
  anyhow::ensure!(!config.asset.mint.is_empty(), "asset.mint must not be empty");
  anyhow::ensure!(
    !config.asset.token_program_id.is_empty(),
    "asset.token_program_id must not be empty"
  );

  // Monitor validation
  anyhow::ensure!(
    config.monitor.poll_interval_seconds > 0,
    "poll_interval_seconds must be positive"
  );
  anyhow::ensure!(
    config.monitor.epsilon >= Decimal::ZERO,
    "epsilon must be non-negative, got {}",
    config.monitor.epsilon
  );
  anyhow::ensure!(
    config.monitor.dedup_capacity > 0,
    "dedup_capacity must be positive"
  );
  anyhow::ensure!(
    config.monitor.signatures_per_address > 0,
    "signatures_per_address must be positive"
  );
  anyhow::ensure!(
    config.monitor.max_signatures_per_cycle > 0,
    "max_signatures_per_cycle must be positive"
  );
  anyhow::ensure!(
    !config.monitor.watch_snapshot_path.is_empty(),
    "watch_snapshot_path must not be empty"
  );

  // RPC validation
  anyhow::ensure!(
    config.rpc.http_url.starts_with("http://") || config.rpc.http_url.starts_with("https://"),
    "rpc.http_url must be an http(s) URL, got {:?}",
    config.rpc.http_url
  );
  anyhow::ensure!(config.rpc.timeout_seconds > 0, "rpc.timeout_seconds must be positive");

  // Rate limit validation
  anyhow::ensure!(
    config.rate_limits.max_retries > 0,
    "rate_limits.max_retries must be positive"
  );
  anyhow::ensure!(
    config.rate_limits.rate_limit_backoff_ceiling_ms >= config.rate_limits.initial_retry_delay_ms,
    "rate_limit_backoff_ceiling_ms ({}) must be >= initial_retry_delay_ms ({})",
    config.rate_limits.rate_limit_backoff_ceiling_ms,
    config.rate_limits.initial_retry_delay_ms
  );

  // Breaker validation
  anyhow::ensure!(
    config.circuit_breaker.failure_threshold > 0,
    "circuit_breaker.failure_threshold must be positive"
  );

  // Venue validation
  let mut programs = HashSet::new();
  for (i, venue) in config.venues.iter().enumerate() {
    anyhow::ensure!(
      !venue.name.is_empty() && !venue.program_id.is_empty(),
      "Venue {} has an empty name or program_id",
      i
    );
    anyhow::ensure!(
      programs.insert(venue.program_id.as_str()),
      "Venue {} ({}) repeats program_id {}",
      i,
      venue.name,
      venue.program_id
    );
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::MonitorMode;
  use rust_decimal_macros::dec;

  const MINIMAL: &str = r#"
    [monitor]
    name = "test"

    [asset]
    mint = "9BB6NFEcjBCtnNLFko2FqVQBq8HHM13kCyYcdQbgpump"

    [rpc]
    http_url = "https://api.mainnet-beta.solana.com"
  "#;

  fn no_env(_: &str) -> Option<String> {
    None
  }

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_defaults_applied() {
    let config = parse_config(MINIMAL, no_env).unwrap();
    assert_eq!(config.monitor.mode, MonitorMode::Balances);
    assert_eq!(config.monitor.poll_interval_seconds, 120);
    assert_eq!(config.monitor.epsilon, dec!(0.001));
    assert_eq!(config.monitor.dedup_capacity, 10_000);
    assert_eq!(config.rate_limits.min_spacing_ms, 8_000);
    assert_eq!(config.circuit_breaker.failure_threshold, 3);
    assert_eq!(config.venues.len(), 3);
    assert_eq!(config.rpc.ws_url(), "wss://api.mainnet-beta.solana.com");
  }

  #[test]
  fn test_env_overrides() {
    let config = parse_config(MINIMAL, |key| match key {
      ENV_RPC_URL => Some("http://localhost:8899".to_string()),
      ENV_WS_URL => Some("ws://localhost:8900".to_string()),
      _ => None,
    })
    .unwrap();
    assert_eq!(config.rpc.http_url, "http://localhost:8899");
    assert_eq!(config.rpc.ws_url(), "ws://localhost:8900");
  }

  #[test]
  fn test_mode_and_custom_venues() {
    let doc = format!(
      "{MINIMAL}\n{}",
      r#"
      [[venues]]
      name = "Meteora"
      program_id = "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo"
      "#
    );
    let doc = doc.replace("name = \"test\"", "name = \"test\"\nmode = \"transaction_polling\"");
    let config = parse_config(&doc, no_env).unwrap();
    assert_eq!(config.monitor.mode, MonitorMode::TransactionPolling);
    assert_eq!(config.venues.len(), 1);
    assert_eq!(config.venues[0].name, "Meteora");
  }

  #[test]
  fn test_validation_rejects_bad_values() {
    let bad_interval = MINIMAL.replace("name = \"test\"", "name = \"test\"\npoll_interval_seconds = 0");
    assert!(parse_config(&bad_interval, no_env).is_err());

    let bad_url = MINIMAL.replace("https://api", "ftp://api");
    assert!(parse_config(&bad_url, no_env).is_err());

    let empty_mint = MINIMAL.replace("9BB6NFEcjBCtnNLFko2FqVQBq8HHM13kCyYcdQbgpump", "");
    assert!(parse_config(&empty_mint, no_env).is_err());
  }
}
