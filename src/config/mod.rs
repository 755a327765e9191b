//! Configuration Module - TOML-based Monitor Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides for the RPC endpoints.
//! The mint, token program and venue program ids are externalized
//! here - nothing chain-specific is hardcoded in the use cases.

pub mod loader;

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::venue::{VenueRule, default_rules};
use crate::domain::{DEFAULT_DEDUP_CAPACITY, DEFAULT_EPSILON};

/// SPL Token program id.
pub const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Top-level monitor configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the monitor begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Monitor identity, mode and cadence.
  pub monitor: MonitorConfig,
  /// The monitored asset.
  pub asset: AssetConfig,
  /// Solana RPC endpoints.
  pub rpc: RpcConfig,
  /// Request spacing and retry budget.
  #[serde(default)]
  pub rate_limits: RateLimitConfig,
  /// Circuit breaker thresholds.
  #[serde(default)]
  pub circuit_breaker: CircuitBreakerConfig,
  /// Ordered venue attribution rules.
  #[serde(default = "default_rules")]
  pub venues: Vec<VenueRule>,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Which change feed the monitor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorMode {
  /// Poll aggregate balances and diff them.
  #[default]
  Balances,
  /// Poll recent signatures per address and classify transactions.
  TransactionPolling,
  /// Classify transactions pushed by the logs subscription.
  Subscription,
}

impl MonitorMode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Balances => "balances",
      Self::TransactionPolling => "transaction_polling",
      Self::Subscription => "subscription",
    }
  }
}

impl std::fmt::Display for MonitorMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Monitor identity and cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
  /// Human-readable monitor name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Monitoring mode.
  #[serde(default)]
  pub mode: MonitorMode,
  /// Seconds between poll cycles.
  #[serde(default = "default_poll_interval")]
  pub poll_interval_seconds: u64,
  /// Balance noise threshold in UI units.
  #[serde(default = "default_epsilon")]
  pub epsilon: Decimal,
  /// Dedup ledger capacity.
  #[serde(default = "default_dedup_capacity")]
  pub dedup_capacity: usize,
  /// Signatures fetched per address in transaction polling.
  #[serde(default = "default_signatures_per_address")]
  pub signatures_per_address: usize,
  /// Maximum new signatures processed per polling cycle.
  #[serde(default = "default_max_signatures_per_cycle")]
  pub max_signatures_per_cycle: usize,
  /// Path to the holder snapshot.
  #[serde(default = "default_watch_snapshot_path")]
  pub watch_snapshot_path: String,
}

impl MonitorConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_seconds)
  }
}

/// Monitored asset.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
  /// Token mint address.
  pub mint: String,
  /// Token program whose logs are subscribed to.
  #[serde(default = "default_token_program")]
  pub token_program_id: String,
}

/// Solana RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
  /// HTTP JSON-RPC endpoint.
  pub http_url: String,
  /// WebSocket endpoint; derived from `http_url` when absent.
  #[serde(default)]
  pub ws_url: Option<String>,
  /// Commitment level.
  #[serde(default = "default_commitment")]
  pub commitment: String,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
}

impl RpcConfig {
  /// WebSocket URL, derived from the HTTP URL when not configured.
  pub fn ws_url(&self) -> String {
    if let Some(url) = &self.ws_url {
      return url.clone();
    }
    if let Some(rest) = self.http_url.strip_prefix("https://") {
      format!("wss://{rest}")
    } else if let Some(rest) = self.http_url.strip_prefix("http://") {
      format!("ws://{rest}")
    } else {
      self.http_url.clone()
    }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
  /// Minimum interval between the start of two RPC calls (milliseconds).
  #[serde(default = "default_min_spacing")]
  pub min_spacing_ms: u64,
  /// Total attempts per logical call.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base retry delay (milliseconds).
  #[serde(default = "default_initial_retry_delay")]
  pub initial_retry_delay_ms: u64,
  /// Ceiling for rate-limit backoff (milliseconds).
  #[serde(default = "default_backoff_ceiling")]
  pub rate_limit_backoff_ceiling_ms: u64,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      min_spacing_ms: default_min_spacing(),
      max_retries: default_max_retries(),
      initial_retry_delay_ms: default_initial_retry_delay(),
      rate_limit_backoff_ceiling_ms: default_backoff_ceiling(),
    }
  }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
  /// Consecutive rate-limit failures before opening.
  #[serde(default = "default_failure_threshold")]
  pub failure_threshold: u32,
  /// Cool-down period after the last failure (seconds).
  #[serde(default = "default_recovery")]
  pub recovery_seconds: u64,
}

impl Default for CircuitBreakerConfig {
  fn default() -> Self {
    Self {
      failure_threshold: default_failure_threshold(),
      recovery_seconds: default_recovery(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for the balance snapshot and JSONL logs.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_poll_interval() -> u64 {
  120
}

fn default_epsilon() -> Decimal {
  DEFAULT_EPSILON
}

fn default_dedup_capacity() -> usize {
  DEFAULT_DEDUP_CAPACITY
}

fn default_signatures_per_address() -> usize {
  5
}

fn default_max_signatures_per_cycle() -> usize {
  10
}

fn default_watch_snapshot_path() -> String {
  "topHolders.json".to_string()
}

fn default_token_program() -> String {
  SPL_TOKEN_PROGRAM_ID.to_string()
}

fn default_commitment() -> String {
  "confirmed".to_string()
}

fn default_timeout() -> u64 {
  30
}

fn default_min_spacing() -> u64 {
  8_000
}

fn default_max_retries() -> u32 {
  3
}

fn default_initial_retry_delay() -> u64 {
  15_000
}

fn default_backoff_ceiling() -> u64 {
  60_000
}

fn default_failure_threshold() -> u32 {
  3
}

fn default_recovery() -> u64 {
  30
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}

fn default_data_dir() -> String {
  "data".to_string()
}
