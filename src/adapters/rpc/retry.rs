//! Retry Policy - Bounded Retries with Rate-Limit Aware Backoff
//!
//! Wraps one logical call. Rate-limit failures double the delay on each
//! attempt up to a fixed ceiling; other transient failures wait half the
//! base delay. Non-retryable errors (including an open breaker) are
//! returned as-is without further attempts.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{RpcError, RpcResult};

/// Default ceiling for rate-limit backoff.
pub const DEFAULT_RATE_LIMIT_CEILING: Duration = Duration::from_secs(60);

/// Retry configuration for a single logical call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  /// Total attempts, including the first.
  max_attempts: u32,
  /// Base delay. Rate-limit backoff starts from here.
  initial_delay: Duration,
  /// Upper bound for rate-limit backoff.
  rate_limit_ceiling: Duration,
}

impl RetryPolicy {
  /// Create a policy. `max_attempts` of zero is treated as one.
  pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      initial_delay,
      rate_limit_ceiling: DEFAULT_RATE_LIMIT_CEILING,
    }
  }

  /// Override the rate-limit backoff ceiling.
  #[must_use]
  pub fn with_rate_limit_ceiling(mut self, ceiling: Duration) -> Self {
    self.rate_limit_ceiling = ceiling;
    self
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  /// Run `op` until it succeeds, fails terminally, or attempts run out.
  ///
  /// Fails with `ExhaustedRetries` after exactly `max_attempts` retryable
  /// failures. No sleep follows the final attempt.
  ///
  /// Non-rate-limit retries always wait `initial_delay / 2`, even after
  /// rate limits have grown the rate-limit delay.
  pub async fn execute<T, F, Fut>(&self, method: &str, mut op: F) -> RpcResult<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = RpcResult<T>>,
  {
    let mut rate_limit_delay = self.initial_delay;
    let mut attempt = 0;

    loop {
      attempt += 1;

      let err = match op().await {
        Ok(value) => return Ok(value),
        Err(e) if !e.is_retryable() => return Err(e),
        Err(e) => e,
      };

      if attempt >= self.max_attempts {
        warn!(method, attempts = attempt, error = %err, "RPC retries exhausted");
        return Err(RpcError::ExhaustedRetries {
          attempts: attempt,
          last: Box::new(err),
        });
      }

      let delay = if err.is_rate_limited() {
        rate_limit_delay = (rate_limit_delay * 2).min(self.rate_limit_ceiling);
        warn!(
          method,
          attempt,
          delay_ms = rate_limit_delay.as_millis() as u64,
          "Rate limited, backing off"
        );
        rate_limit_delay
      } else {
        let delay = self.initial_delay / 2;
        debug!(
          method,
          attempt,
          delay_ms = delay.as_millis() as u64,
          error = %err,
          "Transient RPC failure, retrying"
        );
        delay
      };

      sleep(delay).await;
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(3, Duration::from_secs(15))
  }
}
