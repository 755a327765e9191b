//! Circuit Breaker - Fail Fast on Sustained Rate Limiting
//!
//! Counts consecutive rate-limit failures. Once the count reaches the
//! threshold, calls are rejected with `CircuitOpen` until `recovery` has
//! passed since the last failure; the next admission then resets the
//! count and lets traffic through again. There is no half-open probe.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{RpcError, RpcResult};

/// Effective breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
  Closed,
  Open,
}

#[derive(Debug, Default)]
struct Counters {
  failure_count: u32,
  last_failure: Option<Instant>,
}

/// Consecutive rate-limit circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
  /// Consecutive rate-limit failures that open the breaker.
  failure_threshold: u32,
  /// Cooldown measured from the last failure.
  recovery: Duration,
  counters: Mutex<Counters>,
}

impl CircuitBreaker {
  /// Create a breaker. A threshold of zero is treated as one.
  pub fn new(failure_threshold: u32, recovery: Duration) -> Self {
    Self {
      failure_threshold: failure_threshold.max(1),
      recovery,
      counters: Mutex::new(Counters::default()),
    }
  }

  /// Admit a call or reject it with `CircuitOpen`.
  ///
  /// Resets the failure count when the cooldown has elapsed.
  pub async fn admit(&self) -> RpcResult<()> {
    let mut c = self.counters.lock().await;
    if c.failure_count < self.failure_threshold {
      return Ok(());
    }

    if let Some(last) = c.last_failure {
      let elapsed = last.elapsed();
      if elapsed < self.recovery {
        let remaining = self.recovery - elapsed;
        return Err(RpcError::CircuitOpen {
          remaining_ms: remaining.as_millis() as u64,
        });
      }
    }

    info!(failures = c.failure_count, "Circuit breaker cooldown elapsed, closing");
    c.failure_count = 0;
    Ok(())
  }

  /// Feed back the outcome of an admitted call.
  pub async fn record<T>(&self, result: &RpcResult<T>) {
    let mut c = self.counters.lock().await;
    match result {
      Ok(_) => c.failure_count = 0,
      Err(e) if e.is_rate_limited() => {
        c.failure_count += 1;
        c.last_failure = Some(Instant::now());
        if c.failure_count == self.failure_threshold {
          warn!(
            failures = c.failure_count,
            recovery_secs = self.recovery.as_secs(),
            "Circuit breaker opened on consecutive rate limits"
          );
        }
      }
      // Other failures neither extend nor break the streak.
      Err(_) => {}
    }
  }

  /// Current effective state. Does not reset anything.
  pub async fn state(&self) -> BreakerState {
    let c = self.counters.lock().await;
    let within_recovery = c
      .last_failure
      .is_some_and(|last| last.elapsed() < self.recovery);
    if c.failure_count >= self.failure_threshold && within_recovery {
      BreakerState::Open
    } else {
      BreakerState::Closed
    }
  }

  pub async fn is_open(&self) -> bool {
    self.state().await == BreakerState::Open
  }

  /// Current consecutive rate-limit failure count.
  pub async fn failure_count(&self) -> u32 {
    self.counters.lock().await.failure_count
  }
}

impl Default for CircuitBreaker {
  fn default() -> Self {
    Self::new(3, Duration::from_secs(30))
  }
}
