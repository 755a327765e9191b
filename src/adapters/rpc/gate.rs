//! Request Gate - Serialized, Spaced Outbound Calls
//!
//! At most one call to the node is in flight at any time, and consecutive
//! calls start at least `min_spacing` apart. Waiters queue on a fair
//! `tokio::sync::Mutex`, so earlier submissions always run first.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Serializes operations and enforces a minimum start-to-start spacing.
#[derive(Debug)]
pub struct RequestGate {
  /// Minimum time between the start of two consecutive operations.
  min_spacing: Duration,
  /// Start time of the most recently dispatched operation.
  last_start: Mutex<Option<Instant>>,
}

impl RequestGate {
  /// Create a gate with the given spacing.
  pub fn new(min_spacing: Duration) -> Self {
    Self {
      min_spacing,
      last_start: Mutex::new(None),
    }
  }

  /// Run `operation` once its turn comes.
  ///
  /// Resolves with the operation's own output; the gate never retries and
  /// a failed operation releases the queue like a successful one.
  pub async fn submit<F, T>(&self, operation: F) -> T
  where
    F: Future<Output = T>,
  {
    let mut last_start = self.last_start.lock().await;

    if let Some(prev) = *last_start {
      let elapsed = prev.elapsed();
      if elapsed < self.min_spacing {
        let wait = self.min_spacing - elapsed;
        debug!(wait_ms = wait.as_millis() as u64, "Request gate spacing");
        sleep(wait).await;
      }
    }

    *last_start = Some(Instant::now());
    operation.await
  }

  /// Configured spacing.
  pub fn min_spacing(&self) -> Duration {
    self.min_spacing
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex as StdMutex};

  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_first_call_is_immediate() {
    let gate = RequestGate::new(Duration::from_secs(8));
    let start = Instant::now();
    gate.submit(async {}).await;
    assert_eq!(start.elapsed(), Duration::ZERO);
  }

  #[tokio::test(start_paused = true)]
  async fn test_consecutive_calls_are_spaced() {
    let gate = RequestGate::new(Duration::from_secs(8));
    let start = Instant::now();
    gate.submit(async {}).await;
    let second = gate.submit(async { Instant::now() }).await;
    assert!(second - start >= Duration::from_secs(8));
  }

  #[tokio::test(start_paused = true)]
  async fn test_no_wait_after_spacing_elapsed() {
    let gate = RequestGate::new(Duration::from_secs(2));
    gate.submit(async {}).await;
    tokio::time::advance(Duration::from_secs(5)).await;
    let before = Instant::now();
    gate.submit(async {}).await;
    assert_eq!(before.elapsed(), Duration::ZERO);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failure_does_not_block_queue() {
    let gate = RequestGate::new(Duration::from_millis(100));
    let failed: Result<(), &str> = gate.submit(async { Err("boom") }).await;
    assert!(failed.is_err());
    let ok: Result<u8, &str> = gate.submit(async { Ok(1) }).await;
    assert_eq!(ok, Ok(1));
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_submissions_run_in_submission_order() {
    let gate = Arc::new(RequestGate::new(Duration::from_secs(8)));
    let ran: Arc<StdMutex<Vec<(usize, Instant)>>> = Arc::new(StdMutex::new(Vec::new()));

    let mut handles = Vec::new();
    for index in 0..5 {
      let gate = Arc::clone(&gate);
      let ran = Arc::clone(&ran);
      handles.push(tokio::spawn(async move {
        gate
          .submit(async move {
            ran.lock().unwrap().push((index, Instant::now()));
          })
          .await;
      }));
      // Let this task queue on the gate before the next one is spawned.
      tokio::task::yield_now().await;
    }
    for handle in handles {
      handle.await.unwrap();
    }

    let ran = ran.lock().unwrap();
    let order: Vec<usize> = ran.iter().map(|(index, _)| *index).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
    for pair in ran.windows(2) {
      assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(8));
    }
  }
}
