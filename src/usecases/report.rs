//! Cycle Report - Per-Cycle Counters and Summary Logging
//!
//! Counts are reporting only; nothing downstream depends on them for
//! correctness.

use std::time::Duration;

use tracing::info;

use crate::adapters::metrics::MonitorMetrics;
use crate::config::MonitorMode;

/// Outcome counters of one monitor cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
  /// Mode that produced the report.
  pub mode: MonitorMode,
  /// Addresses or signatures looked at.
  pub checked: u64,
  /// Items whose remote call succeeded.
  pub succeeded: u64,
  /// Items skipped this cycle (failed or not yet visible).
  pub skipped: u64,
  /// Persistence failures.
  pub errors: u64,
  /// Change events or transaction records emitted.
  pub events: u64,
  /// Signatures or records dropped as already processed.
  pub duplicates: u64,
  /// Wall time of the cycle.
  pub duration: Duration,
}

impl CycleReport {
  pub fn new(mode: MonitorMode) -> Self {
    Self {
      mode,
      checked: 0,
      succeeded: 0,
      skipped: 0,
      errors: 0,
      events: 0,
      duplicates: 0,
      duration: Duration::ZERO,
    }
  }

  /// Fold another report into this one.
  pub fn absorb(&mut self, other: &Self) {
    self.checked += other.checked;
    self.succeeded += other.succeeded;
    self.skipped += other.skipped;
    self.errors += other.errors;
    self.events += other.events;
    self.duplicates += other.duplicates;
    self.duration += other.duration;
  }

  /// Emit the summary log line.
  pub fn log_summary(&self) {
    info!(
      mode = %self.mode,
      checked = self.checked,
      succeeded = self.succeeded,
      skipped = self.skipped,
      errors = self.errors,
      events = self.events,
      duplicates = self.duplicates,
      duration_ms = self.duration.as_millis() as u64,
      "Cycle complete"
    );
  }

  /// Export cycle-level counters.
  pub fn record_metrics(&self, metrics: &MonitorMetrics) {
    let mode = self.mode.as_str();
    metrics.cycles.with_label_values(&[mode]).inc();
    metrics
      .item_outcomes
      .with_label_values(&[mode, "ok"])
      .inc_by(self.succeeded);
    metrics
      .item_outcomes
      .with_label_values(&[mode, "skipped"])
      .inc_by(self.skipped);
    metrics
      .cycle_duration
      .with_label_values(&[mode])
      .observe(self.duration.as_secs_f64());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_absorb_sums_counters() {
    let mut total = CycleReport::new(MonitorMode::Balances);
    let mut one = CycleReport::new(MonitorMode::Balances);
    one.checked = 3;
    one.succeeded = 2;
    one.skipped = 1;
    one.events = 1;
    total.absorb(&one);
    total.absorb(&one);
    assert_eq!(total.checked, 6);
    assert_eq!(total.skipped, 2);
    assert_eq!(total.events, 2);
  }
}
