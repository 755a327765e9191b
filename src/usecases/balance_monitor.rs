//! Balance Monitor - Polling Mode
//!
//! Each cycle walks the watch set in order, fetches every address's
//! aggregate balance through the resilient RPC stack and feeds it to the
//! `BalanceTracker`:
//! 1. A failed fetch skips the address; its stored state is untouched
//! 2. The first balance of an address sets the baseline (no event)
//! 3. Changes above epsilon are appended as `BalanceChangeEvent`s
//! 4. The refreshed `BalanceRecord` is upserted on every success
//!
//! Store failures are logged and counted; the tracker keeps the fresh
//! value so the next cycle compares against current data.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::metrics::MonitorMetrics;
use crate::config::MonitorMode;
use crate::domain::{BalanceTracker, Observation, WatchEntry, WatchSet};
use crate::ports::{ChainRpc, EventStore};

use super::report::CycleReport;
use super::scheduler::PollCycle;

/// Polling-mode monitor over a fixed watch set.
pub struct BalanceMonitor<R: ChainRpc, S: EventStore> {
  /// Resilient chain RPC.
  rpc: Arc<R>,
  /// Event store.
  store: Arc<S>,
  /// Immutable watch set.
  watch_set: Arc<WatchSet>,
  /// Per-address balance state machine.
  tracker: BalanceTracker,
  /// Optional metrics sink.
  metrics: Option<Arc<MonitorMetrics>>,
}

impl<R: ChainRpc, S: EventStore> BalanceMonitor<R, S> {
  /// Create a monitor with an empty tracker.
  pub fn new(rpc: Arc<R>, store: Arc<S>, watch_set: Arc<WatchSet>, epsilon: Decimal) -> Self {
    Self {
      rpc,
      store,
      watch_set,
      tracker: BalanceTracker::new(epsilon),
      metrics: None,
    }
  }

  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MonitorMetrics>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Rehydrate the tracker from persisted balances of watched addresses.
  ///
  /// Returns the number of addresses that start out tracked.
  pub async fn rehydrate(&mut self) -> Result<usize> {
    let stored = self.store.load_balances().await?;
    let watched: Vec<_> = stored
      .into_iter()
      .filter(|r| self.watch_set.contains(&r.address))
      .collect();
    let count = watched.len();
    self.tracker = BalanceTracker::with_records(self.tracker.epsilon(), watched);
    info!(tracked = count, "Balance tracker rehydrated from store");
    Ok(count)
  }

  pub fn tracker(&self) -> &BalanceTracker {
    &self.tracker
  }

  /// Run one polling cycle over the whole watch set.
  #[instrument(skip(self), fields(addresses = self.watch_set.len()))]
  pub async fn run_cycle(&mut self) -> CycleReport {
    let started = Instant::now();
    let mut report = CycleReport::new(MonitorMode::Balances);

    let watch_set = Arc::clone(&self.watch_set);
    for entry in watch_set.entries() {
      self.check_address(entry, &mut report).await;
    }

    report.duration = started.elapsed();
    report
  }

  /// Poll and evaluate a single address.
  async fn check_address(&mut self, entry: &WatchEntry, report: &mut CycleReport) {
    let address = entry.address.as_str();
    report.checked += 1;

    let balance = match self.rpc.token_balance(address).await {
      Ok(balance) => balance,
      Err(e) => {
        warn!(address, error = %e, kind = e.kind(), "Balance poll failed, skipping address");
        report.skipped += 1;
        return;
      }
    };
    report.succeeded += 1;

    let observation = self.tracker.observe(address, balance, Utc::now());
    match &observation {
      Observation::Baseline(record) => {
        info!(address, balance = %record.balance, "Baseline balance recorded");
        if let Some(reference) = entry.reference_balance {
          debug!(
            address,
            reference = %reference,
            drift = %(record.balance - reference),
            "Drift from snapshot balance"
          );
        }
      }
      Observation::Unchanged(record) => {
        debug!(address, balance = %record.balance, "Balance unchanged");
      }
      Observation::Changed { event, .. } => {
        info!(
          address,
          old_balance = %event.old_balance,
          new_balance = %event.new_balance,
          delta = %event.delta,
          direction = %event.direction,
          "Balance change detected"
        );
        report.events += 1;
        if let Some(metrics) = &self.metrics {
          metrics.record_balance_change(event.direction);
        }
        if let Err(e) = self.store.append_balance_change(event).await {
          error!(address, error = %e, "Failed to persist balance change");
          self.persistence_error(report, "balance_changes");
        }
      }
    }

    if let Err(e) = self.store.upsert_balance(observation.record()).await {
      error!(address, error = %e, "Failed to persist balance record");
      self.persistence_error(report, "balances");
    }
  }

  fn persistence_error(&self, report: &mut CycleReport, table: &str) {
    report.errors += 1;
    if let Some(metrics) = &self.metrics {
      metrics.persistence_errors.with_label_values(&[table]).inc();
    }
  }
}

#[async_trait]
impl<R: ChainRpc, S: EventStore> PollCycle for BalanceMonitor<R, S> {
  fn mode(&self) -> MonitorMode {
    MonitorMode::Balances
  }

  async fn run_cycle(&mut self) -> CycleReport {
    BalanceMonitor::run_cycle(self).await
  }
}
