//! Transaction Monitor - Transaction Polling and Subscription Modes
//!
//! Turns signatures into `TransactionRecord`s:
//! 1. Signatures already in the `DedupLedger` are dropped before any fetch
//! 2. The transaction is fetched and classified per watched owner
//! 3. Records are inserted if their signature is absent from the store
//! 4. The signature is recorded once processing reached a terminal outcome
//!
//! A transaction the node does not know yet, or one whose fetch exhausted
//! its retries, stays unrecorded so a later cycle can pick it up.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::metrics::MonitorMetrics;
use crate::config::MonitorMode;
use crate::domain::{DedupLedger, TransactionClassifier};
use crate::ports::{ChainRpc, EventStore, LogNotice};

use super::report::CycleReport;
use super::scheduler::PollCycle;

/// What happened to one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
  /// Already processed; nothing fetched.
  Duplicate,
  /// Node returned no transaction yet; left unrecorded.
  NotFound,
  /// Fetch failed; left unrecorded.
  FetchFailed,
  /// Fetched and classified.
  Classified {
    /// Records written to the store.
    written: usize,
    /// Records the store already had.
    duplicates: usize,
  },
}

/// Limits for transaction polling.
#[derive(Debug, Clone, Copy)]
pub struct PollingLimits {
  /// Signatures requested per watched address.
  pub signatures_per_address: usize,
  /// New signatures processed per cycle.
  pub max_signatures_per_cycle: usize,
}

impl Default for PollingLimits {
  fn default() -> Self {
    Self {
      signatures_per_address: 5,
      max_signatures_per_cycle: 10,
    }
  }
}

/// Transaction-level monitor shared by polling and subscription modes.
pub struct TransactionMonitor<R: ChainRpc, S: EventStore> {
  /// Resilient chain RPC.
  rpc: Arc<R>,
  /// Event store.
  store: Arc<S>,
  /// Direction and venue classifier (owns the watch set).
  classifier: TransactionClassifier,
  /// Processed signatures.
  ledger: DedupLedger,
  /// Polling limits.
  limits: PollingLimits,
  /// Optional metrics sink.
  metrics: Option<Arc<MonitorMetrics>>,
}

impl<R: ChainRpc, S: EventStore> TransactionMonitor<R, S> {
  pub fn new(
    rpc: Arc<R>,
    store: Arc<S>,
    classifier: TransactionClassifier,
    ledger: DedupLedger,
    limits: PollingLimits,
  ) -> Self {
    Self {
      rpc,
      store,
      classifier,
      ledger,
      limits,
      metrics: None,
    }
  }

  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MonitorMetrics>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Seed the ledger with the newest stored signatures.
  ///
  /// Returns the ledger size afterwards.
  pub async fn seed_ledger(&mut self) -> Result<usize> {
    let known = self.store.known_signatures().await?;
    let skip = known.len().saturating_sub(self.ledger.capacity());
    self.ledger.seed(known.iter().skip(skip));
    info!(
      stored = known.len(),
      seeded = self.ledger.len(),
      "Dedup ledger seeded from store"
    );
    self.update_dedup_gauge();
    Ok(self.ledger.len())
  }

  pub fn ledger(&self) -> &DedupLedger {
    &self.ledger
  }

  /// One transaction polling cycle.
  ///
  /// Unions the most recent signatures of every watched address in
  /// first-seen order, drops processed ones, caps the batch and
  /// processes it sequentially.
  #[instrument(skip(self))]
  pub async fn run_polling_cycle(&mut self) -> CycleReport {
    let started = Instant::now();
    let mut report = CycleReport::new(MonitorMode::TransactionPolling);

    let addresses: Vec<String> = self
      .classifier
      .watch_set()
      .addresses()
      .map(str::to_string)
      .collect();

    let mut candidates = Vec::new();
    let mut queued = HashSet::new();
    for address in &addresses {
      match self
        .rpc
        .recent_signatures(address, self.limits.signatures_per_address)
        .await
      {
        Ok(signatures) => {
          for sig in signatures {
            if self.ledger.seen(&sig) {
              self.count_ledger_duplicate(&mut report);
              continue;
            }
            if queued.insert(sig.clone()) {
              candidates.push(sig);
            }
          }
        }
        Err(e) => {
          warn!(address = %address, error = %e, kind = e.kind(), "Signature poll failed, skipping address");
          report.skipped += 1;
        }
      }
    }

    if candidates.len() > self.limits.max_signatures_per_cycle {
      debug!(
        found = candidates.len(),
        cap = self.limits.max_signatures_per_cycle,
        "Capping signatures for this cycle"
      );
      candidates.truncate(self.limits.max_signatures_per_cycle);
    }

    for sig in &candidates {
      self.process_signature(sig, &mut report).await;
    }

    report.duration = started.elapsed();
    report
  }

  /// Handle a pushed log notice. Failed transactions are ignored.
  pub async fn handle_notice(
    &mut self,
    notice: &LogNotice,
    report: &mut CycleReport,
  ) -> Option<SignatureOutcome> {
    if notice.failed {
      debug!(signature = %notice.signature, "Skipping failed transaction notice");
      return None;
    }
    Some(self.process_signature(&notice.signature, report).await)
  }

  /// Process one signature end to end.
  #[instrument(skip(self, report))]
  pub async fn process_signature(
    &mut self,
    signature: &str,
    report: &mut CycleReport,
  ) -> SignatureOutcome {
    if self.ledger.seen(signature) {
      self.count_ledger_duplicate(report);
      return SignatureOutcome::Duplicate;
    }
    report.checked += 1;

    let tx = match self.rpc.parsed_transaction(signature).await {
      Ok(Some(tx)) => tx,
      Ok(None) => {
        debug!(signature, "Transaction not visible yet, will retry later");
        report.skipped += 1;
        return SignatureOutcome::NotFound;
      }
      Err(e) => {
        warn!(signature, error = %e, kind = e.kind(), "Transaction fetch failed, skipping");
        report.skipped += 1;
        return SignatureOutcome::FetchFailed;
      }
    };
    report.succeeded += 1;

    let records = self.classifier.classify(&tx, Utc::now());
    let mut written = 0;
    let mut duplicates = 0;

    for record in &records {
      match self.store.insert_transaction_if_absent(record).await {
        Ok(true) => {
          written += 1;
          report.events += 1;
          info!(
            signature,
            address = %record.address,
            amount = %record.amount,
            direction = %record.direction,
            venue = %record.venue,
            "Transaction recorded"
          );
          if let Some(metrics) = &self.metrics {
            metrics.record_transaction(record.direction, &record.venue);
          }
        }
        Ok(false) => {
          duplicates += 1;
          report.duplicates += 1;
          debug!(signature, address = %record.address, "Signature already stored");
          if let Some(metrics) = &self.metrics {
            metrics.duplicates.with_label_values(&["store"]).inc();
          }
        }
        Err(e) => {
          error!(signature, error = %e, "Failed to persist transaction record");
          report.errors += 1;
          if let Some(metrics) = &self.metrics {
            metrics
              .persistence_errors
              .with_label_values(&["transactions"])
              .inc();
          }
        }
      }
    }

    if records.is_empty() {
      debug!(signature, "No watched balance change in transaction");
    }

    self.ledger.record(signature);
    self.update_dedup_gauge();

    SignatureOutcome::Classified {
      written,
      duplicates,
    }
  }

  fn count_ledger_duplicate(&self, report: &mut CycleReport) {
    report.duplicates += 1;
    if let Some(metrics) = &self.metrics {
      metrics.duplicates.with_label_values(&["ledger"]).inc();
    }
  }

  fn update_dedup_gauge(&self) {
    if let Some(metrics) = &self.metrics {
      metrics
        .dedup_size
        .set(i64::try_from(self.ledger.len()).unwrap_or(i64::MAX));
    }
  }
}

#[async_trait]
impl<R: ChainRpc, S: EventStore> PollCycle for TransactionMonitor<R, S> {
  fn mode(&self) -> MonitorMode {
    MonitorMode::TransactionPolling
  }

  async fn run_cycle(&mut self) -> CycleReport {
    self.run_polling_cycle().await
  }
}
