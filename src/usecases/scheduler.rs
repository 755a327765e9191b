//! Scheduler - Single Worker Timeline
//!
//! Drives one monitor on a fixed interval. The first cycle runs right
//! away; cycles are awaited inline and missed ticks are skipped, so two
//! cycles never overlap. Shutdown is observed between cycles: a cycle
//! already running is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, instrument, warn};

use crate::adapters::metrics::{HealthState, MonitorMetrics};
use crate::adapters::rpc::CircuitBreaker;
use crate::config::MonitorMode;
use crate::ports::{ChainRpc, EventStore, LogNotice};

use super::report::CycleReport;
use super::transaction_monitor::TransactionMonitor;

/// A monitor that can run one poll cycle.
#[async_trait]
pub trait PollCycle: Send {
  fn mode(&self) -> MonitorMode;

  async fn run_cycle(&mut self) -> CycleReport;
}

/// Refreshes readiness after every cycle.
pub struct HealthRefresher {
  state: Arc<HealthState>,
  breaker: Arc<CircuitBreaker>,
  store: Arc<dyn EventStore>,
}

impl HealthRefresher {
  pub fn new(state: Arc<HealthState>, breaker: Arc<CircuitBreaker>, store: Arc<dyn EventStore>) -> Self {
    Self {
      state,
      breaker,
      store,
    }
  }

  async fn refresh(&self) {
    let store_healthy = self.store.is_healthy().await;
    let breaker_open = self.breaker.is_open().await;
    self.state.update(store_healthy, breaker_open);
  }
}

/// Fixed-interval driver for a single monitor.
pub struct Scheduler {
  /// Time between cycle starts.
  period: Duration,
  /// Optional metrics sink.
  metrics: Option<Arc<MonitorMetrics>>,
  /// Optional readiness refresher.
  health: Option<HealthRefresher>,
}

impl Scheduler {
  pub fn new(period: Duration) -> Self {
    Self {
      period,
      metrics: None,
      health: None,
    }
  }

  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MonitorMetrics>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  #[must_use]
  pub fn with_health(mut self, health: HealthRefresher) -> Self {
    self.health = Some(health);
    self
  }

  /// Run polling cycles until shutdown. Returns the accumulated totals.
  #[instrument(skip_all, fields(mode = %monitor.mode()))]
  pub async fn run<C: PollCycle>(
    &self,
    monitor: &mut C,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> CycleReport {
    let mut totals = CycleReport::new(monitor.mode());
    let mut ticker = interval(self.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(period_secs = self.period.as_secs(), "Scheduler started");

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Shutdown signal received, stopping scheduler");
          break;
        }
        _ = ticker.tick() => {
          let report = monitor.run_cycle().await;
          self.finish_cycle(&report).await;
          totals.absorb(&report);
        }
      }
    }

    totals
  }

  /// Process log notices as they arrive until shutdown.
  ///
  /// Every `period` the work done since the last summary is reported
  /// as one cycle.
  #[instrument(skip_all, fields(mode = "subscription"))]
  pub async fn run_subscription<R: ChainRpc, S: EventStore>(
    &self,
    monitor: &mut TransactionMonitor<R, S>,
    mut notices: broadcast::Receiver<LogNotice>,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> CycleReport {
    let mut totals = CycleReport::new(MonitorMode::Subscription);
    let mut window = CycleReport::new(MonitorMode::Subscription);
    let mut window_started = tokio::time::Instant::now();
    let mut ticker = interval(self.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; nothing to report yet.
    ticker.tick().await;

    info!("Subscription processing started");

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Shutdown signal received, stopping subscription processing");
          break;
        }
        notice = notices.recv() => {
          match notice {
            Ok(notice) => {
              monitor.handle_notice(&notice, &mut window).await;
            }
            Err(RecvError::Lagged(missed)) => {
              warn!(missed, "Log notice receiver lagged, notices dropped");
              if let Some(metrics) = &self.metrics {
                metrics.dropped_notices.inc_by(missed);
              }
            }
            Err(RecvError::Closed) => {
              warn!("Log feed closed, stopping subscription processing");
              break;
            }
          }
        }
        _ = ticker.tick() => {
          window.duration = window_started.elapsed();
          self.finish_cycle(&window).await;
          totals.absorb(&window);
          window = CycleReport::new(MonitorMode::Subscription);
          window_started = tokio::time::Instant::now();
        }
      }
    }

    window.duration = window_started.elapsed();
    totals.absorb(&window);
    totals
  }

  async fn finish_cycle(&self, report: &CycleReport) {
    report.log_summary();
    if let Some(metrics) = &self.metrics {
      report.record_metrics(metrics);
    }
    if let Some(health) = &self.health {
      health.refresh().await;
    }
  }
}
