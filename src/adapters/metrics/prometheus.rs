//! Prometheus Metrics Registry - Monitor Observability
//!
//! Registers and exposes Prometheus metrics on :9090 for Grafana
//! dashboards. Covers cycle outcomes, detected changes, RPC pressure
//! (attempts, rate limits, breaker state) and persistence health.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::domain::{Direction, Venue};
use crate::error::RpcResult;

/// Centralized Prometheus metrics for the monitor.
///
/// All metrics follow the naming convention `tokenwise_*`.
pub struct MonitorMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Completed poll cycles per mode.
    pub cycles: IntCounterVec,
    /// Per-address (or per-signature) outcomes: ok, skipped.
    pub item_outcomes: IntCounterVec,
    /// Balance change events by direction.
    pub balance_changes: IntCounterVec,
    /// Transaction records written, by direction and venue.
    pub transaction_records: IntCounterVec,
    /// Signatures dropped as duplicates, by stage (ledger, store).
    pub duplicates: IntCounterVec,
    /// RPC attempts by method and outcome.
    pub rpc_attempts: IntCounterVec,
    /// Rate-limit responses seen.
    pub rate_limit_hits: IntCounter,
    /// Circuit breaker status gauge (1 = open).
    pub circuit_breaker_open: Gauge,
    /// Signatures currently held by the dedup ledger.
    pub dedup_size: IntGauge,
    /// Cycle wall time in seconds.
    pub cycle_duration: HistogramVec,
    /// Failed store writes by table.
    pub persistence_errors: IntCounterVec,
    /// Log notices lost because the subscription receiver lagged.
    pub dropped_notices: IntCounter,
}

impl MonitorMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounterVec::new(
            Opts::new("tokenwise_cycles_total", "Completed monitor cycles"),
            &["mode"],
        )?;

        let item_outcomes = IntCounterVec::new(
            Opts::new(
                "tokenwise_items_total",
                "Addresses or signatures processed, by outcome",
            ),
            &["mode", "outcome"],
        )?;

        let balance_changes = IntCounterVec::new(
            Opts::new(
                "tokenwise_balance_changes_total",
                "Balance change events emitted",
            ),
            &["direction"],
        )?;

        let transaction_records = IntCounterVec::new(
            Opts::new(
                "tokenwise_transaction_records_total",
                "Transaction records written",
            ),
            &["direction", "venue"],
        )?;

        let duplicates = IntCounterVec::new(
            Opts::new(
                "tokenwise_duplicate_signatures_total",
                "Signatures skipped as already processed",
            ),
            &["stage"],
        )?;

        let rpc_attempts = IntCounterVec::new(
            Opts::new("tokenwise_rpc_attempts_total", "RPC attempts made"),
            &["method", "outcome"],
        )?;

        let rate_limit_hits = IntCounter::new(
            "tokenwise_rate_limit_hits_total",
            "Rate-limit responses from the RPC node",
        )?;

        let circuit_breaker_open = Gauge::new(
            "tokenwise_circuit_breaker_open",
            "Whether the RPC circuit breaker is open (1=yes, 0=no)",
        )?;

        let dedup_size = IntGauge::new(
            "tokenwise_dedup_ledger_size",
            "Signatures held by the dedup ledger",
        )?;

        let cycle_duration = HistogramVec::new(
            HistogramOpts::new(
                "tokenwise_cycle_duration_seconds",
                "Wall time of one monitor cycle",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
            &["mode"],
        )?;

        let persistence_errors = IntCounterVec::new(
            Opts::new(
                "tokenwise_persistence_errors_total",
                "Failed event store writes",
            ),
            &["table"],
        )?;

        let dropped_notices = IntCounter::new(
            "tokenwise_dropped_log_notices_total",
            "Log notices dropped by a lagging subscription receiver",
        )?;

        // Register all metrics
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(item_outcomes.clone()))?;
        registry.register(Box::new(balance_changes.clone()))?;
        registry.register(Box::new(transaction_records.clone()))?;
        registry.register(Box::new(duplicates.clone()))?;
        registry.register(Box::new(rpc_attempts.clone()))?;
        registry.register(Box::new(rate_limit_hits.clone()))?;
        registry.register(Box::new(circuit_breaker_open.clone()))?;
        registry.register(Box::new(dedup_size.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;
        registry.register(Box::new(persistence_errors.clone()))?;
        registry.register(Box::new(dropped_notices.clone()))?;

        Ok(Self {
            registry,
            cycles,
            item_outcomes,
            balance_changes,
            transaction_records,
            duplicates,
            rpc_attempts,
            rate_limit_hits,
            circuit_breaker_open,
            dedup_size,
            cycle_duration,
            persistence_errors,
            dropped_notices,
        })
    }

    /// Count one RPC attempt.
    pub fn record_rpc_attempt<T>(&self, method: &str, result: &RpcResult<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        self.rpc_attempts.with_label_values(&[method, outcome]).inc();
        if result.as_ref().is_err_and(|e| e.is_rate_limited()) {
            self.rate_limit_hits.inc();
        }
    }

    pub fn record_balance_change(&self, direction: Direction) {
        self.balance_changes
            .with_label_values(&[direction.as_str()])
            .inc();
    }

    pub fn record_transaction(&self, direction: Direction, venue: &Venue) {
        self.transaction_records
            .with_label_values(&[direction.as_str(), venue.name()])
            .inc();
    }

    pub fn set_breaker_open(&self, open: bool) {
        self.circuit_breaker_open.set(if open { 1.0 } else { 0.0 });
    }

    /// Encode the registry in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move { metrics.render() }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
