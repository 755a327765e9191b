//! TokenWise Monitor - Entry Point
//!
//! Initializes configuration, logging, the resilient RPC stack and the
//! selected monitor. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from argv[1]) + env overrides + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load the watch set snapshot (fatal on failure)
//! 4. Open the event store
//! 5. Build RPC client wrapped in gate + breaker + retry
//! 6. Spawn metrics (:9090) and health (/live + /ready) servers
//! 7. Run the monitor for the configured mode on the scheduler
//! 8. SIGINT → broadcast shutdown → finish current cycle → exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use tokenwise_monitor::adapters::feeds::LogsSubscriptionFeed;
use tokenwise_monitor::adapters::metrics::{HealthServer, HealthState, MonitorMetrics};
use tokenwise_monitor::adapters::persistence::{JsonlEventStore, load_watch_set};
use tokenwise_monitor::adapters::rpc::{
    CircuitBreaker, RequestGate, ResilientRpc, RetryPolicy, SolanaRpcClient, SolanaRpcConfig,
};
use tokenwise_monitor::config::{self, AppConfig, MonitorMode};
use tokenwise_monitor::domain::{DedupLedger, TransactionClassifier, VenueTable, WatchSet};
use tokenwise_monitor::ports::{EventStore, LogFeed};
use tokenwise_monitor::usecases::{
    BalanceMonitor, CycleReport, HealthRefresher, PollingLimits, Scheduler, TransactionMonitor,
};

type Rpc = ResilientRpc<SolanaRpcClient>;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.monitor.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.monitor.name,
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.monitor.mode,
        mint = %config.asset.mint,
        "Starting TokenWise monitor"
    );

    // ── 3. Watch set (fatal on failure) ─────────────────────
    let watch_set = Arc::new(
        load_watch_set(Path::new(&config.monitor.watch_snapshot_path))
            .context("Failed to load watch set snapshot")?,
    );

    // ── 4. Event store ──────────────────────────────────────
    let store = Arc::new(
        JsonlEventStore::open(&config.persistence.data_dir)
            .await
            .context("Failed to open event store")?,
    );

    // ── 5. Metrics + resilient RPC stack ────────────────────
    let metrics = Arc::new(MonitorMetrics::new().context("Failed to register metrics")?);
    let breaker = Arc::new(CircuitBreaker::new(
        config.circuit_breaker.failure_threshold,
        Duration::from_secs(config.circuit_breaker.recovery_seconds),
    ));
    let rpc = Arc::new(build_rpc(&config, Arc::clone(&breaker), Arc::clone(&metrics))?);

    // ── 6. Shutdown channel, metrics and health servers ─────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let health_state = Arc::new(HealthState::new());
    let mut background = Vec::new();

    if config.metrics.enabled {
        let metrics_shutdown = shutdown_tx.subscribe();
        let metrics_ref = Arc::clone(&metrics);
        let bind_address = config.metrics.bind_address.clone();
        background.push(tokio::spawn(async move {
            if let Err(e) = metrics_ref.serve(bind_address, metrics_shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }));

        let health_shutdown = shutdown_tx.subscribe();
        let health_server = HealthServer::new(Arc::clone(&health_state), config.metrics.health_port);
        background.push(tokio::spawn(async move {
            if let Err(e) = health_server.run(health_shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }));
    }

    // ── 7. SIGINT → broadcast shutdown ──────────────────────
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("SIGINT received, initiating graceful shutdown");
            let _ = signal_tx.send(());
        }
    });

    let health_store: Arc<dyn EventStore> = Arc::clone(&store) as Arc<dyn EventStore>;
    let scheduler = Scheduler::new(config.monitor.poll_interval())
        .with_metrics(Arc::clone(&metrics))
        .with_health(HealthRefresher::new(
            Arc::clone(&health_state),
            Arc::clone(&breaker),
            health_store,
        ));

    // ── 8. Run the monitor for the configured mode ──────────
    let totals = match config.monitor.mode {
        MonitorMode::Balances => {
            let mut monitor = BalanceMonitor::new(
                Arc::clone(&rpc),
                Arc::clone(&store),
                Arc::clone(&watch_set),
                config.monitor.epsilon,
            )
            .with_metrics(Arc::clone(&metrics));
            monitor.rehydrate().await.context("Failed to rehydrate balances")?;
            scheduler.run(&mut monitor, shutdown_tx.subscribe()).await
        }
        MonitorMode::TransactionPolling => {
            let mut monitor = transaction_monitor(&config, &rpc, &store, &watch_set, &metrics).await?;
            scheduler.run(&mut monitor, shutdown_tx.subscribe()).await
        }
        MonitorMode::Subscription => {
            let mut monitor = transaction_monitor(&config, &rpc, &store, &watch_set, &metrics).await?;

            let feed = Arc::new(LogsSubscriptionFeed::new(
                config.rpc.ws_url(),
                config.asset.token_program_id.clone(),
                config.rpc.commitment.clone(),
            ));
            let notices = feed.subscribe();
            let feed_shutdown = shutdown_tx.subscribe();
            let feed_ref = Arc::clone(&feed);
            background.push(tokio::spawn(async move {
                if let Err(e) = feed_ref.run(feed_shutdown).await {
                    error!(error = %e, "Logs feed task failed");
                }
            }));

            scheduler
                .run_subscription(&mut monitor, notices, shutdown_tx.subscribe())
                .await
        }
    };

    log_final_stats(&totals);

    // Make sure every task saw the signal, then give them time to drain.
    let _ = shutdown_tx.send(());
    for handle in background {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Build the raw client and wrap it in gate + breaker + retry.
fn build_rpc(config: &AppConfig, breaker: Arc<CircuitBreaker>, metrics: Arc<MonitorMetrics>) -> Result<Rpc> {
    let client = SolanaRpcClient::new(SolanaRpcConfig {
        http_url: config.rpc.http_url.clone(),
        mint: config.asset.mint.clone(),
        commitment: config.rpc.commitment.clone(),
        timeout: config.rpc.timeout(),
    })?;

    let limits = &config.rate_limits;
    let gate = RequestGate::new(Duration::from_millis(limits.min_spacing_ms));
    let retry = RetryPolicy::new(limits.max_retries, Duration::from_millis(limits.initial_retry_delay_ms))
        .with_rate_limit_ceiling(Duration::from_millis(limits.rate_limit_backoff_ceiling_ms));

    Ok(ResilientRpc::new(client, gate, retry, breaker).with_metrics(metrics))
}

/// Transaction monitor with a ledger seeded from the store.
async fn transaction_monitor(
    config: &AppConfig,
    rpc: &Arc<Rpc>,
    store: &Arc<JsonlEventStore>,
    watch_set: &Arc<WatchSet>,
    metrics: &Arc<MonitorMetrics>,
) -> Result<TransactionMonitor<Rpc, JsonlEventStore>> {
    let classifier = TransactionClassifier::new(
        config.asset.mint.clone(),
        WatchSet::clone(watch_set),
        VenueTable::new(config.venues.clone()),
    );
    let limits = PollingLimits {
        signatures_per_address: config.monitor.signatures_per_address,
        max_signatures_per_cycle: config.monitor.max_signatures_per_cycle,
    };

    let mut monitor = TransactionMonitor::new(
        Arc::clone(rpc),
        Arc::clone(store),
        classifier,
        DedupLedger::new(config.monitor.dedup_capacity),
        limits,
    )
    .with_metrics(Arc::clone(metrics));
    monitor.seed_ledger().await.context("Failed to seed dedup ledger")?;
    Ok(monitor)
}

fn log_final_stats(totals: &CycleReport) {
    info!(
        mode = %totals.mode,
        checked = totals.checked,
        succeeded = totals.succeeded,
        skipped = totals.skipped,
        errors = totals.errors,
        events = totals.events,
        duplicates = totals.duplicates,
        "Final monitor statistics"
    );
}
