//! Health Check Server - Liveness and Readiness Probes
//!
//! `/live` answers as long as the process runs. `/ready` reports whether
//! the monitor can make progress: the event store must accept writes and
//! the RPC circuit breaker must be closed. Both flags, plus the time the
//! last cycle finished, are returned as JSON.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Readiness flags shared between the scheduler and the probe handler.
#[derive(Debug)]
pub struct HealthState {
    store_healthy: AtomicBool,
    breaker_open: AtomicBool,
    /// Unix seconds of the last finished cycle, 0 before the first one.
    last_cycle_unix: AtomicI64,
}

/// Body of the `/ready` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub store_healthy: bool,
    pub breaker_open: bool,
    pub last_cycle_unix: Option<i64>,
}

impl HealthState {
    /// Starts ready: store assumed writable, breaker closed.
    pub fn new() -> Self {
        Self {
            store_healthy: AtomicBool::new(true),
            breaker_open: AtomicBool::new(false),
            last_cycle_unix: AtomicI64::new(0),
        }
    }

    /// Record the flags observed after a cycle.
    pub fn update(&self, store_healthy: bool, breaker_open: bool) {
        self.store_healthy.store(store_healthy, Ordering::Relaxed);
        self.breaker_open.store(breaker_open, Ordering::Relaxed);
        self.last_cycle_unix
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().ready
    }

    pub fn snapshot(&self) -> Readiness {
        let store_healthy = self.store_healthy.load(Ordering::Relaxed);
        let breaker_open = self.breaker_open.load(Ordering::Relaxed);
        let last = self.last_cycle_unix.load(Ordering::Relaxed);
        Readiness {
            ready: store_healthy && !breaker_open,
            store_healthy,
            breaker_open,
            last_cycle_unix: (last > 0).then_some(last),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe server on `0.0.0.0:<port>`.
pub struct HealthServer {
    state: Arc<HealthState>,
    port: u16,
}

impl HealthServer {
    pub fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Serve probes until shutdown.
    #[instrument(skip(self, shutdown_rx), fields(port = self.port))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(|| async { "OK" }))
            .route("/ready", get(readiness))
            .with_state(self.state);

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;
        Ok(())
    }
}

async fn readiness(State(state): State<Arc<HealthState>>) -> (StatusCode, Json<Readiness>) {
    let body = state.snapshot();
    let status = if body.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
