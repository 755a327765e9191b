//! Resilience Tests - Gate, Retry and Breaker Composition
//!
//! Drives `ResilientRpc` over a scripted fake node on a paused tokio
//! clock, so spacing and backoff are asserted in virtual time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use tokenwise_monitor::adapters::rpc::{
    BreakerState, CircuitBreaker, RequestGate, ResilientRpc, RetryPolicy,
};
use tokenwise_monitor::domain::ParsedTransaction;
use tokenwise_monitor::error::{RpcError, RpcResult};
use tokenwise_monitor::ports::ChainRpc;

/// Fake node answering `token_balance` from a script.
///
/// Once the script runs dry every call succeeds with `fallback`.
struct ScriptedNode {
    script: Mutex<VecDeque<RpcResult<Decimal>>>,
    fallback: Decimal,
    calls: AtomicU32,
    starts: Mutex<Vec<Instant>>,
}

impl ScriptedNode {
    fn new(script: Vec<RpcResult<Decimal>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: dec!(1),
            calls: AtomicU32::new(0),
            starts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChainRpc for ScriptedNode {
    async fn token_balance(&self, _owner: &str) -> RpcResult<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.starts.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }

    async fn parsed_transaction(&self, _signature: &str) -> RpcResult<Option<ParsedTransaction>> {
        Ok(None)
    }

    async fn recent_signatures(&self, _address: &str, _limit: usize) -> RpcResult<Vec<String>> {
        Ok(vec![])
    }
}

fn rate_limited() -> RpcResult<Decimal> {
    Err(RpcError::RateLimited("429 Too Many Requests".to_string()))
}

fn resilient(
    node: ScriptedNode,
    spacing: Duration,
    attempts: u32,
    breaker: Arc<CircuitBreaker>,
) -> ResilientRpc<ScriptedNode> {
    ResilientRpc::new(
        node,
        RequestGate::new(spacing),
        RetryPolicy::new(attempts, Duration::from_secs(1)),
        breaker,
    )
}

#[tokio::test(start_paused = true)]
async fn test_gate_spaces_concurrent_callers() {
    let rpc = Arc::new(resilient(
        ScriptedNode::new(vec![]),
        Duration::from_secs(8),
        3,
        Arc::new(CircuitBreaker::default()),
    ));

    let started = Instant::now();
    let handles: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|owner| {
            let rpc = Arc::clone(&rpc);
            tokio::spawn(async move { rpc.token_balance(owner).await })
        })
        .collect();
    for handle in handles {
        let balance = assert_ok!(handle.await.unwrap());
        assert_eq!(balance, dec!(1));
    }

    let mut starts = rpc.inner().starts.lock().unwrap().clone();
    starts.sort();
    assert_eq!(starts.len(), 3);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(8));
    }
    assert!(started.elapsed() >= Duration::from_secs(16));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_is_retried_with_doubling_backoff() {
    let rpc = resilient(
        ScriptedNode::new(vec![rate_limited(), rate_limited(), Ok(dec!(7))]),
        Duration::ZERO,
        3,
        Arc::new(CircuitBreaker::default()),
    );

    let started = Instant::now();
    assert_eq!(rpc.token_balance("A").await.unwrap(), dec!(7));

    assert_eq!(rpc.inner().calls.load(Ordering::SeqCst), 3);
    // 1s initial: waits of 2s then 4s.
    assert!(started.elapsed() >= Duration::from_secs(6));
    // Success resets the streak.
    assert_eq!(rpc.breaker().failure_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_report_the_last_error() {
    let rpc = resilient(
        ScriptedNode::new(vec![
            Err(RpcError::Transient("timeout".to_string())),
            Err(RpcError::Transient("timeout".to_string())),
        ]),
        Duration::ZERO,
        2,
        Arc::new(CircuitBreaker::default()),
    );

    match rpc.token_balance("A").await {
        Err(RpcError::ExhaustedRetries { attempts, last }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, RpcError::Transient(_)));
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
    // Transient failures never count towards the breaker.
    assert_eq!(rpc.breaker().failure_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_request_is_not_retried() {
    let rpc = resilient(
        ScriptedNode::new(vec![Err(RpcError::Rejected {
            code: -32602,
            message: "Invalid param".to_string(),
        })]),
        Duration::ZERO,
        3,
        Arc::new(CircuitBreaker::default()),
    );

    assert!(matches!(
        rpc.token_balance("A").await,
        Err(RpcError::Rejected { code: -32602, .. })
    ));
    assert_eq!(rpc.inner().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_breaker_makes_no_network_attempt() {
    let breaker = Arc::new(CircuitBreaker::new(3, Duration::from_secs(30)));
    let rpc = resilient(
        ScriptedNode::new(vec![rate_limited(), rate_limited(), rate_limited()]),
        Duration::ZERO,
        5,
        Arc::clone(&breaker),
    );

    // Three rate limits open the breaker; the fourth attempt is refused
    // before reaching the node.
    let result = rpc.token_balance("A").await;
    assert!(matches!(result, Err(RpcError::CircuitOpen { .. })));
    assert_eq!(rpc.inner().calls.load(Ordering::SeqCst), 3);
    assert_eq!(breaker.state().await, BreakerState::Open);

    // Still open for a fresh call inside the cooldown.
    assert!(matches!(
        rpc.token_balance("A").await,
        Err(RpcError::CircuitOpen { .. })
    ));
    assert_eq!(rpc.inner().calls.load(Ordering::SeqCst), 3);

    // After the cooldown the next call goes through and closes it.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(rpc.token_balance("A").await.unwrap(), dec!(1));
    assert_eq!(rpc.inner().calls.load(Ordering::SeqCst), 4);
    assert_eq!(breaker.state().await, BreakerState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_is_shared_across_methods() {
    let breaker = Arc::new(CircuitBreaker::new(1, Duration::from_secs(30)));
    let rpc = resilient(
        ScriptedNode::new(vec![rate_limited()]),
        Duration::ZERO,
        1,
        Arc::clone(&breaker),
    );

    assert_err!(rpc.token_balance("A").await);
    assert!(matches!(
        rpc.recent_signatures("A", 5).await,
        Err(RpcError::CircuitOpen { .. })
    ));
}
