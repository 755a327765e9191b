//! Resilient RPC - Retry, Breaker and Gate Around Any `ChainRpc`
//!
//! Every call flows RetryPolicy -> CircuitBreaker -> RequestGate -> inner.
//! Each retry attempt is admitted by the breaker first, so an open
//! breaker short-circuits without touching the gate or the network.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::breaker::CircuitBreaker;
use super::gate::RequestGate;
use super::retry::RetryPolicy;
use crate::adapters::metrics::MonitorMetrics;
use crate::domain::ParsedTransaction;
use crate::error::RpcResult;
use crate::ports::ChainRpc;

/// Decorator that makes any `ChainRpc` rate-limit safe.
pub struct ResilientRpc<R> {
  inner: R,
  gate: RequestGate,
  retry: RetryPolicy,
  breaker: Arc<CircuitBreaker>,
  metrics: Option<Arc<MonitorMetrics>>,
}

impl<R: ChainRpc> ResilientRpc<R> {
  pub fn new(inner: R, gate: RequestGate, retry: RetryPolicy, breaker: Arc<CircuitBreaker>) -> Self {
    Self {
      inner,
      gate,
      retry,
      breaker,
      metrics: None,
    }
  }

  /// Count every attempt in `metrics`.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MonitorMetrics>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Shared handle to the breaker, for health and metrics.
  pub fn breaker(&self) -> Arc<CircuitBreaker> {
    Arc::clone(&self.breaker)
  }

  pub fn inner(&self) -> &R {
    &self.inner
  }

  /// One attempt: breaker admission, then the gated call.
  async fn attempt<T, Fut>(&self, method: &str, call: Fut) -> RpcResult<T>
  where
    Fut: Future<Output = RpcResult<T>>,
  {
    if let Err(e) = self.breaker.admit().await {
      if let Some(metrics) = &self.metrics {
        metrics
          .rpc_attempts
          .with_label_values(&[method, e.kind()])
          .inc();
        metrics.set_breaker_open(true);
      }
      return Err(e);
    }

    let result = self.gate.submit(call).await;
    self.breaker.record(&result).await;

    if let Some(metrics) = &self.metrics {
      metrics.record_rpc_attempt(method, &result);
      metrics.set_breaker_open(self.breaker.is_open().await);
    }
    result
  }
}

#[async_trait]
impl<R: ChainRpc> ChainRpc for ResilientRpc<R> {
  async fn token_balance(&self, owner: &str) -> RpcResult<Decimal> {
    const METHOD: &str = "getTokenAccountsByOwner";
    let this = self;
    self
      .retry
      .execute(METHOD, move || {
        this.attempt(METHOD, this.inner.token_balance(owner))
      })
      .await
  }

  async fn parsed_transaction(&self, signature: &str) -> RpcResult<Option<ParsedTransaction>> {
    const METHOD: &str = "getTransaction";
    let this = self;
    self
      .retry
      .execute(METHOD, move || {
        this.attempt(METHOD, this.inner.parsed_transaction(signature))
      })
      .await
  }

  async fn recent_signatures(&self, address: &str, limit: usize) -> RpcResult<Vec<String>> {
    const METHOD: &str = "getSignaturesForAddress";
    let this = self;
    self
      .retry
      .execute(METHOD, move || {
        this.attempt(METHOD, this.inner.recent_signatures(address, limit))
      })
      .await
  }
}
