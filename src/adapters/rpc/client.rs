//! Solana RPC HTTP Client - Raw JSON-RPC Transport
//!
//! Plain reqwest client for the three queries the monitor needs. It makes
//! exactly one HTTP request per call and classifies failures into
//! `RpcError`; spacing, retries and circuit breaking live in
//! `ResilientRpc`, which wraps this client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::types::{
  EncodedTransaction, KeyedTokenAccount, RpcRequest, RpcResponse, SignatureInfo, WithContext,
};
use crate::domain::ParsedTransaction;
use crate::error::{RpcError, RpcResult};
use crate::ports::ChainRpc;

/// Configuration for the Solana RPC client.
#[derive(Debug, Clone)]
pub struct SolanaRpcConfig {
  /// HTTP JSON-RPC endpoint.
  pub http_url: String,
  /// Mint of the monitored asset.
  pub mint: String,
  /// Commitment level for every query.
  pub commitment: String,
  /// Per-request timeout.
  pub timeout: Duration,
}

impl Default for SolanaRpcConfig {
  fn default() -> Self {
    Self {
      http_url: "https://api.mainnet-beta.solana.com".to_string(),
      mint: String::new(),
      commitment: "confirmed".to_string(),
      timeout: Duration::from_secs(30),
    }
  }
}

/// JSON-RPC client for a Solana node.
pub struct SolanaRpcClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: SolanaRpcConfig,
  /// JSON-RPC request id counter.
  next_id: AtomicU64,
}

impl SolanaRpcClient {
  /// Create a new RPC client.
  pub fn new(config: SolanaRpcConfig) -> anyhow::Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2)
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self {
      http,
      config,
      next_id: AtomicU64::new(1),
    })
  }

  pub fn config(&self) -> &SolanaRpcConfig {
    &self.config
  }

  /// Send one JSON-RPC request and decode its `result`.
  ///
  /// A `null` result is returned as `None`.
  async fn request<T: DeserializeOwned>(
    &self,
    method: &str,
    params: serde_json::Value,
  ) -> RpcResult<Option<T>> {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let body = RpcRequest::new(id, method, params);

    let response = self.http.post(&self.config.http_url).json(&body).send().await?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      return Err(RpcError::from_status(status.as_u16(), &text));
    }

    let bytes = response.bytes().await?;
    let envelope: RpcResponse<T> = serde_json::from_slice(&bytes)?;

    if let Some(err) = envelope.error {
      return Err(RpcError::from_rpc_error(err.code, &err.message));
    }

    debug!(method, id, "RPC call succeeded");
    Ok(envelope.result)
  }
}

#[async_trait]
impl ChainRpc for SolanaRpcClient {
  #[instrument(skip(self))]
  async fn token_balance(&self, owner: &str) -> RpcResult<Decimal> {
    let params = json!([
      owner,
      { "mint": self.config.mint },
      { "encoding": "jsonParsed", "commitment": self.config.commitment }
    ]);

    let accounts: WithContext<Vec<KeyedTokenAccount>> = self
      .request("getTokenAccountsByOwner", params)
      .await?
      .ok_or_else(|| RpcError::Decode("getTokenAccountsByOwner returned null".into()))?;

    let mut total = Decimal::ZERO;
    for keyed in &accounts.value {
      let info = &keyed.account.data.parsed.info;
      if info.mint != self.config.mint {
        continue;
      }
      total += info.token_amount.to_decimal()?;
    }

    debug!(owner, accounts = accounts.value.len(), balance = %total, "Token balance fetched");
    Ok(total)
  }

  #[instrument(skip(self))]
  async fn parsed_transaction(&self, signature: &str) -> RpcResult<Option<ParsedTransaction>> {
    let params = json!([
      signature,
      {
        "encoding": "jsonParsed",
        "commitment": self.config.commitment,
        "maxSupportedTransactionVersion": 0
      }
    ]);

    let tx: Option<EncodedTransaction> = self.request("getTransaction", params).await?;
    tx.map(|tx| tx.into_parsed(signature)).transpose()
  }

  #[instrument(skip(self))]
  async fn recent_signatures(&self, address: &str, limit: usize) -> RpcResult<Vec<String>> {
    let params = json!([
      address,
      { "limit": limit, "commitment": self.config.commitment }
    ]);

    let infos: Vec<SignatureInfo> = self
      .request("getSignaturesForAddress", params)
      .await?
      .unwrap_or_default();

    Ok(infos.into_iter().map(|info| info.signature).collect())
  }
}
