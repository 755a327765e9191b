//! Chain RPC Port - Remote Query Interface
//!
//! The three remote operations the monitor needs from a Solana node.
//! Every implementation returns the typed `RpcError` so the resilience
//! stack can tell rate limits from other failures.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::ParsedTransaction;
use crate::error::RpcResult;

/// Trait for remote chain queries.
///
/// Both the raw HTTP client and the resilient decorator implement it,
/// so use cases never know whether they talk to one or the other.
#[async_trait]
pub trait ChainRpc: Send + Sync + 'static {
  /// Aggregate balance of the monitored mint held by `owner`, summed over
  /// all of its token accounts. An owner with no accounts holds zero.
  async fn token_balance(&self, owner: &str) -> RpcResult<Decimal>;

  /// Fetch and parse one transaction.
  ///
  /// `Ok(None)` means the node does not (yet) know the signature at the
  /// configured commitment.
  async fn parsed_transaction(&self, signature: &str) -> RpcResult<Option<ParsedTransaction>>;

  /// Most recent signatures touching `address`, newest first.
  async fn recent_signatures(&self, address: &str, limit: usize) -> RpcResult<Vec<String>>;
}
