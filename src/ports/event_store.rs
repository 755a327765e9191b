//! Event Store Port - Durable Monitor Output
//!
//! Three logical tables: the latest balance per address (latest wins),
//! balance change events (append-only) and transaction records
//! (append-only, unique by signature).

use async_trait::async_trait;

use crate::domain::{BalanceChangeEvent, BalanceRecord, TransactionRecord};

/// Trait for persistence providers.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
  /// Insert or overwrite the balance snapshot for `record.address`.
  async fn upsert_balance(&self, record: &BalanceRecord) -> anyhow::Result<()>;

  /// Append a balance change event.
  async fn append_balance_change(&self, event: &BalanceChangeEvent) -> anyhow::Result<()>;

  /// Insert a transaction record unless its signature is already stored.
  ///
  /// Returns `true` if the record was written, `false` if it was a
  /// duplicate (a no-op, not an error).
  async fn insert_transaction_if_absent(&self, record: &TransactionRecord) -> anyhow::Result<bool>;

  /// Latest balance snapshot of every address.
  async fn load_balances(&self) -> anyhow::Result<Vec<BalanceRecord>>;

  /// All balance change events, oldest first.
  async fn load_balance_changes(&self) -> anyhow::Result<Vec<BalanceChangeEvent>>;

  /// All transaction records, oldest first.
  async fn load_transactions(&self) -> anyhow::Result<Vec<TransactionRecord>>;

  /// Stored signatures, oldest first.
  async fn known_signatures(&self) -> anyhow::Result<Vec<String>>;

  /// Check if the store is writable.
  async fn is_healthy(&self) -> bool;
}
