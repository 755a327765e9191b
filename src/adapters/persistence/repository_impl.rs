//! Event Store Implementation - Concrete Adapter for the EventStore Port
//!
//! Wraps `BalanceSnapshotStore` (atomic JSON latest-balance table) and
//! `EventLog` (append-only JSONL files) into a single struct that
//! implements `EventStore` from `crate::ports::event_store`.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use super::balances::BalanceSnapshotStore;
use super::events::EventLog;
use crate::domain::{BalanceChangeEvent, BalanceRecord, TransactionRecord};
use crate::ports::EventStore;

/// File-backed event store.
pub struct JsonlEventStore {
    /// Latest balance per address.
    balances: BalanceSnapshotStore,
    /// Change events and transaction records.
    events: EventLog,
}

impl JsonlEventStore {
    /// Open (or create) a store rooted at `data_dir`.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let balances = BalanceSnapshotStore::open(dir).await?;
        let events = EventLog::open(dir).await?;
        Ok(Self { balances, events })
    }
}

#[async_trait]
impl EventStore for JsonlEventStore {
    async fn upsert_balance(&self, record: &BalanceRecord) -> Result<()> {
        self.balances.upsert(record).await
    }

    async fn append_balance_change(&self, event: &BalanceChangeEvent) -> Result<()> {
        self.events.append_change(event).await
    }

    async fn insert_transaction_if_absent(&self, record: &TransactionRecord) -> Result<bool> {
        self.events.insert_transaction_if_absent(record).await
    }

    async fn load_balances(&self) -> Result<Vec<BalanceRecord>> {
        Ok(self.balances.load_all().await)
    }

    async fn load_balance_changes(&self) -> Result<Vec<BalanceChangeEvent>> {
        self.events.load_changes().await
    }

    async fn load_transactions(&self) -> Result<Vec<TransactionRecord>> {
        self.events.load_transactions().await
    }

    async fn known_signatures(&self) -> Result<Vec<String>> {
        Ok(self.events.known_signatures().await)
    }

    async fn is_healthy(&self) -> bool {
        self.balances.is_healthy().await && self.events.is_healthy().await
    }
}
