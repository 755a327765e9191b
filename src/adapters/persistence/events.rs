//! Event Log - Append-only JSONL Change and Transaction Records
//!
//! Balance change events go to daily files `balance_changes/YYYY-MM-DD.jsonl`
//! (partitioned by event timestamp). Transaction records go to a single
//! `transactions.jsonl`, guarded by an in-memory signature index rebuilt
//! at open, so a signature is written at most once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::domain::{BalanceChangeEvent, TransactionRecord};

/// Signatures already written, in write order.
#[derive(Debug, Default)]
struct SignatureIndex {
    set: HashSet<String>,
    order: Vec<String>,
}

/// Append-only JSONL event log.
pub struct EventLog {
    /// Directory for daily balance change files.
    changes_dir: PathBuf,
    /// Path to transactions.jsonl.
    transactions_path: PathBuf,
    /// Signature index; held across the append so inserts are atomic.
    signatures: Mutex<SignatureIndex>,
}

impl EventLog {
    /// Open the log in `data_dir`, rebuilding the signature index.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let changes_dir = data_dir.join("balance_changes");
        fs::create_dir_all(&changes_dir)
            .await
            .context("Failed to create balance_changes directory")?;

        let transactions_path = data_dir.join("transactions.jsonl");
        let mut index = SignatureIndex::default();
        for record in read_jsonl::<TransactionRecord>(&transactions_path).await? {
            if index.set.insert(record.signature.clone()) {
                index.order.push(record.signature);
            }
        }
        info!(signatures = index.order.len(), "Transaction signature index loaded");

        Ok(Self {
            changes_dir,
            transactions_path,
            signatures: Mutex::new(index),
        })
    }

    /// Append a balance change event to its day's file.
    #[instrument(skip(self, event), fields(address = %event.address, id = %event.id))]
    pub async fn append_change(&self, event: &BalanceChangeEvent) -> Result<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.changes_dir.join(format!("{date}.jsonl"));
        append_line(&path, event).await
    }

    /// Append `record` unless its signature is already stored.
    #[instrument(skip(self, record), fields(signature = %record.signature))]
    pub async fn insert_transaction_if_absent(&self, record: &TransactionRecord) -> Result<bool> {
        let mut index = self.signatures.lock().await;
        if index.set.contains(&record.signature) {
            return Ok(false);
        }

        append_line(&self.transactions_path, record).await?;
        index.set.insert(record.signature.clone());
        index.order.push(record.signature.clone());
        Ok(true)
    }

    /// Load all balance change events, oldest first.
    #[instrument(skip(self))]
    pub async fn load_changes(&self) -> Result<Vec<BalanceChangeEvent>> {
        let mut events = Vec::new();
        let mut entries = fs::read_dir(&self.changes_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                events.extend(read_jsonl::<BalanceChangeEvent>(&path).await?);
            }
        }

        events.sort_by_key(|e| e.timestamp);
        info!(count = events.len(), "Loaded balance change events");
        Ok(events)
    }

    /// Load all transaction records in write order.
    pub async fn load_transactions(&self) -> Result<Vec<TransactionRecord>> {
        read_jsonl(&self.transactions_path).await
    }

    /// Stored signatures in write order.
    pub async fn known_signatures(&self) -> Vec<String> {
        self.signatures.lock().await.order.clone()
    }

    /// Check if the change directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.changes_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}

async fn append_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_string(value).context("Failed to serialize record")?;
    json.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    file.write_all(json.as_bytes())
        .await
        .context("Failed to write record")?;
    file.flush().await.context("Failed to flush record")?;

    Ok(())
}

/// Read a JSONL file, skipping blank and malformed lines. Missing file is empty.
async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "Skipping malformed record"
                );
            }
        }
    }
    Ok(records)
}
