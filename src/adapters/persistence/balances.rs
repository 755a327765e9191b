//! Balance Snapshot Store - Atomic JSON Latest-Balance Table
//!
//! Keeps the latest `BalanceRecord` per address in `balances.json`.
//! Every upsert rewrites the file atomically (write to tmp file, then
//! rename), so the file is always either the old or the new version.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::domain::BalanceRecord;

/// Latest-wins balance table backed by an atomic JSON file.
pub struct BalanceSnapshotStore {
    /// Path to balances.json.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
    /// In-memory copy of the table, keyed by address.
    records: Mutex<BTreeMap<String, BalanceRecord>>,
}

impl BalanceSnapshotStore {
    /// Open the store in `data_dir`, loading any existing snapshot.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;

        let path = data_dir.join("balances.json");
        let records = if fs::try_exists(&path).await.unwrap_or(false) {
            let json = fs::read_to_string(&path)
                .await
                .context("Failed to read balances file")?;
            let list: Vec<BalanceRecord> =
                serde_json::from_str(&json).context("Failed to parse balances JSON")?;
            list.into_iter().map(|r| (r.address.clone(), r)).collect()
        } else {
            info!("No balances file found, starting fresh");
            BTreeMap::new()
        };

        Ok(Self {
            tmp_path: data_dir.join("balances.json.tmp"),
            path,
            records: Mutex::new(records),
        })
    }

    /// Insert or overwrite the record for `record.address` and persist.
    #[instrument(skip(self, record), fields(address = %record.address))]
    pub async fn upsert(&self, record: &BalanceRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        records.insert(record.address.clone(), record.clone());

        let list: Vec<&BalanceRecord> = records.values().collect();
        let json = serde_json::to_string_pretty(&list).context("Failed to serialize balances")?;

        // Write to tmp file
        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp balances file")?;

        // Atomic rename
        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename balances file")?;

        debug!(records = list.len(), "Balance snapshot saved");
        Ok(())
    }

    /// All stored records, ordered by address.
    pub async fn load_all(&self) -> Vec<BalanceRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Check that the data directory is still writable.
    pub async fn is_healthy(&self) -> bool {
        let Some(dir) = self.path.parent() else {
            return false;
        };
        fs::metadata(dir).await.is_ok_and(|m| m.is_dir())
    }
}
