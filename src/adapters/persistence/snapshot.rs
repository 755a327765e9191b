//! Watch Set Snapshot Loader
//!
//! Reads the holder snapshot produced out of band (`topHolders.json`):
//! a JSON array of `{ address, owner, balance }` entries where `address`
//! is the token account and `owner` the wallet. The wallet is what gets
//! watched; entries without an owner fall back to `address`.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{WatchEntry, WatchSet};

/// One raw snapshot entry.
#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    balance: Option<Decimal>,
}

/// Parse a snapshot document into a watch set.
///
/// Fails if the document is not a JSON array or yields no address.
pub fn parse_watch_set(json: &str) -> Result<WatchSet> {
    let raw: Vec<SnapshotEntry> =
        serde_json::from_str(json).context("Watch snapshot is not a JSON array of holders")?;
    let total = raw.len();

    let entries = raw.into_iter().filter_map(|entry| {
        let address = entry.owner.or(entry.address)?;
        Some(WatchEntry {
            address,
            reference_balance: entry.balance,
        })
    });
    let set = WatchSet::new(entries);

    ensure!(!set.is_empty(), "Watch snapshot contains no addresses");
    if set.len() < total {
        warn!(
            entries = total,
            unique = set.len(),
            "Watch snapshot had duplicate or empty entries"
        );
    }
    Ok(set)
}

/// Load the watch set from a snapshot file. Any failure here is fatal.
pub fn load_watch_set(path: &Path) -> Result<WatchSet> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read watch snapshot: {}", path.display()))?;
    let set = parse_watch_set(&json)?;
    info!(path = %path.display(), addresses = set.len(), "Watch set loaded");
    Ok(set)
}
