//! Core monitoring domain types.
//!
//! Defines the business entities: watched addresses, balance records,
//! change events, transaction records, and the parsed transaction view
//! the classifier works on.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────

/// Account address whose asset balance is monitored (base58 owner key).
pub type WatchedAddress = String;

/// Transaction signature, the natural key of a `TransactionRecord`.
pub type Signature = String;

/// On-chain program identifier.
pub type ProgramId = String;

// ────────────────────────────────────────────
// Watch set
// ────────────────────────────────────────────

/// One entry of the startup snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    /// Owner address to watch.
    pub address: WatchedAddress,
    /// Balance reported by the snapshot, if any.
    pub reference_balance: Option<Decimal>,
}

/// Immutable, ordered, duplicate-free set of watched addresses.
///
/// Built once from the snapshot; the core never mutates it.
#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    entries: Vec<WatchEntry>,
    index: HashSet<WatchedAddress>,
}

impl WatchSet {
    /// Build a watch set, keeping the first occurrence of each address.
    pub fn new(entries: impl IntoIterator<Item = WatchEntry>) -> Self {
        let mut set = Self::default();
        for entry in entries {
            if entry.address.is_empty() {
                continue;
            }
            if set.index.insert(entry.address.clone()) {
                set.entries.push(entry);
            }
        }
        set
    }

    /// Whether `address` is watched.
    pub fn contains(&self, address: &str) -> bool {
        self.index.contains(address)
    }

    /// Entries in snapshot order.
    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    /// Addresses in snapshot order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.address.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ────────────────────────────────────────────
// Classification enums
// ────────────────────────────────────────────

/// Direction of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Balance increased.
    Acquire,
    /// Balance decreased.
    Dispose,
}

impl Direction {
    /// Direction for a non-zero delta; `None` when `delta == 0`.
    pub fn from_delta(delta: Decimal) -> Option<Self> {
        if delta > Decimal::ZERO {
            Some(Self::Acquire)
        } else if delta < Decimal::ZERO {
            Some(Self::Dispose)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::Dispose => "dispose",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trading venue a transaction is attributed to.
///
/// Serialized as the bare venue name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Venue {
    /// Matched a program id in the venue table.
    Known(String),
    /// No instruction matched.
    Unknown,
}

impl Venue {
    pub fn name(&self) -> &str {
        match self {
            Self::Known(name) => name,
            Self::Unknown => "Unknown",
        }
    }
}

impl From<String> for Venue {
    fn from(name: String) -> Self {
        if name == "Unknown" {
            Self::Unknown
        } else {
            Self::Known(name)
        }
    }
}

impl From<Venue> for String {
    fn from(venue: Venue) -> Self {
        match venue {
            Venue::Known(name) => name,
            Venue::Unknown => "Unknown".to_string(),
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ────────────────────────────────────────────
// Persisted records
// ────────────────────────────────────────────

/// Latest known balance of one watched address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub address: WatchedAddress,
    pub balance: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// A balance change above the noise threshold. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceChangeEvent {
    /// Unique event identifier.
    pub id: Uuid,
    pub address: WatchedAddress,
    pub old_balance: Decimal,
    pub new_balance: Decimal,
    /// Signed `new_balance - old_balance`.
    pub delta: Decimal,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}

impl BalanceChangeEvent {
    /// Magnitude of the change.
    pub fn amount(&self) -> Decimal {
        self.delta.abs()
    }
}

/// A classified transaction affecting a watched address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: Signature,
    pub timestamp: DateTime<Utc>,
    pub address: WatchedAddress,
    /// Magnitude of the balance change; the sign lives in `direction`.
    pub amount: Decimal,
    pub direction: Direction,
    pub venue: Venue,
}

// ────────────────────────────────────────────
// Parsed transaction view
// ────────────────────────────────────────────

/// Token balance of one account before or after a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalanceEntry {
    /// Index of the token account in the transaction's account keys.
    pub account_index: u32,
    pub mint: String,
    /// Owner of the token account, when the node reports it.
    pub owner: Option<String>,
    /// UI-scaled amount.
    pub amount: Decimal,
}

/// The slice of a parsed transaction the classifier needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub signature: Signature,
    /// Block time, when the node knows it.
    pub block_time: Option<DateTime<Utc>>,
    /// Program ids of the top-level instructions, in order.
    pub instruction_programs: Vec<ProgramId>,
    pub pre_token_balances: Vec<TokenBalanceEntry>,
    pub post_token_balances: Vec<TokenBalanceEntry>,
    /// Whether the transaction failed on-chain.
    pub failed: bool,
}
