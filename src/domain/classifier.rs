//! Transaction classifier - direction and venue from a parsed transaction.
//!
//! Token balances are summed per owner for the monitored mint, before and
//! after the transaction. Every watched owner present in the post set gets
//! `delta = post - pre` (a missing pre entry counts as zero); zero deltas are
//! dropped. The venue is attributed once per transaction from its top-level
//! instruction programs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::{
    Direction, ParsedTransaction, TokenBalanceEntry, TransactionRecord, WatchSet,
};
use super::venue::VenueTable;

/// Classifies parsed transactions into `TransactionRecord`s.
#[derive(Debug, Clone)]
pub struct TransactionClassifier {
    mint: String,
    watch_set: WatchSet,
    venues: VenueTable,
}

impl TransactionClassifier {
    pub fn new(mint: impl Into<String>, watch_set: WatchSet, venues: VenueTable) -> Self {
        Self {
            mint: mint.into(),
            watch_set,
            venues,
        }
    }

    pub fn mint(&self) -> &str {
        &self.mint
    }

    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    pub fn venues(&self) -> &VenueTable {
        &self.venues
    }

    /// Classify `tx`, one record per watched owner with a non-zero delta.
    ///
    /// `now` stamps the records when the transaction has no block time.
    /// Records come out ordered by owner address.
    pub fn classify(&self, tx: &ParsedTransaction, now: DateTime<Utc>) -> Vec<TransactionRecord> {
        if tx.failed {
            return Vec::new();
        }

        let post = self.sum_by_owner(&tx.post_token_balances);
        if post.is_empty() {
            return Vec::new();
        }
        let pre = self.sum_by_owner(&tx.pre_token_balances);

        let timestamp = tx.block_time.unwrap_or(now);
        let venue = self
            .venues
            .attribute(tx.instruction_programs.iter().map(String::as_str));

        post.into_iter()
            .filter_map(|(owner, post_amount)| {
                let pre_amount = pre.get(owner).copied().unwrap_or(Decimal::ZERO);
                let delta = post_amount - pre_amount;
                let direction = Direction::from_delta(delta)?;
                Some(TransactionRecord {
                    signature: tx.signature.clone(),
                    timestamp,
                    address: owner.to_string(),
                    amount: delta.abs(),
                    direction,
                    venue: venue.clone(),
                })
            })
            .collect()
    }

    /// Sum balances of watched owners for the monitored mint.
    fn sum_by_owner<'a>(&self, entries: &'a [TokenBalanceEntry]) -> BTreeMap<&'a str, Decimal> {
        let mut sums = BTreeMap::new();
        for entry in entries {
            if entry.mint != self.mint {
                continue;
            }
            let Some(owner) = entry.owner.as_deref() else {
                continue;
            };
            if !self.watch_set.contains(owner) {
                continue;
            }
            *sums.entry(owner).or_insert(Decimal::ZERO) += entry.amount;
        }
        sums
    }
}
