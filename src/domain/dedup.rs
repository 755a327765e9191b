//! Bounded dedup ledger of processed transaction signatures.
//!
//! Membership is exact. Capacity is enforced lazily: only when an insert
//! pushes the size past the cap is the oldest half evicted, in one batch.
//! Insertion order is tracked with a queue, so eviction removes the
//! least-recently-inserted signatures; re-recording a known signature does
//! not refresh its position (this is not an LRU).

use std::collections::{HashSet, VecDeque};

/// Default ledger capacity.
pub const DEFAULT_DEDUP_CAPACITY: usize = 10_000;

/// Bounded set of seen signatures with batched oldest-half eviction.
#[derive(Debug, Clone)]
pub struct DedupLedger {
    capacity: usize,
    seen: HashSet<String>,
    order: VecDeque<String>,
    evicted_total: u64,
}

impl DedupLedger {
    /// Create a ledger. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            seen: HashSet::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
            evicted_total: 0,
        }
    }

    /// Whether `signature` was already recorded.
    pub fn seen(&self, signature: &str) -> bool {
        self.seen.contains(signature)
    }

    /// Record a signature. Returns `false` if it was already present.
    pub fn record(&mut self, signature: &str) -> bool {
        if !self.seen.insert(signature.to_string()) {
            return false;
        }
        self.order.push_back(signature.to_string());

        if self.seen.len() > self.capacity {
            self.evict_oldest_half();
        }
        true
    }

    /// Seed from previously persisted signatures, oldest first.
    pub fn seed<I, S>(&mut self, signatures: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for sig in signatures {
            self.record(sig.as_ref());
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total signatures dropped by eviction since creation.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    fn evict_oldest_half(&mut self) {
        let to_evict = self.seen.len() / 2;
        for sig in self.order.drain(..to_evict) {
            self.seen.remove(&sig);
        }
        self.evicted_total += to_evict as u64;
        tracing::debug!(
            evicted = to_evict,
            remaining = self.seen.len(),
            "Dedup ledger evicted oldest half"
        );
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}
