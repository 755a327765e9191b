//! Balance tracker - per-address `Unseen -> Tracked` state machine.
//!
//! Each watched address starts `Unseen`. The first successful poll sets
//! the baseline without emitting anything. Afterwards every poll computes
//! `delta = new - stored`; when `|delta| > epsilon` a `BalanceChangeEvent`
//! is produced. The stored record is refreshed on every successful poll,
//! change or not. Failed polls never reach the tracker, so a missing
//! balance is never mistaken for zero.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::types::{BalanceChangeEvent, BalanceRecord, Direction};

/// Default noise threshold in UI token units.
pub const DEFAULT_EPSILON: Decimal = dec!(0.001);

/// State of a single watched address.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressState {
    /// No balance observed yet.
    Unseen,
    /// Baseline established.
    Tracked(BalanceRecord),
}

/// Outcome of feeding one successful poll to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// First balance for the address; no event.
    Baseline(BalanceRecord),
    /// Change within epsilon; record refreshed, no event.
    Unchanged(BalanceRecord),
    /// Change above epsilon.
    Changed {
        record: BalanceRecord,
        event: BalanceChangeEvent,
    },
}

impl Observation {
    /// The refreshed record to persist.
    pub fn record(&self) -> &BalanceRecord {
        match self {
            Self::Baseline(record) | Self::Unchanged(record) => record,
            Self::Changed { record, .. } => record,
        }
    }

    pub fn event(&self) -> Option<&BalanceChangeEvent> {
        match self {
            Self::Changed { event, .. } => Some(event),
            _ => None,
        }
    }
}

/// Tracks the last known balance of every watched address.
#[derive(Debug, Clone)]
pub struct BalanceTracker {
    epsilon: Decimal,
    states: HashMap<String, BalanceRecord>,
}

impl BalanceTracker {
    /// Create a tracker. Negative epsilons are treated as their magnitude.
    pub fn new(epsilon: Decimal) -> Self {
        Self {
            epsilon: epsilon.abs(),
            states: HashMap::new(),
        }
    }

    /// Rehydrate from persisted records so a restart does not re-baseline.
    pub fn with_records(epsilon: Decimal, records: impl IntoIterator<Item = BalanceRecord>) -> Self {
        let mut tracker = Self::new(epsilon);
        for record in records {
            tracker.states.insert(record.address.clone(), record);
        }
        tracker
    }

    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    /// Current state of `address`.
    pub fn state(&self, address: &str) -> AddressState {
        self.states
            .get(address)
            .cloned()
            .map_or(AddressState::Unseen, AddressState::Tracked)
    }

    /// Stored balance of `address`, if tracked.
    pub fn balance(&self, address: &str) -> Option<Decimal> {
        self.states.get(address).map(|r| r.balance)
    }

    /// Number of tracked addresses.
    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    /// Feed a successful poll result.
    ///
    /// `last_updated` never moves backwards: if `now` is earlier than the
    /// stored timestamp, the stored timestamp is kept.
    pub fn observe(&mut self, address: &str, balance: Decimal, now: DateTime<Utc>) -> Observation {
        let Some(previous) = self.states.get(address).cloned() else {
            let record = BalanceRecord {
                address: address.to_string(),
                balance,
                last_updated: now,
            };
            self.states.insert(address.to_string(), record.clone());
            return Observation::Baseline(record);
        };

        let record = BalanceRecord {
            address: address.to_string(),
            balance,
            last_updated: now.max(previous.last_updated),
        };
        self.states.insert(address.to_string(), record.clone());

        let delta = balance - previous.balance;
        if delta.abs() <= self.epsilon {
            return Observation::Unchanged(record);
        }

        // |delta| > epsilon >= 0, so the delta is non-zero.
        let direction = Direction::from_delta(delta).unwrap_or(Direction::Dispose);
        let event = BalanceChangeEvent {
            id: Uuid::new_v4(),
            address: address.to_string(),
            old_balance: previous.balance,
            new_balance: balance,
            delta,
            direction,
            timestamp: record.last_updated,
        };

        Observation::Changed { record, event }
    }
}

impl Default for BalanceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_first_poll_is_baseline() {
        let mut tracker = BalanceTracker::default();
        assert_eq!(tracker.state("A"), AddressState::Unseen);

        let obs = tracker.observe("A", dec!(100), t(0));
        assert!(matches!(obs, Observation::Baseline(_)));
        assert!(obs.event().is_none());
        assert_eq!(tracker.balance("A"), Some(dec!(100)));
    }

    #[test]
    fn test_acquire_then_dispose_scenario() {
        let mut tracker = BalanceTracker::default();
        tracker.observe("A", dec!(100), t(0));

        let obs = tracker.observe("A", dec!(150), t(60));
        let event = obs.event().expect("acquire event");
        assert_eq!(event.direction, Direction::Acquire);
        assert_eq!(event.delta, dec!(50));
        assert_eq!(event.old_balance, dec!(100));
        assert_eq!(event.new_balance, dec!(150));

        let obs = tracker.observe("A", dec!(150), t(120));
        assert!(matches!(obs, Observation::Unchanged(_)));

        let obs = tracker.observe("A", dec!(100), t(180));
        let event = obs.event().expect("dispose event");
        assert_eq!(event.direction, Direction::Dispose);
        assert_eq!(event.delta, dec!(-50));
        assert_eq!(event.amount(), dec!(50));
    }

    #[test]
    fn test_noise_within_epsilon_refreshes_without_event() {
        let mut tracker = BalanceTracker::new(dec!(0.001));
        tracker.observe("A", dec!(10), t(0));

        let obs = tracker.observe("A", dec!(10.001), t(10));
        assert!(obs.event().is_none());
        assert_eq!(obs.record().last_updated, t(10));
        assert_eq!(tracker.balance("A"), Some(dec!(10.001)));

        let obs = tracker.observe("A", dec!(10.0021), t(20));
        assert!(obs.event().is_some());
    }

    #[test]
    fn test_last_updated_never_regresses() {
        let mut tracker = BalanceTracker::default();
        tracker.observe("A", dec!(1), t(100));
        let obs = tracker.observe("A", dec!(1), t(100) - Duration::seconds(30));
        assert_eq!(obs.record().last_updated, t(100));
    }

    #[test]
    fn test_rehydrated_address_skips_baseline() {
        let stored = BalanceRecord {
            address: "A".into(),
            balance: dec!(5),
            last_updated: t(0),
        };
        let mut tracker = BalanceTracker::with_records(DEFAULT_EPSILON, [stored]);
        let obs = tracker.observe("A", dec!(7), t(60));
        assert_eq!(obs.event().map(|e| e.delta), Some(dec!(2)));
    }

    #[test]
    fn test_addresses_are_independent() {
        let mut tracker = BalanceTracker::default();
        tracker.observe("A", dec!(1), t(0));
        let obs = tracker.observe("B", dec!(1000), t(0));
        assert!(matches!(obs, Observation::Baseline(_)));
        assert_eq!(tracker.tracked_count(), 2);
    }
}
