//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that the tracker, classifier and dedup
//! ledger keep their invariants across random inputs.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use tokenwise_monitor::domain::{
    BalanceTracker, DedupLedger, Direction, Observation, ParsedTransaction, TokenBalanceEntry,
    TransactionClassifier, VenueTable, WatchEntry, WatchSet,
};

const MINT: &str = "MintProp11111111111111111111111111111111111";

/// Balances with up to three decimal places.
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|raw| Decimal::new(raw, 3))
}

fn entry(owner: &str, amount: Decimal) -> TokenBalanceEntry {
    TokenBalanceEntry {
        account_index: 0,
        mint: MINT.to_string(),
        owner: Some(owner.to_string()),
        amount,
    }
}

// ── Balance Tracker Properties ──────────────────────────────

proptest! {
    /// An event's direction always matches the sign of its delta, and the
    /// delta is exactly new minus old.
    #[test]
    fn direction_matches_delta_sign(old in balance(), new in balance()) {
        let mut tracker = BalanceTracker::new(Decimal::new(1, 3));
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        tracker.observe("A", old, t0);

        match tracker.observe("A", new, t0 + Duration::seconds(120)) {
            Observation::Changed { event, .. } => {
                prop_assert_eq!(event.delta, new - old);
                let expected = if event.delta > Decimal::ZERO {
                    Direction::Acquire
                } else {
                    Direction::Dispose
                };
                prop_assert_eq!(event.direction, expected);
                prop_assert!(event.amount() > Decimal::new(1, 3));
            }
            other => {
                prop_assert!((new - old).abs() <= Decimal::new(1, 3), "missed change: {:?}", other);
            }
        }
    }

    /// Moves at or below epsilon never produce an event.
    #[test]
    fn epsilon_suppresses_noise(
        start in balance(),
        steps in prop::collection::vec(-1000i64..=1000, 1..20),
    ) {
        let epsilon = Decimal::new(1, 0);
        let mut tracker = BalanceTracker::new(epsilon);
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        tracker.observe("A", start, t0);

        let mut current = start;
        for (i, step) in steps.iter().enumerate() {
            // |step| <= 1.000, compared against the last stored value.
            current += Decimal::new(*step, 3);
            let observation = tracker.observe("A", current, t0 + Duration::seconds(i as i64 + 1));
            prop_assert!(observation.event().is_none());
        }
        prop_assert_eq!(tracker.balance("A"), Some(current));
    }

    /// `last_updated` never moves backwards even with a skewed clock.
    #[test]
    fn last_updated_is_monotonic(offsets in prop::collection::vec(-3600i64..3600, 1..30)) {
        let mut tracker = BalanceTracker::default();
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut latest = None;

        for (i, offset) in offsets.iter().enumerate() {
            let observation = tracker.observe("A", Decimal::from(i as i64), base + Duration::seconds(*offset));
            let stamp = observation.record().last_updated;
            if let Some(prev) = latest {
                prop_assert!(stamp >= prev);
            }
            latest = Some(stamp);
        }
    }
}

// ── Classifier Properties ───────────────────────────────────

proptest! {
    /// Amounts are magnitudes and direction carries the sign.
    #[test]
    fn classified_amount_is_magnitude(pre in balance(), post in balance()) {
        let classifier = TransactionClassifier::new(
            MINT,
            WatchSet::new([WatchEntry { address: "A".to_string(), reference_balance: None }]),
            VenueTable::default_venues(),
        );
        let tx = ParsedTransaction {
            signature: "sig".to_string(),
            block_time: None,
            instruction_programs: vec![],
            pre_token_balances: vec![entry("A", pre)],
            post_token_balances: vec![entry("A", post)],
            failed: false,
        };

        let records = classifier.classify(&tx, Utc::now());
        if pre == post {
            prop_assert!(records.is_empty());
        } else {
            prop_assert_eq!(records.len(), 1);
            prop_assert_eq!(records[0].amount, (post - pre).abs());
            prop_assert!(records[0].amount > Decimal::ZERO);
            prop_assert_eq!(records[0].direction, Direction::from_delta(post - pre).unwrap());
        }
    }
}

// ── Dedup Ledger Properties ─────────────────────────────────

proptest! {
    /// The ledger never grows beyond its capacity.
    #[test]
    fn ledger_is_bounded(
        capacity in 1usize..200,
        signatures in prop::collection::vec("[a-z0-9]{1,12}", 0..1000),
    ) {
        let mut ledger = DedupLedger::new(capacity);
        for sig in &signatures {
            ledger.record(sig);
            prop_assert!(ledger.len() <= capacity);
        }
    }

    /// A signature just recorded is always seen.
    #[test]
    fn record_then_seen(
        capacity in 1usize..50,
        signatures in prop::collection::vec("[a-z]{1,8}", 1..300),
    ) {
        let mut ledger = DedupLedger::new(capacity);
        for sig in &signatures {
            ledger.record(sig);
            prop_assert!(ledger.seen(sig));
        }
    }
}
