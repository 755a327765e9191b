//! Persistence Tests - File-backed Event Store
//!
//! Exercises `JsonlEventStore` against a temporary directory, including
//! reopening the store the way a restart would.

use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use tempfile::TempDir;
use uuid::Uuid;

use tokenwise_monitor::adapters::persistence::{JsonlEventStore, load_watch_set};
use tokenwise_monitor::domain::{
    BalanceChangeEvent, BalanceRecord, Direction, TransactionRecord, Venue,
};
use tokenwise_monitor::ports::EventStore;

fn balance_record(address: &str, balance: rust_decimal::Decimal, secs: i64) -> BalanceRecord {
    BalanceRecord {
        address: address.to_string(),
        balance,
        last_updated: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    }
}

fn transaction(signature: &str, address: &str) -> TransactionRecord {
    TransactionRecord {
        signature: signature.to_string(),
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        address: address.to_string(),
        amount: dec!(20),
        direction: Direction::Acquire,
        venue: Venue::Known("Jupiter".to_string()),
    }
}

#[tokio::test]
async fn test_balance_upsert_latest_wins_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = JsonlEventStore::open(dir.path()).await.unwrap();
        store.upsert_balance(&balance_record("A", dec!(100), 0)).await.unwrap();
        store.upsert_balance(&balance_record("B", dec!(5), 0)).await.unwrap();
        store.upsert_balance(&balance_record("A", dec!(150), 120)).await.unwrap();
    }

    let store = JsonlEventStore::open(dir.path()).await.unwrap();
    let balances = store.load_balances().await.unwrap();
    assert_eq!(balances.len(), 2);
    let a = balances.iter().find(|r| r.address == "A").unwrap();
    assert_eq!(a.balance, dec!(150));
    assert_eq!(a.last_updated, Utc.timestamp_opt(1_700_000_120, 0).unwrap());
}

#[tokio::test]
async fn test_balance_changes_are_append_only_and_ordered() {
    let dir = TempDir::new().unwrap();
    let store = JsonlEventStore::open(dir.path()).await.unwrap();
    let day_one = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    // Written out of order and across two days.
    for (offset, delta) in [(Duration::days(1), dec!(-50)), (Duration::zero(), dec!(50))] {
        let event = BalanceChangeEvent {
            id: Uuid::new_v4(),
            address: "A".to_string(),
            old_balance: dec!(100),
            new_balance: dec!(100) + delta,
            delta,
            direction: Direction::from_delta(delta).unwrap(),
            timestamp: day_one + offset,
        };
        store.append_balance_change(&event).await.unwrap();
    }

    let reopened = JsonlEventStore::open(dir.path()).await.unwrap();
    let events = reopened.load_balance_changes().await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].direction, Direction::Acquire);
    assert_eq!(events[1].direction, Direction::Dispose);
    assert!(events[0].timestamp < events[1].timestamp);

    let day_files = std::fs::read_dir(dir.path().join("balance_changes"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
        .count();
    assert_eq!(day_files, 2);
}

#[tokio::test]
async fn test_transaction_insert_is_idempotent_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = JsonlEventStore::open(dir.path()).await.unwrap();
        assert!(store.insert_transaction_if_absent(&transaction("sig1", "A")).await.unwrap());
        assert!(!store.insert_transaction_if_absent(&transaction("sig1", "A")).await.unwrap());
        // Same signature, different owner: still a duplicate.
        assert!(!store.insert_transaction_if_absent(&transaction("sig1", "B")).await.unwrap());
        assert!(store.insert_transaction_if_absent(&transaction("sig2", "A")).await.unwrap());
    }

    let store = JsonlEventStore::open(dir.path()).await.unwrap();
    assert!(!store.insert_transaction_if_absent(&transaction("sig2", "A")).await.unwrap());
    assert_eq!(store.known_signatures().await.unwrap(), vec!["sig1", "sig2"]);

    let records = store.load_transactions().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].address, "A");
    assert_eq!(records[0].venue.name(), "Jupiter");
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    {
        let store = JsonlEventStore::open(dir.path()).await.unwrap();
        store.insert_transaction_if_absent(&transaction("sig1", "A")).await.unwrap();
    }

    let path = dir.path().join("transactions.jsonl");
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("{not json\n");
    std::fs::write(&path, content).unwrap();

    let store = JsonlEventStore::open(dir.path()).await.unwrap();
    assert_eq!(store.load_transactions().await.unwrap().len(), 1);
    assert_eq!(store.known_signatures().await.unwrap(), vec!["sig1"]);
}

#[tokio::test]
async fn test_fresh_store_is_empty_and_healthy() {
    let dir = TempDir::new().unwrap();
    let store = JsonlEventStore::open(dir.path().join("nested")).await.unwrap();

    assert!(store.is_healthy().await);
    assert!(store.load_balances().await.unwrap().is_empty());
    assert!(store.load_balance_changes().await.unwrap().is_empty());
    assert!(store.load_transactions().await.unwrap().is_empty());
    assert!(store.known_signatures().await.unwrap().is_empty());
}

#[test]
fn test_watch_set_from_snapshot_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("topHolders.json");
    std::fs::write(
        &path,
        r#"[
            {"address": "tokacct1", "owner": "walletA", "balance": 1000.5},
            {"address": "tokacct2", "owner": "walletB", "balance": "20"},
            {"address": "tokacct3", "owner": "walletA", "balance": 3}
        ]"#,
    )
    .unwrap();

    let set = load_watch_set(&path).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.contains("walletA"));
    assert!(!set.contains("tokacct1"));
    assert_eq!(set.entries()[0].reference_balance, Some(dec!(1000.5)));
}

#[test]
fn test_missing_snapshot_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(load_watch_set(&dir.path().join("missing.json")).is_err());
}
