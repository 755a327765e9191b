//! Classifier Benchmarks - Per-Transaction Hot Path
//!
//! Benchmarks the domain work done for every fetched transaction and
//! every polled balance.
//!
//! Run with: cargo bench --bench classifier_bench

use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use tokenwise_monitor::domain::{
    BalanceTracker, DedupLedger, ParsedTransaction, TokenBalanceEntry, TransactionClassifier,
    VenueTable, WatchEntry, WatchSet, venue::JUPITER_PROGRAM_ID,
};

const MINT: &str = "9BB6NFEcjBCtnNLFko2FqVQBq8HHM13kCyYcdQbgpump";

fn owner(i: usize) -> String {
    format!("owner{i:040}")
}

fn entry(index: u32, owner: String, amount: i64) -> TokenBalanceEntry {
    TokenBalanceEntry {
        account_index: index,
        mint: MINT.to_string(),
        owner: Some(owner),
        amount: Decimal::new(amount, 2),
    }
}

/// A swap touching 20 token accounts, 2 of them watched.
fn swap_tx() -> ParsedTransaction {
    let pre = (0..20).map(|i| entry(i as u32, owner(i), 10_000)).collect();
    let post = (0..20)
        .map(|i| entry(i as u32, owner(i), 10_000 + (i as i64 * 37)))
        .collect();
    ParsedTransaction {
        signature: "bench".to_string(),
        block_time: Some(Utc::now()),
        instruction_programs: vec![
            "ComputeBudget111111111111111111111111111111".to_string(),
            JUPITER_PROGRAM_ID.to_string(),
        ],
        pre_token_balances: pre,
        post_token_balances: post,
        failed: false,
    }
}

/// Benchmark classification of one transaction against a 20-address watch set.
fn bench_classify(c: &mut Criterion) {
    let watch = WatchSet::new((0..20).step_by(10).chain(100..118).map(|i| WatchEntry {
        address: owner(i),
        reference_balance: None,
    }));
    let classifier = TransactionClassifier::new(MINT, watch, VenueTable::default_venues());
    let tx = swap_tx();
    let now = Utc::now();

    c.bench_function("classify_swap_20_accounts", |b| {
        b.iter(|| {
            let _records = classifier.classify(black_box(&tx), now);
        });
    });
}

/// Benchmark ledger churn at capacity, including half evictions.
fn bench_ledger_churn(c: &mut Criterion) {
    let signatures: Vec<String> = (0..20_000).map(|i| format!("sig{i:084}")).collect();

    c.bench_function("dedup_ledger_20k_records_cap_10k", |b| {
        b.iter(|| {
            let mut ledger = DedupLedger::default();
            for sig in &signatures {
                ledger.record(black_box(sig));
            }
            ledger.len()
        });
    });
}

/// Benchmark one poll observation for a tracked address.
fn bench_tracker_observe(c: &mut Criterion) {
    let mut tracker = BalanceTracker::default();
    let now = Utc::now();
    tracker.observe("A", Decimal::new(100_000, 3), now);
    let mut step = 0i64;

    c.bench_function("tracker_observe_tracked", |b| {
        b.iter(|| {
            step += 1;
            let _obs = tracker.observe("A", black_box(Decimal::new(100_000 + step % 7, 3)), now);
        });
    });
}

criterion_group!(benches, bench_classify, bench_ledger_churn, bench_tracker_observe);
criterion_main!(benches);
