//! Benchmark suite for transfer throughput
//!
//! Compares the direct orchestrator call with the sync and async processing
//! strategies, using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! Input files are generated into a temporary directory: a ring of accounts
//! and `n` transfers between neighbours, each with its own idempotency key.
//! Every iteration starts from a fresh ledger, so no transfer is a replay.

use ledger_transfer_engine::cli::StrategyType;
use ledger_transfer_engine::core::{
    InMemoryCoordinationStore, InMemoryLedgerStore, TracingEventSink, TransferOrchestrator,
};
use ledger_transfer_engine::gateway::{GuardChain, IdempotencyKeyGuard};
use ledger_transfer_engine::strategy::{create_strategy, BatchConfig};
use ledger_transfer_engine::types::{Account, AccountStatus, Currency, Money};
use ledger_transfer_engine::EngineConfig;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const ACCOUNTS: usize = 16;
const SIZES: &[usize] = &[100, 1_000];

fn main() {
    divan::main();
}

fn accounts() -> Vec<Account> {
    (0..ACCOUNTS)
        .map(|i| {
            Account::new(format!("Holder {}", i), Currency::Usd, AccountStatus::Active)
                .with_opening_balance(&Money::from_minor(1_000_000, Currency::Usd).unwrap())
                .unwrap()
        })
        .collect()
}

fn orchestrator(accounts: Vec<Account>) -> Arc<TransferOrchestrator> {
    Arc::new(TransferOrchestrator::new(
        Arc::new(InMemoryLedgerStore::with_accounts(accounts).unwrap()),
        Arc::new(InMemoryCoordinationStore::new()),
        Arc::new(TracingEventSink),
        &EngineConfig::default(),
    ))
}

/// Write a transfers file for `accounts` and return it with its directory
fn transfers_file(accounts: &[Account], n: usize) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("transfers.csv");

    let mut csv = String::from("source,destination,amount,currency,idempotency_key,description\n");
    for i in 0..n {
        let from = &accounts[i % accounts.len()];
        let to = &accounts[(i + 1) % accounts.len()];
        writeln!(csv, "{},{},100,USD,bench-{},", from.id, to.id, i).unwrap();
    }
    fs::write(&path, csv).expect("Failed to write transfers file");

    (dir, path)
}

/// Direct calls on one thread, no CSV involved
#[divan::bench(args = SIZES)]
fn orchestrator_direct(bencher: divan::Bencher, n: usize) {
    bencher
        .with_inputs(|| {
            let accounts = accounts();
            let ids: Vec<_> = accounts.iter().map(|a| a.id).collect();
            (orchestrator(accounts), ids)
        })
        .bench_values(|(orchestrator, ids)| {
            let amount = Money::from_minor(100, Currency::Usd).unwrap();
            for i in 0..n {
                let from = ids[i % ids.len()];
                let to = ids[(i + 1) % ids.len()];
                orchestrator
                    .transfer(from, to, amount, &format!("bench-{}", i), None)
                    .expect("Transfer failed");
            }
        });
}

#[divan::bench(args = SIZES)]
fn sync_strategy(bencher: divan::Bencher, n: usize) {
    let accounts = accounts();
    let (_dir, path) = transfers_file(&accounts, n);
    let strategy = create_strategy(StrategyType::Sync, None);

    bencher
        .with_inputs(|| orchestrator(accounts.clone()))
        .bench_values(|orchestrator| {
            strategy
                .process(
                    orchestrator,
                    GuardChain::new().with_guard(IdempotencyKeyGuard),
                    &path,
                )
                .expect("Processing failed")
        });
}

#[divan::bench(args = SIZES)]
fn async_strategy(bencher: divan::Bencher, n: usize) {
    let accounts = accounts();
    let (_dir, path) = transfers_file(&accounts, n);
    let strategy = create_strategy(StrategyType::Async, Some(BatchConfig::default()));

    bencher
        .with_inputs(|| orchestrator(accounts.clone()))
        .bench_values(|orchestrator| {
            strategy
                .process(
                    orchestrator,
                    GuardChain::new().with_guard(IdempotencyKeyGuard),
                    &path,
                )
                .expect("Processing failed")
        });
}
