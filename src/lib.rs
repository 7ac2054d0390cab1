//! Ledger Transfer Engine Library
//! # Overview
//!
//! This library moves money between two ledger accounts exactly once per
//! client-supplied idempotency key, even under concurrency and retries.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Money, Account, LedgerTransaction, errors)
//! - [`config`] - Engine timeouts and TTLs
//! - [`logging`] - tracing subscriber setup
//! - [`core`] - Business logic components:
//!   - [`core::idempotency`] - Request deduplication by idempotency key
//!   - [`core::lock_manager`] - Sorted multi-account locking with auto-expiry
//!   - [`core::orchestrator`] - The exactly-once `transfer` operation
//!   - [`core::ledger_store`] / [`core::coordination_store`] - In-memory stores
//!   - [`core::dispatch`] - Concurrent dispatch from async code
//! - [`gateway`] - Inbound command validation and request guards
//! - [`io`] - CSV readers and writers
//! - [`strategy`] - Sync and async pipelines over a transfers file
//! - [`cli`] - CLI arguments parsing and the end-to-end run
//!
//! # Transfer Guarantees
//!
//! - **At most once per key**: a repeated key replays the first receipt or is rejected
//! - **Atomic**: both legs and both balance changes commit together, or nothing does
//! - **Deadlock-free**: account locks are always taken in ascending id order
//! - **Conserving**: the sum of all balances never changes

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod gateway;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::EngineConfig;
pub use core::{
    CoordinationStore, DistributedLockManager, EventSink, IdempotencyCoordinator, LedgerStore,
    TransferDispatcher, TransferOrchestrator,
};
pub use gateway::TransferCommand;
pub use io::{write_accounts_csv, write_results_csv};
pub use types::{
    Account, AccountId, AccountStatus, Currency, LedgerTransaction, Money, TransferError,
    TransferReceipt, TransferRequest,
};
