//! Core transfer engine module
//!
//! This module contains the transfer-execution components:
//! - `traits` - Collaborator abstractions (ledger store, coordination store, event sink)
//! - `coordination_store` - In-process TTL key-value store
//! - `redis_store` - Redis-backed coordination store (feature `redis`)
//! - `idempotency` - Request deduplication by idempotency key
//! - `lock_manager` - Sorted multi-resource locking with auto-expiry
//! - `ledger_store` - In-memory ledger with atomic units of work
//! - `event_sink` - Sinks for transfer events
//! - `orchestrator` - The exactly-once `transfer` operation
//! - `dispatch` - Concurrent batch dispatch from async code

pub mod coordination_store;
pub mod dispatch;
pub mod event_sink;
pub mod idempotency;
pub mod ledger_store;
pub mod lock_manager;
pub mod orchestrator;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod traits;

pub use coordination_store::InMemoryCoordinationStore;
pub use dispatch::{TransferDispatcher, TransferOutcome};
pub use event_sink::{CollectingEventSink, TracingEventSink};
pub use idempotency::{IdempotencyCoordinator, IdempotencyRecord};
pub use ledger_store::InMemoryLedgerStore;
pub use lock_manager::{DistributedLockManager, LockHandle, LockSet};
pub use orchestrator::TransferOrchestrator;
#[cfg(feature = "redis")]
pub use redis_store::RedisCoordinationStore;
pub use traits::{CoordinationStore, EventSink, LedgerStore, LedgerUnit, TransferEvent};
