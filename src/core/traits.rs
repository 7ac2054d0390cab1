//! Core traits for the collaborators of the transfer engine
//!
//! The engine only talks to its stores and its event sink through these traits,
//! so in-memory and remote implementations can be used interchangeably. Every
//! collaborator is `Send + Sync` and shared through `Arc`.

use crate::types::{
    Account, AccountId, LedgerTransaction, Money, StoreError, TransactionId,
};
use std::time::Duration;

/// Key-value store with per-key TTL and atomic set-if-absent
///
/// Used exclusively by the idempotency coordinator and the lock manager.
/// Expired keys must behave exactly like absent keys.
pub trait CoordinationStore: Send + Sync {
    /// Store `value` under `key` only if the key is absent
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the value was written, `Ok(false)` if the key already existed.
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Store `value` under `key`, overwriting any previous value and TTL
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Check whether `key` holds a value
    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove `key`
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a value was removed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove `key` only if it currently holds exactly `value`
    ///
    /// The comparison and the removal happen as one atomic step.
    fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError>;
}

/// Durable ledger store
///
/// Account and transaction rows are mutated only through a `LedgerUnit`, which
/// applies all staged rows atomically on commit. The read-side lookups return
/// committed state.
pub trait LedgerStore: Send + Sync {
    /// Begin a unit of work
    fn begin(&self) -> Result<Box<dyn LedgerUnit + '_>, StoreError>;

    /// Open a new account
    ///
    /// # Errors
    ///
    /// `StoreError::UniqueViolation` if an account with the same id exists.
    fn open_account(&self, account: Account) -> Result<(), StoreError>;

    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    fn find_transaction(&self, id: TransactionId)
        -> Result<Option<LedgerTransaction>, StoreError>;

    fn find_transaction_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError>;

    /// Every transaction recorded against an account, oldest first
    fn transactions_for_account(
        &self,
        id: AccountId,
    ) -> Result<Vec<LedgerTransaction>, StoreError>;

    /// Every account, sorted by id
    fn all_accounts(&self) -> Result<Vec<Account>, StoreError>;
}

/// Atomic unit of work over the ledger store
///
/// Nothing staged is visible to readers until `commit` succeeds. Dropping a
/// unit without committing discards it.
pub trait LedgerUnit {
    /// Read the committed state of an account
    ///
    /// No row lock is taken; exclusivity comes from the account locks held by
    /// the caller, and stale writes are caught by the version check at commit.
    fn load_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Stage an updated account row
    fn stage_account(&mut self, account: Account);

    /// Stage a new transaction row
    fn stage_transaction(&mut self, transaction: LedgerTransaction);

    /// Apply every staged row atomically
    ///
    /// # Errors
    ///
    /// - `StoreError::UniqueViolation` on a duplicate transaction id or idempotency key
    /// - `StoreError::VersionConflict` if an account row was staged from a stale read
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every staged row
    fn rollback(self: Box<Self>);
}

/// Notification emitted once a transfer has finished
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Completed {
        debit_transaction_id: TransactionId,
        credit_transaction_id: TransactionId,
        source: AccountId,
        destination: AccountId,
        amount: Money,
        idempotency_key: String,
    },
    Failed {
        source: AccountId,
        destination: AccountId,
        amount: Money,
        idempotency_key: String,
        reason: String,
    },
}

impl TransferEvent {
    pub fn idempotency_key(&self) -> &str {
        match self {
            TransferEvent::Completed {
                idempotency_key, ..
            }
            | TransferEvent::Failed {
                idempotency_key, ..
            } => idempotency_key,
        }
    }
}

/// Fire-and-forget sink for transfer events
///
/// Delivery is not part of a transfer's atomicity; implementations must not
/// block for long and must not panic.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: TransferEvent);
}
