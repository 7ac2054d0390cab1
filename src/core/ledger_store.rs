//! In-memory ledger store
//!
//! This module provides the `InMemoryLedgerStore`, the durable-store
//! implementation used by the CLI and the tests. Account and transaction rows
//! live in one set of tables behind a `RwLock`.
//!
//! # Units of Work
//!
//! `begin` returns a unit that stages rows privately. `commit` takes the write
//! lock once, checks every constraint, and only then applies all staged rows,
//! so readers see either none or all of a transfer.
//!
//! # Constraints
//!
//! - account ids are unique (`open_account`)
//! - transaction ids and idempotency keys are unique
//! - a staged account must carry exactly the stored version plus one, which
//!   rejects a write computed from a stale read

use super::traits::{LedgerStore, LedgerUnit};
use crate::types::{
    Account, AccountId, LedgerTransaction, StoreError, TransactionId, IDEMPOTENCY_KEY_CONSTRAINT,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct LedgerTables {
    accounts: BTreeMap<AccountId, Account>,
    transactions: HashMap<TransactionId, LedgerTransaction>,
    by_idempotency_key: HashMap<String, TransactionId>,
    by_account: HashMap<AccountId, Vec<TransactionId>>,
}

/// Ledger store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<LedgerTables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `accounts`
    ///
    /// # Errors
    ///
    /// `StoreError::UniqueViolation` if two accounts share an id.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self, StoreError> {
        let store = Self::new();
        for account in accounts {
            store.open_account(account)?;
        }
        Ok(store)
    }

    /// Number of transaction rows
    pub fn transaction_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.transactions.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerTables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerTables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn begin(&self) -> Result<Box<dyn LedgerUnit + '_>, StoreError> {
        Ok(Box::new(InMemoryUnit {
            store: self,
            accounts: BTreeMap::new(),
            transactions: Vec::new(),
        }))
    }

    fn open_account(&self, account: Account) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.accounts.contains_key(&account.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "accounts.id".to_string(),
                value: account.id.to_string(),
            });
        }

        debug!(account = %account.id, currency = %account.currency, "Opened account");
        tables.accounts.insert(account.id, account);
        Ok(())
    }

    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    fn find_transaction(&self, id: TransactionId) -> Result<Option<LedgerTransaction>, StoreError> {
        Ok(self.read()?.transactions.get(&id).cloned())
    }

    fn find_transaction_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .by_idempotency_key
            .get(key)
            .and_then(|id| tables.transactions.get(id))
            .cloned())
    }

    fn transactions_for_account(&self, id: AccountId) -> Result<Vec<LedgerTransaction>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .by_account
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|tx_id| tables.transactions.get(tx_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.read()?.accounts.values().cloned().collect())
    }
}

/// Unit of work over an `InMemoryLedgerStore`
struct InMemoryUnit<'a> {
    store: &'a InMemoryLedgerStore,
    accounts: BTreeMap<AccountId, Account>,
    transactions: Vec<LedgerTransaction>,
}

impl InMemoryUnit<'_> {
    fn check(&self, tables: &LedgerTables) -> Result<(), StoreError> {
        for staged in self.accounts.values() {
            let found = tables
                .accounts
                .get(&staged.id)
                .map(Account::version)
                .unwrap_or(0);

            if staged.version() != found + 1 {
                return Err(StoreError::VersionConflict {
                    account: staged.id,
                    expected: staged.version().saturating_sub(1),
                    found,
                });
            }
        }

        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for tx in &self.transactions {
            if tables.transactions.contains_key(&tx.id) || !ids.insert(tx.id) {
                return Err(StoreError::UniqueViolation {
                    constraint: "transactions.id".to_string(),
                    value: tx.id.to_string(),
                });
            }
            if tables.by_idempotency_key.contains_key(&tx.idempotency_key)
                || !keys.insert(tx.idempotency_key.as_str())
            {
                return Err(StoreError::UniqueViolation {
                    constraint: IDEMPOTENCY_KEY_CONSTRAINT.to_string(),
                    value: tx.idempotency_key.clone(),
                });
            }
        }

        Ok(())
    }
}

impl LedgerUnit for InMemoryUnit<'_> {
    fn load_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.store.find_account(id)
    }

    fn stage_account(&mut self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    fn stage_transaction(&mut self, transaction: LedgerTransaction) {
        self.transactions.push(transaction);
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let store = self.store;
        let mut tables = store.write()?;
        self.check(&tables)?;

        let InMemoryUnit {
            accounts,
            transactions,
            ..
        } = *self;

        for (id, account) in accounts {
            tables.accounts.insert(id, account);
        }
        for tx in transactions {
            tables
                .by_idempotency_key
                .insert(tx.idempotency_key.clone(), tx.id);
            tables.by_account.entry(tx.account_id).or_default().push(tx.id);
            tables.transactions.insert(tx.id, tx);
        }

        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!(
            accounts = self.accounts.len(),
            transactions = self.transactions.len(),
            "Rolled back ledger unit"
        );
    }
}
