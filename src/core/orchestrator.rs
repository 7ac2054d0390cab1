//! Ledger transfer orchestrator
//!
//! This module provides the `TransferOrchestrator`, which composes the
//! idempotency coordinator, the lock manager and the ledger store into a single
//! exactly-once `transfer` operation.
//!
//! A transfer runs through these stages, short-circuiting to cleanup on the
//! first failure:
//! 1. Replay a cached receipt, or reject a key that is already in use
//! 2. Claim the idempotency key
//! 3. Reject self-transfers and zero amounts
//! 4. Lock both accounts in sorted order
//! 5. Replay from the ledger if a debit leg already carries the key
//! 6. Load, validate and mutate both accounts inside one unit of work
//! 7. Commit both balances and both transaction legs atomically
//! 8. Cache the outcome under the key and publish an event
//!
//! Locks are held by a guard and released on every exit path, after the
//! outcome has been cached.
//!
//! The coordination store is only a cache. When its record for a key is gone
//! (expired, flushed, or a different store) the ledger's unique idempotency
//! key on transaction legs still decides, and a committed transfer is
//! replayed from its legs instead of executing again.

use super::idempotency::IdempotencyCoordinator;
use super::lock_manager::{DistributedLockManager, LockSet};
use super::traits::{CoordinationStore, EventSink, LedgerStore, LedgerUnit, TransferEvent};
use crate::config::EngineConfig;
use crate::types::{
    link_pair, AccountId, InternalError, LedgerTransaction, Money, StoreError, TransferError,
    TransferReceipt, TransferRequest, IDEMPOTENCY_KEY_CONSTRAINT,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Executes transfers between ledger accounts exactly once per idempotency key
pub struct TransferOrchestrator {
    ledger: Arc<dyn LedgerStore>,
    idempotency: IdempotencyCoordinator,
    locks: DistributedLockManager,
    events: Arc<dyn EventSink>,
}

impl TransferOrchestrator {
    /// Create an orchestrator
    ///
    /// The idempotency coordinator and the lock manager are both built on
    /// `coordination`, with TTLs and timeouts taken from `config`.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Durable store for accounts and transactions
    /// * `coordination` - Shared key-value store for idempotency records and locks
    /// * `events` - Sink receiving one event per finished transfer
    /// * `config` - Engine timeouts and TTLs
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        coordination: Arc<dyn CoordinationStore>,
        events: Arc<dyn EventSink>,
        config: &EngineConfig,
    ) -> Self {
        Self::from_parts(
            ledger,
            IdempotencyCoordinator::new(Arc::clone(&coordination), config),
            DistributedLockManager::new(coordination, config),
            events,
        )
    }

    /// Create an orchestrator from already-built components
    pub fn from_parts(
        ledger: Arc<dyn LedgerStore>,
        idempotency: IdempotencyCoordinator,
        locks: DistributedLockManager,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            ledger,
            idempotency,
            locks,
            events,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    pub fn idempotency(&self) -> &IdempotencyCoordinator {
        &self.idempotency
    }

    pub fn lock_manager(&self) -> &DistributedLockManager {
        &self.locks
    }

    /// Execute a validated request
    pub fn execute(&self, request: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        self.transfer(
            request.source,
            request.destination,
            request.amount,
            &request.idempotency_key,
            request.description.as_deref(),
        )
    }

    /// Move `amount` from `source` to `destination`
    ///
    /// # Arguments
    ///
    /// * `source` - Account to debit
    /// * `destination` - Account to credit
    /// * `amount` - Amount to move; must be in both accounts' currency
    /// * `idempotency_key` - Caller-supplied key identifying this logical request
    /// * `description` - Free text stored on both transaction legs
    ///
    /// # Returns
    ///
    /// * `Ok(receipt)` with the ids of the debit and credit legs. A repeated
    ///   call with the key of a completed transfer returns the same receipt
    ///   without executing again.
    /// * `Err(TransferError)` describing the first failed check
    ///
    /// # Errors
    ///
    /// - `DuplicateIdempotencyKey` if the key is in use by another call, ended in failure,
    ///   or already names a ledger row that is not a transfer's debit leg
    /// - `SelfTransferNotAllowed` if `source == destination`
    /// - `InvalidAmount` if `amount` is zero
    /// - `LockAcquisitionFailed` if the account locks could not be taken in time
    /// - `AccountNotFound`, `AccountNotActive`, `CurrencyMismatch`, `InsufficientFunds`
    ///   when account validation fails
    /// - `Internal` on ledger-store faults
    pub fn transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Money,
        idempotency_key: &str,
        description: Option<&str>,
    ) -> Result<TransferReceipt, TransferError> {
        if self.idempotency.exists(idempotency_key) {
            if let Some(receipt) = self.idempotency.get_result(idempotency_key) {
                info!(idempotency_key, "Replaying cached transfer result");
                return Ok(receipt);
            }
            warn!(idempotency_key, "Idempotency key already used");
            return Err(TransferError::duplicate_idempotency_key(idempotency_key));
        }

        if !self.idempotency.mark_processing(idempotency_key) {
            warn!(idempotency_key, "Lost race for idempotency key");
            return Err(TransferError::duplicate_idempotency_key(idempotency_key));
        }

        let _locks = match self.lock_for_transfer(source, destination, &amount) {
            Ok(locks) => locks,
            Err(e) => return Err(self.fail(source, destination, amount, idempotency_key, e)),
        };

        match self.committed_receipt(idempotency_key) {
            Ok(Some(receipt)) => return Ok(self.replay_committed(idempotency_key, receipt)),
            Ok(None) => {}
            Err(e) => return Err(self.fail(source, destination, amount, idempotency_key, e)),
        }

        match self.apply(source, destination, &amount, idempotency_key, description) {
            Ok(receipt) => {
                self.complete(source, destination, amount, idempotency_key, receipt);
                Ok(receipt)
            }
            Err(e) if is_idempotency_key_violation(&e) => {
                // Another writer committed this key between the lookup and our commit
                match self.committed_receipt(idempotency_key) {
                    Ok(Some(receipt)) => Ok(self.replay_committed(idempotency_key, receipt)),
                    _ => Err(self.fail(
                        source,
                        destination,
                        amount,
                        idempotency_key,
                        TransferError::duplicate_idempotency_key(idempotency_key),
                    )),
                }
            }
            Err(e) => Err(self.fail(source, destination, amount, idempotency_key, e)),
        }
    }

    /// Receipt of a transfer already committed under `idempotency_key`
    ///
    /// The debit leg carries the transfer's key and links to its credit leg.
    /// A row under the key that is not a linked debit leg means the key was
    /// spent on something else.
    fn committed_receipt(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<TransferReceipt>, TransferError> {
        let Some(debit) = self.ledger.find_transaction_by_idempotency_key(idempotency_key)? else {
            return Ok(None);
        };

        match debit.related_transaction_id {
            Some(credit_transaction_id) if debit.is_debit() => Ok(Some(TransferReceipt {
                debit_transaction_id: debit.id,
                credit_transaction_id,
            })),
            _ => Err(TransferError::duplicate_idempotency_key(idempotency_key)),
        }
    }

    fn replay_committed(&self, idempotency_key: &str, receipt: TransferReceipt) -> TransferReceipt {
        info!(
            idempotency_key,
            debit_transaction_id = %receipt.debit_transaction_id,
            "Replaying transfer committed in the ledger"
        );
        self.idempotency.store_result(idempotency_key, &receipt);
        receipt
    }

    /// Checks that need no lock, then the locks themselves
    fn lock_for_transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: &Money,
    ) -> Result<LockSet<'_>, TransferError> {
        if source == destination {
            return Err(TransferError::SelfTransferNotAllowed);
        }
        if !amount.is_positive() {
            return Err(TransferError::InvalidAmount {
                amount: amount.amount_minor(),
            });
        }

        self.locks
            .lock_all([source.to_string(), destination.to_string()])
            .ok_or(TransferError::LockAcquisitionFailed)
    }

    /// Run the ledger part of a transfer in one unit of work
    fn apply(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: &Money,
        idempotency_key: &str,
        description: Option<&str>,
    ) -> Result<TransferReceipt, TransferError> {
        let mut unit = self.ledger.begin()?;

        match stage_transfer(
            unit.as_mut(),
            source,
            destination,
            amount,
            idempotency_key,
            description,
        ) {
            Ok(receipt) => {
                unit.commit()?;
                Ok(receipt)
            }
            Err(e) => {
                unit.rollback();
                Err(e)
            }
        }
    }

    fn complete(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Money,
        idempotency_key: &str,
        receipt: TransferReceipt,
    ) {
        self.idempotency.store_result(idempotency_key, &receipt);

        info!(
            idempotency_key,
            %source,
            %destination,
            amount = %amount,
            debit_transaction_id = %receipt.debit_transaction_id,
            credit_transaction_id = %receipt.credit_transaction_id,
            "Transfer committed"
        );

        self.events.publish(TransferEvent::Completed {
            debit_transaction_id: receipt.debit_transaction_id,
            credit_transaction_id: receipt.credit_transaction_id,
            source,
            destination,
            amount,
            idempotency_key: idempotency_key.to_string(),
        });
    }

    fn fail(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Money,
        idempotency_key: &str,
        error: TransferError,
    ) -> TransferError {
        let reason = error.failure_reason();
        self.idempotency.store_failure(idempotency_key, &reason);

        warn!(
            idempotency_key,
            %source,
            %destination,
            amount = %amount,
            code = error.code(),
            error = %error,
            "Transfer failed"
        );

        self.events.publish(TransferEvent::Failed {
            source,
            destination,
            amount,
            idempotency_key: idempotency_key.to_string(),
            reason,
        });

        error
    }
}

fn is_idempotency_key_violation(error: &TransferError) -> bool {
    matches!(
        error,
        TransferError::Internal(InternalError::Store(StoreError::UniqueViolation { constraint, .. }))
            if constraint == IDEMPOTENCY_KEY_CONSTRAINT
    )
}

/// Validate both accounts and stage the mutated rows into `unit`
///
/// Checks run in a fixed order and the first violation wins: existence (source
/// first), status, currency, balance.
fn stage_transfer(
    unit: &mut dyn LedgerUnit,
    source: AccountId,
    destination: AccountId,
    amount: &Money,
    idempotency_key: &str,
    description: Option<&str>,
) -> Result<TransferReceipt, TransferError> {
    let mut from = unit
        .load_account(source)?
        .ok_or_else(|| TransferError::account_not_found(source))?;
    let mut to = unit
        .load_account(destination)?
        .ok_or_else(|| TransferError::account_not_found(destination))?;

    if !from.can_transact() {
        return Err(TransferError::account_not_active(from.id, from.status));
    }
    if !to.can_transact() {
        return Err(TransferError::account_not_active(to.id, to.status));
    }

    if from.currency != to.currency {
        return Err(TransferError::currency_mismatch(from.currency, to.currency));
    }
    if from.currency != amount.currency() {
        return Err(TransferError::currency_mismatch(
            from.currency,
            amount.currency(),
        ));
    }

    if from.balance().is_less_than(amount)? {
        return Err(TransferError::insufficient_funds(
            source,
            amount.amount_minor(),
            from.balance_minor(),
        ));
    }

    let description = description.map(str::to_string);
    let mut debit =
        LedgerTransaction::pending_debit(source, amount, idempotency_key, description.clone());
    let mut credit =
        LedgerTransaction::pending_credit(destination, amount, idempotency_key, description);
    link_pair(&mut debit, &mut credit);

    from.debit(amount)?;
    to.credit(amount)?;
    debit.mark_completed();
    credit.mark_completed();

    debug!(
        idempotency_key,
        source_version = from.version(),
        destination_version = to.version(),
        "Staged transfer"
    );

    let receipt = TransferReceipt {
        debit_transaction_id: debit.id,
        credit_transaction_id: credit.id,
    };

    unit.stage_account(from);
    unit.stage_account(to);
    unit.stage_transaction(debit);
    unit.stage_transaction(credit);

    Ok(receipt)
}
