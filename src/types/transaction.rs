//! Transaction-related types for the ledger
//!
//! This module defines the ledger transaction record, its identifier and status,
//! and the request/receipt pair that crosses the engine boundary.
//!
//! A completed transfer is recorded as two linked transactions: a debit with a
//! negative amount on the source account and a credit with a positive amount on
//! the destination account. Each leg holds the other's `TransactionId`; the pair
//! is resolved through the ledger store, never through shared ownership.

use super::account::AccountId;
use super::money::{Currency, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Suffix appended to a transfer's idempotency key to derive the credit leg's key
pub const CREDIT_KEY_SUFFIX: &str = "_credit";

/// Transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TransactionId {
    fn from(uuid: Uuid) -> Self {
        TransactionId(uuid)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(TransactionId)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Built but not yet applied
    Pending,

    /// Applied to the account balance
    Completed,

    /// Abandoned without touching the balance
    Failed,
}

impl TransactionStatus {
    /// Completed and Failed are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One leg of a transfer, as stored in the ledger
///
/// The amount is signed: negative for a debit, positive for a credit. Once the
/// status is terminal the record does not change again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,

    /// Account this leg belongs to
    pub account_id: AccountId,

    /// Signed amount in minor units
    pub amount_minor: i64,

    pub currency: Currency,

    status: TransactionStatus,

    pub description: Option<String>,

    /// Globally unique; the credit leg carries the derived `_credit` key
    pub idempotency_key: String,

    /// The other leg of the same transfer
    pub related_transaction_id: Option<TransactionId>,

    pub created_at: DateTime<Utc>,

    /// Set once, when the status first becomes terminal
    completed_at: Option<DateTime<Utc>>,
}

impl LedgerTransaction {
    /// Build a pending debit leg (negative amount) for the source account
    pub fn pending_debit(
        account_id: AccountId,
        amount: &Money,
        idempotency_key: &str,
        description: Option<String>,
    ) -> Self {
        Self::pending(
            account_id,
            -amount.amount_minor(),
            amount.currency(),
            idempotency_key.to_string(),
            description,
        )
    }

    /// Build a pending credit leg (positive amount) for the destination account
    ///
    /// The key passed in is the transfer's key; the leg stores the derived one.
    pub fn pending_credit(
        account_id: AccountId,
        amount: &Money,
        idempotency_key: &str,
        description: Option<String>,
    ) -> Self {
        Self::pending(
            account_id,
            amount.amount_minor(),
            amount.currency(),
            credit_leg_key(idempotency_key),
            description,
        )
    }

    fn pending(
        account_id: AccountId,
        amount_minor: i64,
        currency: Currency,
        idempotency_key: String,
        description: Option<String>,
    ) -> Self {
        LedgerTransaction {
            id: TransactionId::new(),
            account_id,
            amount_minor,
            currency,
            status: TransactionStatus::Pending,
            description,
            idempotency_key,
            related_transaction_id: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_debit(&self) -> bool {
        self.amount_minor < 0
    }

    pub fn is_credit(&self) -> bool {
        self.amount_minor > 0
    }

    /// Mark the leg as applied
    ///
    /// A terminal leg is left untouched and `false` is returned.
    pub fn mark_completed(&mut self) -> bool {
        self.finish(TransactionStatus::Completed)
    }

    /// Mark the leg as abandoned
    ///
    /// A terminal leg is left untouched and `false` is returned.
    pub fn mark_failed(&mut self) -> bool {
        self.finish(TransactionStatus::Failed)
    }

    fn finish(&mut self, status: TransactionStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        true
    }
}

/// Cross-link the two legs of a transfer by id
pub fn link_pair(debit: &mut LedgerTransaction, credit: &mut LedgerTransaction) {
    debit.related_transaction_id = Some(credit.id);
    credit.related_transaction_id = Some(debit.id);
}

/// Idempotency key stored on the credit leg of a transfer
pub fn credit_leg_key(idempotency_key: &str) -> String {
    format!("{}{}", idempotency_key, CREDIT_KEY_SUFFIX)
}

/// Validated transfer request, ready for the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Money,
    pub idempotency_key: String,
    pub description: Option<String>,
}

/// Identifiers of the two legs written by a successful transfer
///
/// This is the payload cached under the idempotency key and returned verbatim
/// on replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub debit_transaction_id: TransactionId,
    pub credit_transaction_id: TransactionId,
}
