//! Types module
//!
//! Contains core data structures used throughout the engine.
//! This module organizes types into logical submodules:
//! - `money`: Currency and the minor-unit `Money` value
//! - `account`: Account-related types
//! - `transaction`: Ledger transactions, transfer requests and receipts
//! - `error`: Error types for the engine and its glue

pub mod account;
pub mod error;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountId, AccountStatus};
pub use error::{
    DispatchError, InputError, InternalError, MoneyError, RequestError, StoreError, TransferError,
    IDEMPOTENCY_KEY_CONSTRAINT,
};
pub use money::{Currency, Money};
pub use transaction::{
    credit_leg_key, link_pair, LedgerTransaction, TransactionId, TransactionStatus,
    TransferReceipt, TransferRequest,
};
