//! Error types for the ledger transfer engine
//!
//! This module defines every error that can surface from the engine and the glue
//! around it. Errors are plain values so callers can pattern-match on them.
//!
//! # Error Categories
//!
//! - **Money Errors**: currency mismatch, negative amounts, overflow in value arithmetic
//! - **Store Errors**: coordination-store and ledger-store faults
//! - **Transfer Errors**: the typed outcome of `TransferOrchestrator::transfer`
//! - **Request Errors**: inbound commands rejected before reaching the engine
//! - **Input Errors**: fatal file/CSV problems in the CLI pipeline

use super::account::{AccountId, AccountStatus};
use super::money::Currency;
use thiserror::Error;

/// Errors produced by `Money` arithmetic and construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// A monetary amount was negative
    #[error("Amount cannot be negative: {amount}")]
    NegativeAmount {
        /// The rejected amount, as given
        amount: String,
    },

    /// A debit or credit of zero was requested
    #[error("Amount must be positive for {operation}")]
    ZeroAmount { operation: String },

    /// Two values with different currencies were combined or compared
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    /// A subtraction would produce a negative amount
    #[error("Insufficient funds for subtraction: available {available}, requested {requested}")]
    InsufficientAmount { available: i64, requested: i64 },

    /// The result does not fit in the minor-unit representation
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: String },
}

/// Constraint name reported when a transaction leg reuses an idempotency key
pub const IDEMPOTENCY_KEY_CONSTRAINT: &str = "transactions.idempotency_key";

/// Faults raised by the coordination store or the ledger store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the command
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    /// The backing store did not answer within the configured timeout
    #[error("Store operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// A commit would break a uniqueness constraint
    #[error("Unique constraint violated on {constraint}: {value}")]
    UniqueViolation { constraint: String, value: String },

    /// A commit carried an account row staged from a stale read
    #[error("Stale write for account {account}: expected version {expected}, found {found}")]
    VersionConflict {
        account: AccountId,
        expected: u64,
        found: u64,
    },

    /// A stored payload could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// A thread panicked while holding the store's internal lock
    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: error.to_string(),
        }
    }
}

/// Cause carried by `TransferError::Internal`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InternalError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Typed outcome of a failed transfer
///
/// The business-rule variants are returned verbatim and never retried by the
/// engine. `LockAcquisitionFailed` and `Internal` are transient from the
/// caller's point of view.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    /// Source or destination account does not exist
    #[error("Account with id {account} not found")]
    AccountNotFound { account: AccountId },

    /// Account exists but its status does not allow transacting
    #[error("Account with id {account} is not active (status: {status})")]
    AccountNotActive {
        account: AccountId,
        status: AccountStatus,
    },

    /// Account currencies differ, or differ from the transferred money
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    /// Source balance is below the transferred amount
    #[error("Insufficient funds in account {account}. Required: {required}, Available: {available}")]
    InsufficientFunds {
        account: AccountId,
        required: i64,
        available: i64,
    },

    /// Source and destination are the same account
    #[error("Self-transfer is not allowed")]
    SelfTransferNotAllowed,

    /// A zero amount was requested
    #[error("Transfer amount must be positive, got {amount}")]
    InvalidAmount { amount: i64 },

    /// The idempotency key was already used, or another caller holds it
    #[error("Duplicate idempotency key: {key}")]
    DuplicateIdempotencyKey { key: String },

    /// Account locks could not be obtained within the wait timeout
    #[error("Failed to acquire account locks. Please try again.")]
    LockAcquisitionFailed,

    /// Unexpected store or arithmetic fault
    #[error("Transfer failed: {0}")]
    Internal(#[from] InternalError),
}

impl From<StoreError> for TransferError {
    fn from(error: StoreError) -> Self {
        TransferError::Internal(InternalError::Store(error))
    }
}

impl From<MoneyError> for TransferError {
    fn from(error: MoneyError) -> Self {
        match error {
            MoneyError::CurrencyMismatch { left, right } => TransferError::CurrencyMismatch {
                expected: left,
                actual: right,
            },
            other => TransferError::Internal(InternalError::Money(other)),
        }
    }
}

impl TransferError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        TransferError::AccountNotFound { account }
    }

    /// Create an AccountNotActive error
    pub fn account_not_active(account: AccountId, status: AccountStatus) -> Self {
        TransferError::AccountNotActive { account, status }
    }

    /// Create a CurrencyMismatch error
    pub fn currency_mismatch(expected: Currency, actual: Currency) -> Self {
        TransferError::CurrencyMismatch { expected, actual }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, required: i64, available: i64) -> Self {
        TransferError::InsufficientFunds {
            account,
            required,
            available,
        }
    }

    /// Create a DuplicateIdempotencyKey error
    pub fn duplicate_idempotency_key(key: &str) -> Self {
        TransferError::DuplicateIdempotencyKey {
            key: key.to_string(),
        }
    }

    /// Whether the caller may retry the request (with a fresh idempotency key)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferError::LockAcquisitionFailed | TransferError::Internal(_)
        )
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            TransferError::AccountNotActive { .. } => "ACCOUNT_NOT_ACTIVE",
            TransferError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::SelfTransferNotAllowed => "SELF_TRANSFER_NOT_ALLOWED",
            TransferError::InvalidAmount { .. } => "INVALID_AMOUNT",
            TransferError::DuplicateIdempotencyKey { .. } => "DUPLICATE_IDEMPOTENCY_KEY",
            TransferError::LockAcquisitionFailed => "LOCK_ACQUISITION_FAILED",
            TransferError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Reason recorded against the idempotency key when this error ends a transfer
    ///
    /// Internal faults are not echoed into the coordination store.
    pub fn failure_reason(&self) -> String {
        match self {
            TransferError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Rejection of an inbound command before it reaches the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No usable idempotency key was supplied
    #[error("Idempotency key is required")]
    MissingIdempotencyKey,

    /// A field failed validation
    #[error("Invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    /// The caller exceeded its request budget
    #[error("Rate limit exceeded for {identifier}. Retry after {retry_after_ms}ms")]
    RateLimited {
        identifier: String,
        retry_after_ms: u64,
    },
}

impl RequestError {
    /// Create an InvalidField error
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        RequestError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Outcome error of a dispatched transfer message
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Request rejected: {0}")]
    Rejected(#[from] RequestError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The worker running the transfer panicked
    #[error("Transfer worker failed: {message}")]
    WorkerFailed { message: String },
}

impl DispatchError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Rejected(RequestError::RateLimited { .. }) => "RATE_LIMITED",
            DispatchError::Rejected(_) => "INVALID_REQUEST",
            DispatchError::Transfer(e) => e.code(),
            DispatchError::WorkerFailed { .. } => "INTERNAL_ERROR",
        }
    }
}

/// Fatal errors of the CSV processing pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    Io { message: String },

    /// CSV structure could not be parsed
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse { line: Option<u64>, message: String },

    /// A fixture row was structurally valid but semantically rejected
    #[error("Invalid record{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    InvalidRecord { line: Option<u64>, message: String },

    /// The async runtime could not be started
    #[error("Runtime error: {message}")]
    Runtime { message: String },
}

impl From<std::io::Error> for InputError {
    fn from(error: std::io::Error) -> Self {
        InputError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for InputError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        InputError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

impl From<StoreError> for InputError {
    fn from(error: StoreError) -> Self {
        InputError::InvalidRecord {
            line: None,
            message: error.to_string(),
        }
    }
}
