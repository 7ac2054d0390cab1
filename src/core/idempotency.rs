//! Idempotency coordinator
//!
//! Deduplicates transfer requests by their idempotency key. A key moves through
//! `processing` to either `completed` (with the cached receipt) or `failed`
//! (with the reason), and the record expires after the configured TTL.
//!
//! # Failure Policy
//!
//! Coordination-store faults are logged and absorbed. Reads fail open: `exists`,
//! `get_result` and `record` report "nothing there" so the ledger stays the
//! source of truth. `mark_processing` fails closed: an unreachable store never
//! lets a request through, since that could execute it twice.

use super::traits::CoordinationStore;
use crate::config::EngineConfig;
use crate::types::{StoreError, TransferReceipt};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Prefix of every idempotency key in the coordination store
pub const KEY_PREFIX: &str = "idempotency:";

/// Record stored under an idempotency key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IdempotencyRecord {
    /// A caller has claimed the key and is executing the request
    Processing { started_at: i64 },

    /// The request succeeded; `result` is replayed to later callers
    Completed {
        result: TransferReceipt,
        completed_at: i64,
    },

    /// The request failed with `reason`
    Failed { reason: String, failed_at: i64 },
}

impl IdempotencyRecord {
    pub fn is_processing(&self) -> bool {
        matches!(self, IdempotencyRecord::Processing { .. })
    }
}

/// Deduplicates requests through a shared coordination store
pub struct IdempotencyCoordinator {
    store: Arc<dyn CoordinationStore>,
    ttl: Duration,
}

impl IdempotencyCoordinator {
    /// Create a coordinator with the TTL from `config`
    pub fn new(store: Arc<dyn CoordinationStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            ttl: config.idempotency_ttl,
        }
    }

    fn store_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    /// Whether any record (processing, completed or failed) exists for `key`
    ///
    /// Store faults are reported as `false`.
    pub fn exists(&self, key: &str) -> bool {
        match self.store.exists(&Self::store_key(key)) {
            Ok(exists) => exists,
            Err(e) => {
                error!(idempotency_key = key, error = %e, "Error checking idempotency key");
                false
            }
        }
    }

    /// Claim `key` for processing
    ///
    /// This is a single atomic set-if-absent against the store.
    ///
    /// # Returns
    ///
    /// `true` if this caller now owns the key. `false` if a record already
    /// existed or the store failed.
    pub fn mark_processing(&self, key: &str) -> bool {
        let record = IdempotencyRecord::Processing {
            started_at: Utc::now().timestamp(),
        };

        let result = serde_json::to_string(&record)
            .map_err(StoreError::from)
            .and_then(|value| {
                self.store
                    .set_if_absent(&Self::store_key(key), &value, self.ttl)
            });

        match result {
            Ok(claimed) => {
                debug!(idempotency_key = key, claimed, "Marked idempotency key as processing");
                claimed
            }
            Err(e) => {
                error!(idempotency_key = key, error = %e, "Error marking idempotency key as processing");
                false
            }
        }
    }

    /// Replace the record for `key` with a completed outcome, refreshing the TTL
    pub fn store_result(&self, key: &str, receipt: &TransferReceipt) {
        let record = IdempotencyRecord::Completed {
            result: *receipt,
            completed_at: Utc::now().timestamp(),
        };
        self.write(key, &record);
    }

    /// Replace the record for `key` with a failed outcome, refreshing the TTL
    pub fn store_failure(&self, key: &str, reason: &str) {
        let record = IdempotencyRecord::Failed {
            reason: reason.to_string(),
            failed_at: Utc::now().timestamp(),
        };
        self.write(key, &record);
    }

    /// Drop any record for `key`
    ///
    /// Used when a transfer died without an outcome. A later call with the
    /// same key starts over and is replayed from the ledger if its legs were
    /// committed.
    pub fn forget(&self, key: &str) {
        match self.store.delete(&Self::store_key(key)) {
            Ok(removed) => debug!(idempotency_key = key, removed, "Forgot idempotency key"),
            Err(e) => error!(idempotency_key = key, error = %e, "Error forgetting idempotency key"),
        }
    }

    fn write(&self, key: &str, record: &IdempotencyRecord) {
        let result = serde_json::to_string(record)
            .map_err(StoreError::from)
            .and_then(|value| self.store.set(&Self::store_key(key), &value, self.ttl));

        if let Err(e) = result {
            error!(idempotency_key = key, error = %e, "Error storing idempotency record");
        }
    }

    /// The cached receipt of a completed request
    ///
    /// Processing or failed records, missing keys and store faults all yield `None`.
    pub fn get_result(&self, key: &str) -> Option<TransferReceipt> {
        match self.record(key)? {
            IdempotencyRecord::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    /// The full record stored under `key`
    pub fn record(&self, key: &str) -> Option<IdempotencyRecord> {
        let raw = match self.store.get(&Self::store_key(key)) {
            Ok(raw) => raw?,
            Err(e) => {
                error!(idempotency_key = key, error = %e, "Error reading idempotency record");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                error!(idempotency_key = key, error = %e, "Corrupt idempotency record");
                None
            }
        }
    }
}
