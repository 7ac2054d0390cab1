//! In-process coordination store
//!
//! This module provides the `InMemoryCoordinationStore`, a `CoordinationStore`
//! backed by a concurrent map. It gives the idempotency coordinator and the lock
//! manager the same atomic set-if-absent and TTL semantics a remote key-value
//! store would, for a single process.
//!
//! # Design
//!
//! Entries live in a `DashMap` keyed by the store key. Each entry carries its
//! expiry instant. Expired entries behave exactly like absent ones and are
//! removed lazily when touched. Keys that are never touched again (most
//! idempotency keys) are swept in bulk by `purge_expired`, which the store
//! runs itself once every `purge_interval` writes.
//!
//! # Thread Safety
//!
//! Set-if-absent and compare-and-delete go through DashMap's entry and
//! `remove_if` APIs, which hold the shard lock for the whole check-and-write.
//! No caller can observe a half-applied update.

use super::traits::CoordinationStore;
use crate::types::StoreError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Writes between two automatic sweeps of expired entries
pub const DEFAULT_PURGE_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn new(value: &str, ttl: Duration, now: Instant) -> Self {
        StoredValue {
            value: value.to_string(),
            expires_at: now + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Thread-safe, TTL-aware key-value store held in process memory
#[derive(Debug)]
pub struct InMemoryCoordinationStore {
    entries: DashMap<String, StoredValue>,
    writes: AtomicU64,
    purge_interval: u64,
}

impl Default for InMemoryCoordinationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCoordinationStore {
    pub fn new() -> Self {
        Self::with_purge_interval(DEFAULT_PURGE_INTERVAL)
    }

    /// Create a store that sweeps expired entries every `purge_interval` writes
    ///
    /// Zero is treated as one.
    pub fn with_purge_interval(purge_interval: u64) -> Self {
        Self {
            entries: DashMap::new(),
            writes: AtomicU64::new(0),
            purge_interval: purge_interval.max(1),
        }
    }

    fn record_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % self.purge_interval == 0 {
            let purged = self.purge_expired();
            if purged > 0 {
                debug!(purged, "Swept expired coordination entries");
            }
        }
    }

    /// Drop every expired entry
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining lifetime of a live key
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.expires_at.saturating_duration_since(now))
    }

    fn live_value(&self, key: &str, now: Instant) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        None
    }
}

impl CoordinationStore for InMemoryCoordinationStore {
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.record_write();
        let now = Instant::now();

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(StoredValue::new(value, ttl, now));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(value, ttl, now));
                Ok(true)
            }
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.record_write();
        self.entries
            .insert(key.to_string(), StoredValue::new(value, ttl, Instant::now()));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.live_value(key, Instant::now()))
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live_value(key, Instant::now()).is_some())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now)))
    }

    fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove_if(key, |_, entry| {
                entry.value == value && !entry.is_expired(now)
            })
            .is_some())
    }
}
