//! Distributed lock manager
//!
//! Per-resource exclusive locks kept in the coordination store. Each lock lives
//! under `account_lock:{resource}` with a TTL, and its value is a random token
//! unique to the acquisition, so a release only ever deletes the lock it took.
//!
//! # Deadlock Freedom
//!
//! `acquire_all` deduplicates and sorts the requested resources before taking
//! them one at a time. Two callers contending for overlapping sets always
//! request the shared resources in the same order, so no circular wait forms.
//! If any acquisition fails, everything taken in that call is released.
//!
//! # Failure Policy
//!
//! Store faults during acquisition are logged and reported as "not acquired".
//! Releasing an expired or already-released lock is a logged no-op.

use super::traits::CoordinationStore;
use crate::config::EngineConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Prefix of every lock key in the coordination store
pub const LOCK_PREFIX: &str = "account_lock:";

/// Proof of a held lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    resource: String,
    token: String,
    acquired_at: Instant,
}

impl LockHandle {
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Time since the lock was taken
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/// Acquires and releases resource locks in a coordination store
pub struct DistributedLockManager {
    store: Arc<dyn CoordinationStore>,
    ttl: Duration,
    wait_timeout: Duration,
    retry_interval: Duration,
}

impl DistributedLockManager {
    /// Create a lock manager with TTL and wait bounds from `config`
    pub fn new(store: Arc<dyn CoordinationStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            ttl: config.lock_ttl,
            wait_timeout: config.lock_wait_timeout,
            retry_interval: config.lock_retry_interval,
        }
    }

    fn lock_key(resource: &str) -> String {
        format!("{}{}", LOCK_PREFIX, resource)
    }

    /// Acquire the lock on a single resource
    ///
    /// # Arguments
    ///
    /// * `resource` - Name of the resource, typically an account id
    /// * `blocking` - Keep retrying until the wait timeout elapses, or try once
    ///
    /// # Returns
    ///
    /// * `Some(handle)` if the lock is now held by the caller
    /// * `None` if the lock is held elsewhere, the wait timed out, or the store failed
    pub fn acquire(&self, resource: &str, blocking: bool) -> Option<LockHandle> {
        let key = Self::lock_key(resource);
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + self.wait_timeout;

        loop {
            match self.store.set_if_absent(&key, &token, self.ttl) {
                Ok(true) => {
                    debug!(resource, "Acquired lock");
                    return Some(LockHandle {
                        resource: resource.to_string(),
                        token,
                        acquired_at: Instant::now(),
                    });
                }
                Ok(false) => {}
                Err(e) => {
                    error!(resource, error = %e, "Error acquiring lock");
                    return None;
                }
            }

            let now = Instant::now();
            if !blocking || now >= deadline {
                warn!(resource, blocking, "Failed to acquire lock");
                return None;
            }

            thread::sleep(self.retry_interval.min(deadline - now));
        }
    }

    /// Acquire the locks on every resource, in sorted order
    ///
    /// Duplicate resources are taken once. On any failure every lock acquired
    /// by this call is released before returning.
    ///
    /// # Returns
    ///
    /// A map from resource to handle, or an empty map on failure.
    pub fn acquire_all<I, S>(&self, resources: I) -> BTreeMap<String, LockHandle>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sorted: BTreeSet<String> = resources
            .into_iter()
            .map(|r| r.as_ref().to_string())
            .collect();

        let mut handles = BTreeMap::new();
        for resource in &sorted {
            match self.acquire(resource, true) {
                Some(handle) => {
                    handles.insert(resource.clone(), handle);
                }
                None => {
                    warn!(
                        resource = %resource,
                        acquired = handles.len(),
                        "Failed to acquire all locks, releasing partial set"
                    );
                    self.release_all(&handles);
                    return BTreeMap::new();
                }
            }
        }

        info!(resources = ?sorted, "Acquired all locks");
        handles
    }

    /// Release a lock
    ///
    /// # Returns
    ///
    /// `true` if this call removed the lock. `false` if it had already expired,
    /// been released, or been taken over by another holder.
    pub fn release(&self, handle: &LockHandle) -> bool {
        match self
            .store
            .delete_if_equals(&Self::lock_key(&handle.resource), &handle.token)
        {
            Ok(true) => {
                debug!(resource = %handle.resource, held_ms = handle.held_for().as_millis() as u64, "Released lock");
                true
            }
            Ok(false) => {
                warn!(resource = %handle.resource, "Lock was already released or expired");
                false
            }
            Err(e) => {
                error!(resource = %handle.resource, error = %e, "Error releasing lock");
                false
            }
        }
    }

    /// Release every lock in `handles`
    pub fn release_all(&self, handles: &BTreeMap<String, LockHandle>) {
        for handle in handles.values().rev() {
            self.release(handle);
        }
    }

    /// Probe whether a resource is currently locked
    ///
    /// Tries a non-blocking acquisition and releases it straight away.
    pub fn is_locked(&self, resource: &str) -> bool {
        match self.acquire(resource, false) {
            Some(handle) => {
                self.release(&handle);
                false
            }
            None => true,
        }
    }

    /// Acquire every resource and wrap the handles in a guard
    ///
    /// The guard releases all locks when dropped.
    ///
    /// # Returns
    ///
    /// `None` if not every resource could be locked.
    pub fn lock_all<I, S>(&self, resources: I) -> Option<LockSet<'_>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: BTreeSet<String> = resources
            .into_iter()
            .map(|r| r.as_ref().to_string())
            .collect();

        let handles = self.acquire_all(&wanted);
        if handles.len() != wanted.len() {
            return None;
        }

        Some(LockSet {
            manager: self,
            handles,
        })
    }
}

/// Set of held locks, released on drop
pub struct LockSet<'a> {
    manager: &'a DistributedLockManager,
    handles: BTreeMap<String, LockHandle>,
}

impl LockSet<'_> {
    /// Locked resources, in acquisition order
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        self.manager.release_all(&self.handles);
    }
}
