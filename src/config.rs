//! Engine configuration
//!
//! Timeouts and TTLs for the idempotency coordinator, the lock manager and the
//! coordination store. Values are plain `Duration`s; the CLI maps its flags
//! onto this struct.

use std::time::Duration;

/// Default lifetime of an idempotency record
pub const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default lifetime of an account lock
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);

/// Default time a blocking lock acquisition may wait
pub const DEFAULT_LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default pause between two set-if-absent attempts while waiting for a lock
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Default bound on a single coordination-store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

/// Configuration shared by the engine components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Time-to-live of idempotency records
    pub idempotency_ttl: Duration,

    /// Time-to-live of account locks, the safety net against a crashed holder
    pub lock_ttl: Duration,

    /// Upper bound on a blocking lock acquisition
    pub lock_wait_timeout: Duration,

    /// Pause between acquisition attempts in blocking mode
    pub lock_retry_interval: Duration,

    /// Connect/read/write timeout for remote coordination stores
    pub store_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            idempotency_ttl: DEFAULT_IDEMPOTENCY_TTL,
            lock_ttl: DEFAULT_LOCK_TTL,
            lock_wait_timeout: DEFAULT_LOCK_WAIT_TIMEOUT,
            lock_retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn with_idempotency_ttl(mut self, ttl: Duration) -> Self {
        self.idempotency_ttl = ttl;
        self
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait_timeout = timeout;
        self
    }

    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();

        assert_eq!(config.idempotency_ttl, Duration::from_secs(86_400));
        assert_eq!(config.lock_ttl, Duration::from_secs(30));
        assert_eq!(config.lock_wait_timeout, Duration::from_secs(5));
        assert_eq!(config.lock_retry_interval, Duration::from_millis(25));
        assert_eq!(config.store_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_builders_override_single_fields() {
        let config = EngineConfig::default()
            .with_lock_wait_timeout(Duration::from_millis(100))
            .with_lock_retry_interval(Duration::from_millis(1));

        assert_eq!(config.lock_wait_timeout, Duration::from_millis(100));
        assert_eq!(config.lock_retry_interval, Duration::from_millis(1));
        assert_eq!(config.lock_ttl, DEFAULT_LOCK_TTL);
    }
}
