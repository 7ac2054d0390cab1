//! Redis-backed coordination store
//!
//! Available with the `redis` cargo feature. Every command runs on a fresh
//! connection opened with the configured connect timeout, and the same timeout
//! bounds each read and write, so an unreachable server degrades into a
//! `StoreError` instead of a hang.

use super::traits::CoordinationStore;
use crate::types::StoreError;
use std::time::Duration;
use tracing::error;

/// Atomic compare-and-delete used to release a lock only while we still own it
const DELETE_IF_EQUALS_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Debug, Clone)]
pub struct RedisCoordinationStore {
    client: redis::Client,
    timeout: Duration,
}

impl RedisCoordinationStore {
    /// Create a store for the given server
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `timeout` - Connect, read and write timeout of every command
    pub fn new(redis_url: impl AsRef<str>, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(map_redis_error(timeout))?;
        Ok(Self { client, timeout })
    }

    fn connection(&self) -> Result<redis::Connection, StoreError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(map_redis_error(self.timeout))?;
        conn.set_read_timeout(Some(self.timeout))
            .map_err(map_redis_error(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))
            .map_err(map_redis_error(self.timeout))?;
        Ok(conn)
    }

    fn query<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T, StoreError> {
        let mut conn = self.connection()?;
        cmd.query(&mut conn).map_err(|e| {
            error!(error = %e, "Redis command failed");
            map_redis_error(self.timeout)(e)
        })
    }
}

fn map_redis_error(timeout: Duration) -> impl Fn(redis::RedisError) -> StoreError {
    move |e| {
        if e.is_timeout() {
            StoreError::Timeout {
                millis: timeout.as_millis() as u64,
            }
        } else {
            StoreError::Unavailable {
                message: e.to_string(),
            }
        }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

impl CoordinationStore for RedisCoordinationStore {
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let reply: Option<String> = self.query(
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl)),
        )?;
        Ok(reply.is_some())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.query::<()>(
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(ttl_millis(ttl)),
        )
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.query(redis::cmd("GET").arg(key))
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.query(redis::cmd("EXISTS").arg(key))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed: i64 = self.query(redis::cmd("DEL").arg(key))?;
        Ok(removed > 0)
    }

    fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection()?;
        let removed: i64 = redis::Script::new(DELETE_IF_EQUALS_SCRIPT)
            .key(key)
            .arg(value)
            .invoke(&mut conn)
            .map_err(|e| {
                error!(error = %e, key, "Redis compare-and-delete failed");
                map_redis_error(self.timeout)(e)
            })?;
        Ok(removed > 0)
    }
}
