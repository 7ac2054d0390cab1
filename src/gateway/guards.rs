//! Request guards run before a command reaches the engine
//!
//! Each guard has a single responsibility and either lets a command through or
//! rejects it with a typed `RequestError`. A `GuardChain` runs guards in the
//! order they were added; the first rejection wins.

use super::request::TransferCommand;
use crate::types::{RequestError, TransferRequest};
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::warn;

/// Longest idempotency key accepted
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// A single check applied to inbound commands
pub trait RequestGuard: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    fn check(&self, command: &TransferCommand) -> Result<(), RequestError>;
}

/// Requires a non-blank idempotency key of bounded length
#[derive(Debug, Default, Clone, Copy)]
pub struct IdempotencyKeyGuard;

impl RequestGuard for IdempotencyKeyGuard {
    fn name(&self) -> &'static str {
        "idempotency_key"
    }

    fn check(&self, command: &TransferCommand) -> Result<(), RequestError> {
        let key = command
            .idempotency_key()
            .ok_or(RequestError::MissingIdempotencyKey)?;

        if key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(RequestError::invalid_field(
                "idempotency_key",
                format!(
                    "Idempotency key cannot be longer than {} characters",
                    MAX_IDEMPOTENCY_KEY_LEN
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limit per source account
///
/// Each source account gets `capacity` tokens, refilled continuously at
/// `refill_per_second`. A command spends one token.
#[derive(Debug)]
pub struct RateLimitGuard {
    buckets: DashMap<String, TokenBucket>,
    capacity: u32,
    refill_per_second: u32,
}

impl RateLimitGuard {
    /// Create a limiter
    ///
    /// # Arguments
    ///
    /// * `capacity` - Burst size per source account
    /// * `refill_per_second` - Tokens added back per second
    pub fn new(capacity: u32, refill_per_second: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: capacity.max(1),
            refill_per_second,
        }
    }

    /// Tokens currently left for `identifier`
    pub fn remaining(&self, identifier: &str) -> u32 {
        self.buckets
            .get(identifier)
            .map(|bucket| self.refilled(bucket.tokens, bucket.last_refill, Instant::now()) as u32)
            .unwrap_or(self.capacity)
    }

    fn refilled(&self, tokens: f64, last_refill: Instant, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(last_refill).as_secs_f64();
        (tokens + elapsed * f64::from(self.refill_per_second)).min(f64::from(self.capacity))
    }

    fn retry_after(&self, tokens: f64) -> Duration {
        if self.refill_per_second == 0 {
            return Duration::from_secs(u64::MAX / 2);
        }
        Duration::from_secs_f64((1.0 - tokens).max(0.0) / f64::from(self.refill_per_second))
    }
}

impl RequestGuard for RateLimitGuard {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn check(&self, command: &TransferCommand) -> Result<(), RequestError> {
        let identifier = command.source.trim().to_string();
        let now = Instant::now();

        let mut bucket = self
            .buckets
            .entry(identifier.clone())
            .or_insert_with(|| TokenBucket {
                tokens: f64::from(self.capacity),
                last_refill: now,
            });

        bucket.tokens = self.refilled(bucket.tokens, bucket.last_refill, now);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let retry_after = self.retry_after(bucket.tokens);
            Err(RequestError::RateLimited {
                identifier,
                retry_after_ms: retry_after.as_millis().min(u128::from(u64::MAX)) as u64,
            })
        }
    }
}

/// Ordered list of guards applied to every command
#[derive(Default)]
pub struct GuardChain {
    guards: Vec<Box<dyn RequestGuard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    /// Append a guard to the end of the chain
    pub fn with_guard(mut self, guard: impl RequestGuard + 'static) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    /// Names of the guards, in evaluation order
    pub fn names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    /// Run every guard; the first rejection wins
    pub fn check(&self, command: &TransferCommand) -> Result<(), RequestError> {
        for guard in &self.guards {
            if let Err(e) = guard.check(command) {
                warn!(
                    guard = guard.name(),
                    idempotency_key = command.idempotency_key().unwrap_or_default(),
                    error = %e,
                    "Request rejected"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Run every guard, then validate the command into a request
    pub fn admit(&self, command: &TransferCommand) -> Result<TransferRequest, RequestError> {
        self.check(command)?;
        command.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn command(source: &str, key: Option<&str>) -> TransferCommand {
        TransferCommand {
            source: source.to_string(),
            destination: "223e4567-e89b-12d3-a456-426614174000".to_string(),
            amount: "100".to_string(),
            currency: None,
            idempotency_key: key.map(str::to_string),
            description: None,
        }
    }

    const A: &str = "123e4567-e89b-12d3-a456-426614174000";

    #[test]
    fn test_idempotency_key_guard() {
        let guard = IdempotencyKeyGuard;

        assert!(guard.check(&command(A, Some("k"))).is_ok());
        assert_eq!(
            guard.check(&command(A, None)),
            Err(RequestError::MissingIdempotencyKey)
        );
        assert!(matches!(
            guard.check(&command(A, Some(&"k".repeat(256)))),
            Err(RequestError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_rate_limit_per_source() {
        let guard = RateLimitGuard::new(2, 0);

        assert!(guard.check(&command(A, Some("1"))).is_ok());
        assert!(guard.check(&command(A, Some("2"))).is_ok());
        assert!(matches!(
            guard.check(&command(A, Some("3"))),
            Err(RequestError::RateLimited { ref identifier, .. }) if identifier == A
        ));

        assert!(guard.check(&command("other", Some("4"))).is_ok());
        assert_eq!(guard.remaining(A), 0);
        assert_eq!(guard.remaining("unseen"), 2);
    }

    #[test]
    fn test_rate_limit_refills() {
        let guard = RateLimitGuard::new(1, 50);

        assert!(guard.check(&command(A, Some("1"))).is_ok());
        assert!(guard.check(&command(A, Some("2"))).is_err());

        thread::sleep(Duration::from_millis(60));

        assert!(guard.check(&command(A, Some("3"))).is_ok());
    }

    #[test]
    fn test_chain_runs_in_order_and_first_rejection_wins() {
        let chain = GuardChain::new()
            .with_guard(IdempotencyKeyGuard)
            .with_guard(RateLimitGuard::new(1, 0));

        assert_eq!(chain.names(), vec!["idempotency_key", "rate_limit"]);

        // Missing key is rejected before the limiter spends a token
        assert_eq!(
            chain.check(&command(A, None)),
            Err(RequestError::MissingIdempotencyKey)
        );
        assert!(chain.check(&command(A, Some("k1"))).is_ok());
        assert!(matches!(
            chain.check(&command(A, Some("k2"))),
            Err(RequestError::RateLimited { .. })
        ));
    }

    #[test]
    fn test_admit_validates_after_guards() {
        let chain = GuardChain::new().with_guard(IdempotencyKeyGuard);

        let request = chain.admit(&command(A, Some("k"))).unwrap();
        assert_eq!(request.amount.amount_minor(), 100);

        let mut bad = command(A, Some("k"));
        bad.amount = "abc".to_string();
        assert!(matches!(
            chain.admit(&bad),
            Err(RequestError::InvalidField { .. })
        ));
    }
}
