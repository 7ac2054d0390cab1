//! Request gateway
//!
//! Glue between raw inbound commands and the engine:
//! - `request` - `TransferCommand` and its validation into a `TransferRequest`
//! - `guards` - the ordered `GuardChain` of `RequestGuard`s (idempotency key
//!   presence, per-account rate limiting)

pub mod guards;
pub mod request;

pub use guards::{GuardChain, IdempotencyKeyGuard, RateLimitGuard, RequestGuard};
pub use request::TransferCommand;

/// Default chain applied by the dispatcher: key presence, then rate limiting
pub fn default_guards(rate_capacity: u32, rate_refill_per_second: u32) -> GuardChain {
    GuardChain::new()
        .with_guard(IdempotencyKeyGuard)
        .with_guard(RateLimitGuard::new(rate_capacity, rate_refill_per_second))
}
