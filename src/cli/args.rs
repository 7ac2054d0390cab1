use crate::config::EngineConfig;
use crate::gateway::{GuardChain, IdempotencyKeyGuard, RateLimitGuard};
use crate::logging::LogFormat;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Default tokens added back per second when rate limiting is enabled
pub const DEFAULT_RATE_REFILL_PER_SECOND: u32 = 10;

/// Apply money transfers to a ledger exactly once per idempotency key
#[derive(Parser, Debug)]
#[command(name = "ledger-transfer-engine")]
#[command(about = "Apply money transfers to a ledger exactly once per idempotency key", long_about = None)]
pub struct CliArgs {
    /// Accounts fixture: id,holder_name,currency,balance,status
    #[arg(value_name = "ACCOUNTS", help = "Path to the accounts CSV file")]
    pub accounts_file: PathBuf,

    /// Transfers: source,destination,amount,currency,idempotency_key,description
    #[arg(value_name = "TRANSFERS", help = "Path to the transfers CSV file")]
    pub transfers_file: PathBuf,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfer rows per batch (async mode only, default: 1000)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of transfers in flight (async mode only, default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    #[arg(
        long = "results",
        value_name = "FILE",
        help = "Write one result row per transfer to this CSV file"
    )]
    pub results_file: Option<PathBuf>,

    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    #[arg(
        long = "redis-url",
        value_name = "URL",
        env = "LEDGER_REDIS_URL",
        help = "Coordination store URL (requires the 'redis' feature; in-memory when unset)"
    )]
    pub redis_url: Option<String>,

    #[arg(long = "lock-ttl-ms", value_name = "MILLIS")]
    pub lock_ttl_ms: Option<u64>,

    #[arg(long = "lock-wait-ms", value_name = "MILLIS")]
    pub lock_wait_ms: Option<u64>,

    #[arg(long = "idempotency-ttl-secs", value_name = "SECONDS")]
    pub idempotency_ttl_secs: Option<u64>,

    #[arg(long = "store-timeout-ms", value_name = "MILLIS")]
    pub store_timeout_ms: Option<u64>,

    #[arg(
        long = "rate-limit",
        value_name = "BURST",
        help = "Per-source-account token bucket size (rate limiting is off when unset)"
    )]
    pub rate_limit: Option<u32>,

    #[arg(
        long = "rate-refill",
        value_name = "PER_SECOND",
        default_value_t = DEFAULT_RATE_REFILL_PER_SECOND,
        help = "Tokens added back per second when --rate-limit is set"
    )]
    pub rate_refill: u32,
}

/// Available strategies for processing the transfers file
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values take the defaults; zero values are replaced with the
    /// defaults by `BatchConfig::new`.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create an EngineConfig, overriding only the values given on the command line
    pub fn to_engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();

        if let Some(ms) = self.lock_ttl_ms {
            config = config.with_lock_ttl(Duration::from_millis(ms));
        }
        if let Some(ms) = self.lock_wait_ms {
            config = config.with_lock_wait_timeout(Duration::from_millis(ms));
        }
        if let Some(secs) = self.idempotency_ttl_secs {
            config = config.with_idempotency_ttl(Duration::from_secs(secs));
        }
        if let Some(ms) = self.store_timeout_ms {
            config = config.with_store_timeout(Duration::from_millis(ms));
        }

        config
    }

    /// Guards applied to every transfer row
    pub fn guard_chain(&self) -> GuardChain {
        let chain = GuardChain::new().with_guard(IdempotencyKeyGuard);

        match self.rate_limit {
            Some(capacity) => chain.with_guard(RateLimitGuard::new(capacity, self.rate_refill)),
            None => chain,
        }
    }
}
