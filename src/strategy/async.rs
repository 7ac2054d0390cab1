//! Asynchronous batch processing strategy
//!
//! Reads transfer rows in batches with `AsyncReader` and hands each batch to a
//! `TransferDispatcher`, which runs up to `max_concurrent` transfers at once on
//! tokio's blocking pool.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── AsyncReader (batch CSV reading)
//!     └── TransferDispatcher (guards + bounded spawn_blocking)
//!         └── TransferOrchestrator (locks serialize transfers sharing an account)
//! ```
//!
//! Batches are processed one after another; within a batch, transfers run
//! concurrently and may complete in any order. Order-sensitive inputs (a row
//! that relies on funds delivered by an earlier row in the same batch) should
//! use the sync strategy.

use crate::core::{TransferDispatcher, TransferOrchestrator, TransferOutcome};
use crate::gateway::GuardChain;
use crate::io::async_reader::AsyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::InputError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of transfer rows read per batch
    pub batch_size: usize,
    /// Maximum number of transfers in flight
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig; zero values fall back to the defaults
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "Invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            warn!(
                default = default.max_concurrent,
                "Invalid max_concurrent (0), using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Process the transfers file on a dedicated multi-threaded runtime
    ///
    /// The runtime is created per call and shut down before returning, so the
    /// strategy can be driven from plain synchronous code.
    fn process(
        &self,
        orchestrator: Arc<TransferOrchestrator>,
        guards: GuardChain,
        input_path: &Path,
    ) -> Result<Vec<TransferOutcome>, InputError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent)
            .build()
            .map_err(|e| InputError::Runtime {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => InputError::FileNotFound {
                        path: input_path.display().to_string(),
                    },
                    _ => InputError::from(e),
                })?;

            // csv-async reads futures::io::AsyncRead
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let dispatcher =
                TransferDispatcher::new(orchestrator, guards, self.config.max_concurrent);

            let mut outcomes = Vec::new();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                debug!(size = batch.len(), "Dispatching batch");
                outcomes.extend(dispatcher.process_batch(batch).await);
            }

            Ok(outcomes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::{CollectingEventSink, InMemoryCoordinationStore, InMemoryLedgerStore};
    use crate::core::traits::LedgerStore;
    use crate::gateway::IdempotencyKeyGuard;
    use crate::types::{Account, AccountStatus, Currency, Money};
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn account(balance: i64) -> Account {
        Account::new("Holder", Currency::Usd, AccountStatus::Active)
            .with_opening_balance(&Money::from_minor(balance, Currency::Usd).unwrap())
            .unwrap()
    }

    #[rstest]
    #[case::one_batch(BatchConfig::new(1000, 4))]
    #[case::many_batches(BatchConfig::new(3, 2))]
    #[case::single_worker(BatchConfig::new(1, 1))]
    fn test_async_strategy_conserves_money(#[case] config: BatchConfig) {
        let accounts = vec![account(1_000), account(1_000), account(1_000)];
        let ids: Vec<_> = accounts.iter().map(|a| a.id).collect();
        let ledger = Arc::new(InMemoryLedgerStore::with_accounts(accounts).unwrap());
        let orchestrator = Arc::new(TransferOrchestrator::new(
            ledger.clone(),
            Arc::new(InMemoryCoordinationStore::new()),
            Arc::new(CollectingEventSink::new()),
            &EngineConfig::default(),
        ));

        let mut csv = String::from("source,destination,amount,currency,idempotency_key,description\n");
        for i in 0..12 {
            let (from, to) = (ids[i % 3], ids[(i + 1) % 3]);
            csv.push_str(&format!("{},{},10,USD,k{},\n", from, to, i));
        }
        let file = create_temp_csv(&csv);

        let outcomes = AsyncProcessingStrategy::new(config)
            .process(
                orchestrator,
                GuardChain::new().with_guard(IdempotencyKeyGuard),
                file.path(),
            )
            .unwrap();

        assert_eq!(outcomes.len(), 12);
        assert!(outcomes.iter().all(TransferOutcome::is_success));

        let total: i64 = ledger
            .all_accounts()
            .unwrap()
            .iter()
            .map(Account::balance_minor)
            .sum();
        assert_eq!(total, 3_000);
        for id in ids {
            assert_eq!(ledger.find_account(id).unwrap().unwrap().balance_minor(), 1_000);
        }
    }

    #[rstest]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_max_concurrent(10, 0, 10, num_cpus::get())]
    #[case::both_set(10, 4, 10, 4)]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] max_concurrent: usize,
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = BatchConfig::new(batch_size, max_concurrent);

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent, expected_max_concurrent);
    }
}
