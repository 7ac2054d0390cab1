// CLI module
// Command-line interface, argument parsing and the end-to-end run

mod args;

pub use args::{CliArgs, StrategyType, DEFAULT_RATE_REFILL_PER_SECOND};

use crate::config::EngineConfig;
use crate::core::{
    CoordinationStore, InMemoryCoordinationStore, InMemoryLedgerStore, LedgerStore,
    TracingEventSink, TransferOrchestrator, TransferOutcome,
};
use crate::io::{load_accounts, write_accounts_csv, write_results_csv};
use crate::strategy::create_strategy;
use crate::types::InputError;
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use tracing::info;

/// Parse command-line arguments using clap
///
/// On invalid arguments or `--help`, clap prints the message and exits the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Load the accounts, run every transfer and write the final account states
///
/// Accounts are written to `output`; per-transfer results go to
/// `--results` when given.
///
/// # Returns
///
/// The outcome of every readable transfer row.
///
/// # Errors
///
/// Fatal input problems only: an unreadable accounts or transfers file, a bad
/// accounts row, an unusable coordination store, or a failed write.
pub fn run(args: &CliArgs, output: &mut dyn Write) -> Result<Vec<TransferOutcome>, InputError> {
    let accounts = load_accounts(&args.accounts_file)?;
    info!(count = accounts.len(), "Accounts loaded");

    let ledger = Arc::new(InMemoryLedgerStore::with_accounts(accounts)?);
    let config = args.to_engine_config();
    let orchestrator = Arc::new(TransferOrchestrator::new(
        ledger.clone(),
        coordination_store(args.redis_url.as_deref(), &config)?,
        Arc::new(TracingEventSink),
        &config,
    ));

    let batch_config = match args.strategy {
        StrategyType::Async => Some(args.to_batch_config()),
        StrategyType::Sync => None,
    };
    let strategy = create_strategy(args.strategy.clone(), batch_config);
    let guards = args.guard_chain();
    info!(strategy = ?args.strategy, guards = ?guards.names(), "Processing transfers");

    let outcomes = strategy.process(orchestrator, guards, &args.transfers_file)?;

    let completed = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        completed,
        failed = outcomes.len() - completed,
        "Transfers processed"
    );

    write_accounts_csv(&ledger.all_accounts()?, output)?;

    if let Some(path) = &args.results_file {
        let mut results = BufWriter::new(File::create(path)?);
        write_results_csv(&outcomes, &mut results)?;
        results.flush()?;
    }

    Ok(outcomes)
}

#[cfg(feature = "redis")]
fn coordination_store(
    redis_url: Option<&str>,
    config: &EngineConfig,
) -> Result<Arc<dyn CoordinationStore>, InputError> {
    match redis_url {
        Some(url) => {
            info!("Using Redis coordination store");
            let store = crate::core::RedisCoordinationStore::new(url, config.store_timeout)?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryCoordinationStore::new())),
    }
}

#[cfg(not(feature = "redis"))]
fn coordination_store(
    redis_url: Option<&str>,
    _config: &EngineConfig,
) -> Result<Arc<dyn CoordinationStore>, InputError> {
    match redis_url {
        Some(_) => Err(InputError::Runtime {
            message: "--redis-url requires a build with the 'redis' feature".to_string(),
        }),
        None => Ok(Arc::new(InMemoryCoordinationStore::new())),
    }
}
