//! Processing strategy module
//!
//! This module defines the Strategy pattern for feeding a transfers file through
//! the engine. Reading, admission and execution differ between strategies; the
//! engine itself (`TransferOrchestrator`) is the same for all of them, so both
//! strategies leave the ledger in the same final state for the same input.

use crate::cli::StrategyType;
use crate::core::{TransferOrchestrator, TransferOutcome};
use crate::gateway::GuardChain;
use crate::types::InputError;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete transfer pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Run every transfer row of `input_path` through `orchestrator`
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - Engine executing the transfers
    /// * `guards` - Checks every command must pass before execution
    /// * `input_path` - Path to the transfers CSV file
    ///
    /// # Returns
    ///
    /// One outcome per readable row. Rejected and failed transfers are
    /// outcomes too; they never abort the run.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal problems: the input file cannot be
    /// opened, or the async runtime cannot be started. Unreadable rows are
    /// logged and skipped.
    fn process(
        &self,
        orchestrator: Arc<TransferOrchestrator>,
        guards: GuardChain,
        input_path: &Path,
    ) -> Result<Vec<TransferOutcome>, InputError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional batch configuration (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
