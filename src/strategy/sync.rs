//! Synchronous processing strategy
//!
//! Reads transfer rows one at a time with `SyncReader`, admits each through the
//! `GuardChain` and executes it on the calling thread. Rows are processed
//! strictly in file order, so this strategy is the reference the async one is
//! compared against.

use crate::core::{TransferOrchestrator, TransferOutcome};
use crate::gateway::GuardChain;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use crate::types::{DispatchError, InputError};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Synchronous processing strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        orchestrator: Arc<TransferOrchestrator>,
        guards: GuardChain,
        input_path: &Path,
    ) -> Result<Vec<TransferOutcome>, InputError> {
        let reader = SyncReader::new(input_path)?;
        let mut outcomes = Vec::new();

        for row in reader {
            let command = match row {
                Ok(command) => command,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable transfer row");
                    continue;
                }
            };

            let result = match guards.admit(&command) {
                Ok(request) => {
                    info!(
                        idempotency_key = %request.idempotency_key,
                        source = %request.source,
                        destination = %request.destination,
                        amount = %request.amount,
                        "Processing transfer message"
                    );
                    orchestrator.execute(&request).map_err(DispatchError::from)
                }
                Err(e) => Err(DispatchError::from(e)),
            };

            outcomes.push(TransferOutcome { command, result });
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::{CollectingEventSink, InMemoryCoordinationStore, InMemoryLedgerStore};
    use crate::gateway::IdempotencyKeyGuard;
    use crate::types::{Account, AccountStatus, Currency, Money};
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

    #[test]
    fn test_sync_strategy_runs_rows_in_order() {
        let (a, b) = (account(100), account(0));
        let ledger = Arc::new(InMemoryLedgerStore::with_accounts(vec![a.clone(), b.clone()]).unwrap());
        let orchestrator = Arc::new(TransferOrchestrator::new(
            ledger,
            Arc::new(InMemoryCoordinationStore::new()),
            Arc::new(CollectingEventSink::new()),
            &EngineConfig::default(),
        ));

        // The second row only succeeds because the first one funded b
        let file = create_temp_csv(&format!(
            "source,destination,amount,currency,idempotency_key,description\n\
             {a},{b},100,USD,k1,\n\
             {b},{a},60,USD,k2,\n\
             {a},{b},1,USD,,\n\
             {a},{b},1000,USD,k3,\n",
            a = a.id,
            b = b.id
        ));

        let outcomes = SyncProcessingStrategy
            .process(
                orchestrator,
                GuardChain::new().with_guard(IdempotencyKeyGuard),
                file.path(),
            )
            .unwrap();

        let codes: Vec<_> = outcomes
            .iter()
            .map(|o| o.result.as_ref().map(|_| "OK").unwrap_or_else(|e| e.code()))
            .collect();
        assert_eq!(codes, vec!["OK", "OK", "INVALID_REQUEST", "INSUFFICIENT_FUNDS"]);
    }

    #[test]
    fn test_sync_strategy_missing_file() {
        let orchestrator = Arc::new(TransferOrchestrator::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryCoordinationStore::new()),
            Arc::new(CollectingEventSink::new()),
            &EngineConfig::default(),
        ));

        let result = SyncProcessingStrategy.process(
            orchestrator,
            GuardChain::new(),
            Path::new("missing.csv"),
        );

        assert!(matches!(result, Err(InputError::FileNotFound { .. })));
    }
}
