//! Asynchronous transfer dispatch
//!
//! This module provides the `TransferDispatcher`, which feeds batches of inbound
//! commands to the synchronous `TransferOrchestrator` from async code.
//!
//! # Design
//!
//! Every command first passes the `GuardChain`, sequentially and in input
//! order, so rate limiting is deterministic. Admitted requests then each run on
//! tokio's blocking pool through `spawn_blocking`, with at most
//! `max_concurrent` transfers in flight, bounded by a semaphore. Transfers that
//! share an account are serialized by the orchestrator's locks, not here.
//!
//! # Architecture
//!
//! ```text
//! TransferDispatcher
//!     ├── Arc<TransferOrchestrator>  (shared synchronous engine)
//!     ├── Arc<GuardChain>            (request guards)
//!     └── Arc<Semaphore>             (in-flight transfer bound)
//! ```

use super::orchestrator::TransferOrchestrator;
use crate::gateway::{GuardChain, TransferCommand};
use crate::types::{DispatchError, TransferError, TransferReceipt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Result of dispatching a single command
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// The command that was dispatched
    pub command: TransferCommand,

    /// The receipt, or why the transfer did not happen
    pub result: Result<TransferReceipt, DispatchError>,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

enum Pending {
    Finished(Result<TransferReceipt, DispatchError>),
    Running {
        idempotency_key: String,
        handle: JoinHandle<Result<TransferReceipt, TransferError>>,
    },
}

/// Runs transfer commands concurrently against a shared orchestrator
#[derive(Clone)]
pub struct TransferDispatcher {
    orchestrator: Arc<TransferOrchestrator>,
    guards: Arc<GuardChain>,
    permits: Arc<Semaphore>,
}

impl TransferDispatcher {
    /// Create a dispatcher
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - Engine executing the transfers
    /// * `guards` - Checks applied to every command before execution
    /// * `max_concurrent` - Upper bound on transfers in flight; zero is treated as one
    pub fn new(
        orchestrator: Arc<TransferOrchestrator>,
        guards: GuardChain,
        max_concurrent: usize,
    ) -> Self {
        Self {
            orchestrator,
            guards: Arc::new(guards),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Dispatch a single command and wait for its outcome
    pub async fn dispatch(&self, command: TransferCommand) -> TransferOutcome {
        self.process_batch(vec![command])
            .await
            .pop()
            .unwrap_or_else(missing_outcome)
    }

    /// Dispatch a batch of commands
    ///
    /// # Returns
    ///
    /// One outcome per command, in input order. A worker that panics is
    /// reported as `DispatchError::WorkerFailed` rather than dropped, and its
    /// key is released so the command can be retried.
    pub async fn process_batch(&self, batch: Vec<TransferCommand>) -> Vec<TransferOutcome> {
        let mut pending = Vec::with_capacity(batch.len());

        for command in batch {
            let request = match self.guards.admit(&command) {
                Ok(request) => request,
                Err(e) => {
                    pending.push((command, Pending::Finished(Err(e.into()))));
                    continue;
                }
            };

            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let failed = Err(DispatchError::WorkerFailed {
                        message: e.to_string(),
                    });
                    pending.push((command, Pending::Finished(failed)));
                    continue;
                }
            };

            info!(
                idempotency_key = %request.idempotency_key,
                source = %request.source,
                destination = %request.destination,
                amount = %request.amount,
                "Processing transfer message"
            );

            let idempotency_key = request.idempotency_key.clone();
            let orchestrator = Arc::clone(&self.orchestrator);
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                orchestrator.execute(&request)
            });
            pending.push((
                command,
                Pending::Running {
                    idempotency_key,
                    handle,
                },
            ));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for (command, pending) in pending {
            let result = match pending {
                Pending::Finished(result) => result,
                Pending::Running {
                    idempotency_key,
                    handle,
                } => match handle.await {
                    Ok(result) => result.map_err(DispatchError::from),
                    Err(e) => {
                        error!(
                            idempotency_key = %idempotency_key,
                            error = %e,
                            "Transfer worker panicked"
                        );
                        // Otherwise the key stays `processing` until its TTL runs out
                        self.orchestrator.idempotency().forget(&idempotency_key);
                        Err(DispatchError::WorkerFailed {
                            message: e.to_string(),
                        })
                    }
                },
            };
            outcomes.push(TransferOutcome { command, result });
        }

        outcomes
    }
}

fn missing_outcome() -> TransferOutcome {
    TransferOutcome {
        command: TransferCommand::default(),
        result: Err(DispatchError::WorkerFailed {
            message: "no outcome produced".to_string(),
        }),
    }
}
