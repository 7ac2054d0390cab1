//! Event sinks for finished transfers

use super::traits::{EventSink, TransferEvent};
use std::sync::Mutex;
use tracing::{info, warn};

/// Sink that writes every event to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: TransferEvent) {
        match event {
            TransferEvent::Completed {
                debit_transaction_id,
                credit_transaction_id,
                source,
                destination,
                amount,
                idempotency_key,
            } => info!(
                %debit_transaction_id,
                %credit_transaction_id,
                %source,
                %destination,
                amount = %amount,
                idempotency_key = %idempotency_key,
                "Transfer completed"
            ),
            TransferEvent::Failed {
                source,
                destination,
                amount,
                idempotency_key,
                reason,
            } => warn!(
                %source,
                %destination,
                amount = %amount,
                idempotency_key = %idempotency_key,
                reason = %reason,
                "Transfer failed"
            ),
        }
    }
}

/// Sink that keeps every event in memory, in publish order
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<TransferEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events published so far
    pub fn events(&self) -> Vec<TransferEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, TransferEvent::Completed { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, TransferEvent::Failed { .. }))
            .count()
    }
}

impl EventSink for CollectingEventSink {
    fn publish(&self, event: TransferEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
