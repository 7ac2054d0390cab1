//! Asynchronous CSV reader with batch interface
//!
//! Reads transfer commands from any `futures::io::AsyncRead` in batches, so the
//! async strategy can hand each batch to the dispatcher.
//!
//! # Architecture
//!
//! ```text
//! CSV source → AsyncReader (csv-async) → Vec<TransferCommand> → TransferDispatcher
//! ```

use crate::gateway::TransferCommand;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader over transfer rows
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` transfer commands
    ///
    /// Rows that cannot be deserialized are logged and skipped.
    ///
    /// # Returns
    ///
    /// The commands read, in file order. An empty vector means end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<TransferCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<TransferCommand>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(command)) => batch.push(command),
                Some(Err(e)) => warn!(error = %e, "Skipping unreadable transfer row"),
                None => break,
            }
        }

        batch
    }
}
