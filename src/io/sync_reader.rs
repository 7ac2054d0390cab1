//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over transfer commands from a CSV file.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to deserialize rows one at a time straight
//! into `TransferCommand`. It never loads the whole file into memory. Rows are
//! not validated here; that is the gateway's job.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<TransferCommand, InputError>` for each CSV row:
//!
//! ```no_run
//! use ledger_transfer_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("transfers.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(command) => println!("Read transfer: {:?}", command),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as Err variants carrying the line number

use crate::gateway::TransferCommand;
use crate::types::InputError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader over transfer rows
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (trailing optional columns may be left off)
    /// - Use an 8KB buffer
    ///
    /// # Errors
    ///
    /// `InputError::FileNotFound` or `InputError::Io` if the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, InputError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => InputError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => InputError::from(e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<TransferCommand, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<TransferCommand>();
        let next = deserializer.next()?;
        self.line_num += 1;

        Some(next.map_err(|e| InputError::Parse {
            line: Some(self.line_num),
            message: e.to_string(),
        }))
    }
}
