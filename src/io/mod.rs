//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV layouts (account fixtures, account and result output)
//! - `sync_reader` - Synchronous transfer reader with iterator interface
//! - `async_reader` - Asynchronous transfer reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{load_accounts, write_accounts_csv, write_results_csv, AccountRow};
pub use sync_reader::SyncReader;
