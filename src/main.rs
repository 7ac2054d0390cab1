//! Ledger Transfer Engine CLI
//!
//! Applies a file of transfers to a ledger loaded from an accounts file.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy sync accounts.csv transfers.csv > balances.csv
//! cargo run -- --results results.csv --max-concurrent 8 accounts.csv transfers.csv > balances.csv
//! LEDGER_REDIS_URL=redis://localhost:6379 cargo run --features redis -- accounts.csv transfers.csv
//! ```
//!
//! Final account states go to stdout, logs to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success (individual transfers may still have failed; see `--results`)
//! - 1: Error (missing arguments, file not found, bad accounts file, etc.)

use ledger_transfer_engine::{cli, logging};
use std::process;

fn main() {
    let args = cli::parse_args();
    logging::init(args.log_format);

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(&args, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
