//! Tracing/logging initialization
//!
//! Logs go to stderr; stdout is reserved for the CSV output of the CLI.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Output format of the log lines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable single-line records
    #[default]
    Text,

    /// One JSON object per record
    Json,
}

/// Initialize tracing for the process.
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => builder.with_ansi(false).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_a_no_op() {
        init(LogFormat::Text);
        init(LogFormat::Json);
        tracing::info!("logging initialized");
    }
}
