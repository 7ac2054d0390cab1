//! End-to-end integration tests
//!
//! These tests validate the complete pipeline using predefined CSV fixtures.
//! Each test:
//! 1. Loads accounts.csv and runs transfers.csv from a fixture directory
//! 2. Writes the final account states
//! 3. Compares the output with expected.csv
//!
//! Fixtures live in tests/fixtures/ and are written so the final state does not
//! depend on the order transfers run in within one batch, so each one is
//! checked with both the sync and the async strategy. Rows that must observe an
//! earlier row (a key reused with a different payload) are put in a later
//! batch through the case's batch size.

#[cfg(test)]
mod tests {
    use clap::Parser;
    use ledger_transfer_engine::cli::{self, CliArgs, StrategyType};
    use rstest::rstest;
    use std::fs;
    use std::path::Path;
    use tempfile::NamedTempFile;

    fn strategy_name(strategy: &StrategyType) -> &'static str {
        match strategy {
            StrategyType::Sync => "sync",
            StrategyType::Async => "async",
        }
    }

    /// Run a fixture and compare the account output with expected.csv
    fn run_test_fixture(fixture_name: &str, batch_size: usize, strategy_type: StrategyType) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let accounts_path = format!("{}/accounts.csv", fixture_dir);
        let transfers_path = format!("{}/transfers.csv", fixture_dir);
        let batch_size = batch_size.to_string();
        let expected_path = format!("{}/expected.csv", fixture_dir);

        for path in [&accounts_path, &transfers_path, &expected_path] {
            assert!(Path::new(path).exists(), "Fixture file not found: {}", path);
        }

        let args = CliArgs::try_parse_from([
            "ledger-transfer-engine",
            "--strategy",
            strategy_name(&strategy_type),
            "--max-concurrent",
            "4",
            "--batch-size",
            batch_size.as_str(),
            accounts_path.as_str(),
            transfers_path.as_str(),
        ])
        .expect("Failed to parse arguments");

        let mut output = Vec::new();
        cli::run(&args, &mut output)
            .unwrap_or_else(|e| panic!("Failed to process transfers: {}", e));

        let actual_output = String::from_utf8(output).expect("Output is not UTF-8");
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path", 1000)]
    #[case("insufficient_funds", 1000)]
    // The k1 row with a different payload must run after the first k1 row
    #[case("duplicate_keys", 3)]
    #[case("invalid_requests", 1000)]
    #[case("inactive_accounts", 1000)]
    #[case("currency_mismatch", 1000)]
    #[case("multiple_accounts", 1000)]
    fn test_fixtures(
        #[case] fixture: &str,
        #[case] batch_size: usize,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, batch_size, strategy);
    }

    #[test]
    fn test_results_file() {
        let results = NamedTempFile::new().expect("Failed to create temp file");
        let results_path = results.path().to_str().unwrap().to_string();

        let args = CliArgs::try_parse_from([
            "ledger-transfer-engine",
            "--strategy",
            "sync",
            "--results",
            results_path.as_str(),
            "tests/fixtures/invalid_requests/accounts.csv",
            "tests/fixtures/invalid_requests/transfers.csv",
        ])
        .unwrap();

        let mut output = Vec::new();
        let outcomes = cli::run(&args, &mut output).unwrap();
        assert_eq!(outcomes.len(), 9);

        let contents = fs::read_to_string(results.path()).unwrap();
        let outcome_column: Vec<_> = contents
            .lines()
            .skip(1)
            .map(|line| line.split(',').nth(1).unwrap().to_string())
            .collect();

        assert_eq!(
            outcome_column,
            vec![
                "INVALID_REQUEST",
                "INVALID_REQUEST",
                "INVALID_REQUEST",
                "INVALID_REQUEST",
                "INVALID_REQUEST",
                "INVALID_REQUEST",
                "SELF_TRANSFER_NOT_ALLOWED",
                "ACCOUNT_NOT_FOUND",
                "completed",
            ]
        );
    }

    #[test]
    fn test_missing_accounts_file_is_fatal() {
        let args = CliArgs::try_parse_from([
            "ledger-transfer-engine",
            "missing/accounts.csv",
            "tests/fixtures/happy_path/transfers.csv",
        ])
        .unwrap();

        let mut output = Vec::new();
        let error = cli::run(&args, &mut output).unwrap_err();

        assert_eq!(error.to_string(), "File not found: missing/accounts.csv");
        assert!(output.is_empty());
    }

    #[test]
    fn test_missing_transfers_file_is_fatal() {
        let args = CliArgs::try_parse_from([
            "ledger-transfer-engine",
            "--strategy",
            "sync",
            "tests/fixtures/happy_path/accounts.csv",
            "missing/transfers.csv",
        ])
        .unwrap();

        let mut output = Vec::new();
        assert!(cli::run(&args, &mut output).is_err());
    }
}
