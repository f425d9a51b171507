//! End-to-end integration tests
//!
//! These tests validate the complete replay pipeline using predefined CSV
//! test fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays all operations through a fresh ledger
//! 3. Generates output CSV
//! 4. Compares actual output with expected.csv
//!
//! Account numbers are generated at random, so expected.csv leaves out the
//! `number` column and the comparison drops it from the actual output.
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path scenarios
//! - Transfer chains and self-transfers
//! - Account closing
//! - Error conditions (insufficient funds, unknown labels, currency mismatch)
//! - Edge cases (precision, balance ceiling, malformed rows)
//!
//! Each test is run twice: once with the sync strategy and once with the async strategy.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_ledger_engine::cli::StrategyType;
    use rust_ledger_engine::io::write_transactions_csv;
    use rust_ledger_engine::strategy::{create_strategy, BatchConfig};
    use rust_ledger_engine::LedgerConfig;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Remove the generated `number` column (index 1) from account output
    fn without_numbers(output: &str) -> String {
        output
            .lines()
            .map(|line| {
                let mut fields: Vec<&str> = line.split(',').collect();
                if fields.len() > 1 {
                    fields.remove(1);
                }
                format!("{}\n", fields.join(","))
            })
            .collect()
    }

    /// Run a test fixture by replaying input.csv and comparing with expected.csv
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - Input or expected files cannot be read
    /// - Output doesn't match expected (after dropping account numbers)
    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let strategy = create_strategy(strategy_type.clone(), LedgerConfig::default(), None);

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        strategy
            .process(Path::new(&input_path), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to replay operations: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));
        let actual_output = without_numbers(&actual_output);

        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    /// End-to-end test for all fixtures with both strategies
    #[rstest]
    #[case("happy_path")]
    #[case("insufficient_funds")]
    #[case("transfers")]
    #[case("close_account")]
    #[case("invalid_rows")]
    #[case("unknown_labels")]
    #[case("currency_mismatch")]
    #[case("precision")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy);
    }

    #[rstest]
    fn test_summary_counts(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let batch = BatchConfig::new(2, 2);
        let strategy = create_strategy(strategy, LedgerConfig::default(), Some(batch));

        let mut output = Vec::new();
        let summary = strategy
            .process(Path::new("tests/fixtures/transfers/input.csv"), &mut output)
            .expect("Failed to replay transfers fixture");

        // three opens, one deposit, three transfers; the self-transfer is refused
        assert_eq!(summary.applied, 7);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.journal.len(), 4);
    }

    #[test]
    fn test_journal_export() {
        let strategy = create_strategy(StrategyType::Sync, LedgerConfig::default(), None);

        let mut output = Vec::new();
        let summary = strategy
            .process(Path::new("tests/fixtures/happy_path/input.csv"), &mut output)
            .expect("Failed to replay happy path fixture");

        let mut journal = Vec::new();
        write_transactions_csv(&summary.journal, &mut journal).unwrap();
        let journal = String::from_utf8(journal).unwrap();

        let types: Vec<&str> = journal
            .lines()
            .skip(1)
            .map(|line| line.split(',').nth(1).unwrap())
            .collect();
        assert_eq!(types, vec!["deposit", "deposit", "withdrawal", "transfer"]);
        assert!(journal.lines().last().unwrap().ends_with(",rent"));
    }

    #[test]
    fn test_missing_input_file_is_fatal() {
        let strategy = create_strategy(StrategyType::Sync, LedgerConfig::default(), None);

        let mut output = Vec::new();
        let result = strategy.process(Path::new("tests/fixtures/does_not_exist.csv"), &mut output);

        assert!(result.is_err());
        assert!(output.is_empty());
    }
}
