//! Ledger Engine CLI
//!
//! Replays account operations from a CSV file through the ledger and prints
//! the final account states.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > accounts.csv
//! cargo run -- --strategy sync operations.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 operations.csv > accounts.csv
//! cargo run -- --journal transactions.csv operations.csv > accounts.csv
//! RUST_LOG=info cargo run -- operations.csv
//! ```
//!
//! Diagnostics go to stderr through `tracing`; `RUST_LOG` controls the level
//! (default `warn`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rust_ledger_engine::cli;
use rust_ledger_engine::io::write_transactions_csv;
use rust_ledger_engine::strategy;
use rust_ledger_engine::LedgerError;
use std::fs::File;
use std::io::BufWriter;
use std::process;
use tracing_subscriber::EnvFilter;

fn run(args: &cli::CliArgs) -> Result<(), LedgerError> {
    let batch = matches!(args.strategy, cli::StrategyType::Async).then(|| args.to_batch_config());
    let strategy = strategy::create_strategy(args.strategy.clone(), args.to_ledger_config(), batch);

    let mut output = std::io::stdout();
    let summary = strategy.process(&args.input_file, &mut output)?;

    tracing::info!(
        applied = summary.applied,
        rejected = summary.rejected,
        transactions = summary.journal.len(),
        "Replay finished"
    );

    if let Some(path) = &args.journal {
        let mut journal = BufWriter::new(File::create(path)?);
        write_transactions_csv(&summary.journal, &mut journal)?;
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
