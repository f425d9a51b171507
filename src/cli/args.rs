use crate::config::LedgerConfig;
use crate::strategy::BatchConfig;
use crate::types::Currency;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay ledger operations from a CSV file
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay account operations through the ledger and print the final account states", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing operation records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for the replay
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for batched parallel replay"
    )]
    pub strategy: StrategyType,

    /// Number of operations per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        env = "LEDGER_BATCH_SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads for batched replay (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        env = "LEDGER_MAX_CONCURRENT",
        help = "Maximum number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Upper bound on the wait for account locks
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MILLIS",
        env = "LEDGER_LOCK_TIMEOUT_MS",
        help = "Milliseconds to wait for account locks before giving up (default: 2000)"
    )]
    pub lock_timeout_ms: Option<u64>,

    /// Compare-and-set retries before an operation gives up
    #[arg(
        long = "max-retries",
        value_name = "COUNT",
        env = "LEDGER_MAX_RETRIES",
        help = "Balance update retries on concurrent modification (default: 3)"
    )]
    pub max_retries: Option<u32>,

    /// Currency for accounts opened without one
    #[arg(
        long = "currency",
        value_name = "CODE",
        env = "LEDGER_CURRENCY",
        help = "Default account currency: USD, EUR or GBP (default: USD)"
    )]
    pub currency: Option<Currency>,

    /// Where to write the committed transactions
    #[arg(
        long = "journal",
        value_name = "PATH",
        help = "Also write every committed transaction to this CSV file"
    )]
    pub journal: Option<PathBuf>,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, defaulting what is absent
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create a LedgerConfig from CLI arguments, defaulting what is absent
    pub fn to_ledger_config(&self) -> LedgerConfig {
        let default = LedgerConfig::default();
        LedgerConfig::new(
            self.lock_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default.lock_timeout),
            self.max_retries.unwrap_or(default.max_retries),
            self.currency.unwrap_or(default.default_currency),
        )
    }
}
