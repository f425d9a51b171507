//! Processing strategy module for replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering both CSV parsing and ledger processing. This allows different
//! implementations (sequential, batched parallel) to be selected at runtime.
//! Both produce the same account states for the same input.

use crate::cli::StrategyType;
use crate::config::LedgerConfig;
use crate::core::account_store::InMemoryAccountStore;
use crate::core::processor::TransactionProcessor;
use crate::core::replay::ReplayEngine;
use crate::core::transaction_log::InMemoryTransactionLog;
use crate::notify::TracingDispatcher;
use crate::types::{LedgerError, Transaction};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// What a replay run did besides writing the account states
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    /// Operations the ledger accepted
    pub applied: usize,

    /// Rows skipped as unparsable or refused by the ledger
    pub rejected: usize,

    /// Every committed transaction, oldest first
    pub journal: Vec<Transaction>,
}

/// Trait for complete replay pipelines
///
/// Implementations read operations from `input_path`, apply them to a fresh
/// in-memory ledger and write the final account states to `output`.
pub trait ProcessingStrategy: Send + Sync {
    /// # Errors
    ///
    /// Only fatal problems (unreadable input, failed output) are errors.
    /// Rejected operations are logged, counted and skipped.
    fn process(&self, input_path: &Path, output: &mut dyn Write)
        -> Result<ReplaySummary, LedgerError>;
}

/// Fresh in-memory ledger for one replay run
///
/// The log handle is returned alongside so the run can export its journal.
pub(crate) fn in_memory_engine(config: LedgerConfig) -> (ReplayEngine, Arc<InMemoryTransactionLog>) {
    let log = Arc::new(InMemoryTransactionLog::new());
    let processor = TransactionProcessor::new(
        Arc::new(InMemoryAccountStore::new()),
        log.clone(),
        Arc::new(TracingDispatcher),
        config,
    );
    (ReplayEngine::new(Arc::new(processor)), log)
}

/// Factory function to create a processing strategy
///
/// `batch` is only used by the async strategy and falls back to defaults.
pub fn create_strategy(
    strategy_type: StrategyType,
    ledger: LedgerConfig,
    batch: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(ledger)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            ledger,
            batch.unwrap_or_default(),
        )),
    }
}
