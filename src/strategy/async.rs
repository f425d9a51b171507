//! Batched parallel processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. It reads operations in batches and applies each
//! batch with account-disjoint groups running in parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (label partitioning + task spawning)
//!     └── ReplayEngine
//!         └── TransactionProcessor (guard, stores, notifications)
//! ```
//!
//! # Ordering
//!
//! - Batches run one after another, so an account's operations keep file
//!   order even when they span several batches
//! - Within a batch, operations linked by a shared label stay in one group
//!   and run in order; only unrelated groups run concurrently

use crate::config::LedgerConfig;
use crate::core::batch_processor::BatchProcessor;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::strategy::{in_memory_engine, ProcessingStrategy, ReplaySummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batched replay
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of operations read and partitioned per batch
    pub batch_size: usize,

    /// Worker threads of the replay runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                default = default.batch_size,
                "Invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches (0), using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Batched parallel replay
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    ledger: LedgerConfig,
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(ledger: LedgerConfig, config: BatchConfig) -> Self {
        Self { ledger, config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let (engine, log) = in_memory_engine(self.ledger.clone());
            let processor = BatchProcessor::new(Arc::new(engine));
            let engine = processor.engine();

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| LedgerError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;

            // csv-async reads through the futures I/O traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut summary = ReplaySummary::default();

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // finish this batch before reading the next to keep file order
                for result in processor.process_batch(batch).await {
                    if result.result.is_ok() {
                        summary.applied += 1;
                    } else {
                        summary.rejected += 1;
                    }
                }
            }
            summary.rejected += reader.skipped();
            engine.processor().drain_notifications().await;

            write_accounts_csv(&engine.snapshot()?, output)?;
            summary.journal = log.all();

            Ok(summary)
        })
    }
}
