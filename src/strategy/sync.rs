//! Sequential processing strategy
//!
//! Applies operations one at a time in file order on a current-thread
//! runtime. The simplest pipeline, and the reference the async strategy's
//! output is checked against.
//!
//! # Design
//!
//! The SyncProcessingStrategy only orchestrates, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Ledger operations to `ReplayEngine`
//! - CSV output to `csv_format::write_accounts_csv`

use crate::config::LedgerConfig;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{in_memory_engine, ProcessingStrategy, ReplaySummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    ledger: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(ledger: LedgerConfig) -> Self {
        Self { ledger }
    }
}

impl Default for SyncProcessingStrategy {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError> {
        let reader = SyncReader::new(input_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let (engine, log) = in_memory_engine(self.ledger.clone());
            let mut summary = ReplaySummary::default();

            for result in reader {
                let record = match result {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping invalid record");
                        summary.rejected += 1;
                        continue;
                    }
                };

                match engine.apply(&record).await {
                    Ok(()) => summary.applied += 1,
                    Err(e) => {
                        tracing::warn!(
                            operation = %record.op_type,
                            account = %record.account,
                            error = %e,
                            "Operation rejected"
                        );
                        summary.rejected += 1;
                    }
                }
            }

            engine.processor().drain_notifications().await;

            write_accounts_csv(&engine.snapshot()?, output)?;
            summary.journal = log.all();

            Ok(summary)
        })
    }
}
