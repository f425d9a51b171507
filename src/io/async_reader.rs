//! Asynchronous CSV reader with batch interface
//!
//! Reads replay operations from any `futures` async reader in batches, for
//! the parallel replay strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of OperationRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord, OperationRecord};
use crate::io::sync_reader::at_line;
use crate::types::LedgerError;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader
///
/// Memory use is bounded by the batch size, not the file size.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
    skipped: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
            skipped: 0,
        }
    }

    /// Read up to `batch_size` operation records
    ///
    /// Invalid rows are logged with their line number and skipped. Returns
    /// an empty vector once the end of the input is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<OperationRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(next) = records.next().await else {
                break;
            };
            self.line_num += 1;

            let converted = match next {
                Ok(csv_record) => convert_csv_record(csv_record),
                Err(e) => Err(LedgerError::ParseError {
                    line: None,
                    message: e.to_string(),
                }),
            };

            match converted {
                Ok(record) => batch.push(record),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(error = %at_line(e, self.line_num), "Skipping invalid record");
                }
            }
        }

        batch
    }

    /// Rows rejected so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
