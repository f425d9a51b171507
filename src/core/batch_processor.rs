//! Batch processing for parallel replay
//!
//! This module provides the `BatchProcessor` struct, which splits a batch of
//! replay operations into groups that share no account label and applies the
//! groups concurrently.
//!
//! # Design
//!
//! Two operations must run in file order whenever they touch a common label,
//! directly or through a chain of transfers (`a→b` then `b→c` links `a` and
//! `c`). Grouping is therefore a union-find over labels: each group is the
//! connected component of operations linked by shared labels. Groups are
//! disjoint, so running them on separate tasks cannot reorder anything that
//! matters, and the final state equals a sequential replay.
//!
//! Within a group, operations keep their original order and run one after
//! another.

use std::collections::HashMap;
use std::sync::Arc;

use super::replay::ReplayEngine;
use crate::io::csv_format::OperationRecord;
use crate::types::LedgerError;

/// Result of applying a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was applied
    pub record: OperationRecord,

    /// Ok if the ledger accepted it, the ledger's error otherwise
    pub result: Result<(), LedgerError>,
}

/// Splits batches into account-disjoint groups and runs them in parallel
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<ReplayEngine>,
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        // the earlier operation stays the root
        let (low, high) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        parent[high] = low;
    }
}

impl BatchProcessor {
    pub fn new(engine: Arc<ReplayEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ReplayEngine> {
        &self.engine
    }

    /// Partition a batch into groups of operations linked by shared labels
    ///
    /// Groups are returned in order of their first operation, and every group
    /// preserves the relative order its operations had in the batch.
    pub fn partition_by_accounts(&self, batch: Vec<OperationRecord>) -> Vec<Vec<OperationRecord>> {
        let mut parent: Vec<usize> = (0..batch.len()).collect();

        {
            let mut first_seen: HashMap<&str, usize> = HashMap::new();
            for (index, record) in batch.iter().enumerate() {
                for label in record.labels() {
                    match first_seen.get(label) {
                        Some(&earlier) => union(&mut parent, earlier, index),
                        None => {
                            first_seen.insert(label, index);
                        }
                    }
                }
            }
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<OperationRecord>> = Vec::new();

        for (index, record) in batch.into_iter().enumerate() {
            let root = find(&mut parent, index);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(record);
        }

        groups
    }

    /// Apply one group's operations in order
    pub async fn process_group(&self, records: Vec<OperationRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let result = self.engine.apply(&record).await;
            if let Err(error) = &result {
                tracing::warn!(operation = %record.op_type, account = %record.account, %error, "Operation rejected");
            }
            results.push(ProcessingResult { record, result });
        }

        results
    }

    /// Apply a batch, running account-disjoint groups on separate tasks
    ///
    /// Returns once every group has finished.
    pub async fn process_batch(&self, batch: Vec<OperationRecord>) -> Vec<ProcessingResult> {
        let groups = self.partition_by_accounts(batch);

        let mut tasks = Vec::with_capacity(groups.len());
        for group in groups {
            let processor = self.clone();
            tasks.push(tokio::spawn(
                async move { processor.process_group(group).await },
            ));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(error) => tracing::error!(%error, "Replay task panicked"),
            }
        }

        results
    }
}
