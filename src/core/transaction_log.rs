//! Thread-safe in-memory transaction log
//!
//! This module provides `InMemoryTransactionLog`, the append-only
//! [`TransactionLog`] implementation backed by `DashMap`.
//!
//! # Design
//!
//! Records are kept per owning account in append order, plus an id index for
//! direct lookups. Appends for one account are already serialized by the
//! concurrency guard, so per-account append order is time order; a global
//! sequence number breaks timestamp ties so ordering stays total even when
//! two records share a clock tick.
//!
//! There is no update or delete path.

use crate::core::traits::TransactionLog;
use crate::types::{
    AccountNumber, LedgerError, Page, PageRequest, SortOrder, Transaction, TransactionDraft,
    TransactionId, TransactionStatus,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// A committed record with its position in the global append order
#[derive(Debug, Clone)]
struct Entry {
    sequence: u64,
    transaction: Transaction,
}

/// Thread-safe append-only transaction log
#[derive(Debug, Default)]
pub struct InMemoryTransactionLog {
    /// Records grouped by owning account, in append order
    by_account: DashMap<AccountNumber, Vec<Entry>>,

    /// Owning account of every record, for lookups by id
    index: DashMap<TransactionId, AccountNumber>,

    /// Next global sequence number
    sequence: AtomicU64,
}

impl InMemoryTransactionLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self {
            by_account: DashMap::new(),
            index: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Every record in the log, oldest first
    pub fn all(&self) -> Vec<Transaction> {
        let mut entries: Vec<Entry> = self
            .by_account
            .iter()
            .flat_map(|bucket| bucket.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.sequence);
        entries.into_iter().map(|entry| entry.transaction).collect()
    }
}

impl TransactionLog for InMemoryTransactionLog {
    fn append(&self, draft: TransactionDraft) -> Result<Transaction, LedgerError> {
        if draft.status != TransactionStatus::Success {
            return Err(LedgerError::storage_failure(format!(
                "refusing to record a {} transaction",
                draft.status
            )));
        }

        let account = draft.account.clone();
        let transaction = Transaction::from_draft(draft, Uuid::new_v4(), Utc::now());
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        self.by_account.entry(account.clone()).or_default().push(Entry {
            sequence,
            transaction: transaction.clone(),
        });
        self.index.insert(transaction.id, account);

        Ok(transaction)
    }

    fn list_by_account(&self, account: &AccountNumber, request: &PageRequest) -> Page<Transaction> {
        let mut entries: Vec<Entry> = self
            .by_account
            .get(account)
            .map(|bucket| bucket.value().clone())
            .unwrap_or_default();

        match request.order {
            SortOrder::Ascending => entries.sort_by(|a, b| {
                a.transaction
                    .timestamp
                    .cmp(&b.transaction.timestamp)
                    .then(a.sequence.cmp(&b.sequence))
            }),
            SortOrder::Descending => entries.sort_by(|a, b| {
                b.transaction
                    .timestamp
                    .cmp(&a.transaction.timestamp)
                    .then(b.sequence.cmp(&a.sequence))
            }),
        }

        let ordered = entries.into_iter().map(|entry| entry.transaction).collect();
        Page::from_ordered(ordered, request)
    }

    fn get(&self, id: &TransactionId) -> Option<Transaction> {
        let account = self.index.get(id)?.value().clone();
        self.by_account.get(&account).and_then(|bucket| {
            bucket
                .value()
                .iter()
                .find(|entry| entry.transaction.id == *id)
                .map(|entry| entry.transaction.clone())
        })
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}
