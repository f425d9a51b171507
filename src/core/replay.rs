//! Replay of CSV operation records against the ledger
//!
//! A replay file names accounts by labels of its own choosing ("alice",
//! "payroll"), while the ledger generates account numbers. `ReplayEngine`
//! keeps the label directory and turns each `OperationRecord` into the
//! matching `TransactionProcessor` call.
//!
//! The engine is `Sync` and can be shared across tasks. Records that touch
//! the same labels must still be applied in file order; the batch processor
//! guarantees that by keeping them in one group.

use crate::core::processor::TransactionProcessor;
use crate::io::csv_format::{OperationRecord, OperationType};
use crate::types::{Account, AccountNumber, AccountType, LedgerError};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Account state paired with the label the replay file used for it
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledAccount {
    pub label: String,
    pub account: Account,
}

/// Applies replay operations through a transaction processor
#[derive(Debug)]
pub struct ReplayEngine {
    processor: Arc<TransactionProcessor>,

    /// Label to generated account number
    directory: DashMap<String, AccountNumber>,
}

impl ReplayEngine {
    pub fn new(processor: Arc<TransactionProcessor>) -> Self {
        Self {
            processor,
            directory: DashMap::new(),
        }
    }

    pub fn processor(&self) -> &Arc<TransactionProcessor> {
        &self.processor
    }

    fn resolve(&self, label: &str) -> Result<AccountNumber, LedgerError> {
        self.directory
            .get(label)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::unknown_account_label(label))
    }

    fn amount(record: &OperationRecord) -> Result<Decimal, LedgerError> {
        record
            .amount
            .ok_or_else(|| LedgerError::missing_field("amount"))
    }

    /// Apply one operation
    ///
    /// # Errors
    ///
    /// Returns the ledger's error for the operation, `UnknownAccountLabel`
    /// for labels that were never opened and `DuplicateAccountLabel` when a
    /// label is opened twice.
    pub async fn apply(&self, record: &OperationRecord) -> Result<(), LedgerError> {
        match record.op_type {
            OperationType::Open => {
                if self.directory.contains_key(&record.account) {
                    return Err(LedgerError::duplicate_account_label(&record.account));
                }
                let owner = record
                    .owner
                    .ok_or_else(|| LedgerError::missing_field("owner"))?;
                let account = self
                    .processor
                    .open_account(owner, AccountType::Savings, record.currency)
                    .await?;
                self.directory.insert(record.account.clone(), account.number);
            }
            OperationType::Deposit => {
                let number = self.resolve(&record.account)?;
                self.processor
                    .deposit(&number, Self::amount(record)?, record.description.clone())
                    .await?;
            }
            OperationType::Withdrawal => {
                let number = self.resolve(&record.account)?;
                self.processor
                    .withdraw(&number, Self::amount(record)?, record.description.clone())
                    .await?;
            }
            OperationType::Transfer => {
                let source = self.resolve(&record.account)?;
                let destination_label = record
                    .destination
                    .as_deref()
                    .ok_or_else(|| LedgerError::missing_field("destination"))?;
                let destination = self.resolve(destination_label)?;
                self.processor
                    .transfer(
                        &source,
                        &destination,
                        Self::amount(record)?,
                        record.description.clone(),
                    )
                    .await?;
            }
            OperationType::Close => {
                let number = self.resolve(&record.account)?;
                self.processor.close_account(&number).await?;
            }
        }

        Ok(())
    }

    /// Current state of every labeled account, sorted by label
    pub fn snapshot(&self) -> Result<Vec<LabeledAccount>, LedgerError> {
        let mut accounts = self
            .directory
            .iter()
            .map(|entry| {
                Ok(LabeledAccount {
                    label: entry.key().clone(),
                    account: self.processor.account(entry.value())?,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;
        accounts.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::types::{AccountStatus, Currency};

    fn engine() -> ReplayEngine {
        ReplayEngine::new(Arc::new(TransactionProcessor::in_memory(
            LedgerConfig::default(),
        )))
    }

    fn op(
        op_type: OperationType,
        account: &str,
        destination: Option<&str>,
        cents: Option<i64>,
    ) -> OperationRecord {
        OperationRecord {
            op_type,
            account: account.to_string(),
            destination: destination.map(str::to_string),
            amount: cents.map(|c| Decimal::new(c, 2)),
            owner: Some(1),
            currency: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_scenario_through_labels() {
        let engine = engine();

        engine.apply(&op(OperationType::Open, "a", None, None)).await.unwrap();
        engine.apply(&op(OperationType::Open, "b", None, None)).await.unwrap();
        engine
            .apply(&op(OperationType::Deposit, "a", None, Some(10000)))
            .await
            .unwrap();
        engine
            .apply(&op(OperationType::Transfer, "a", Some("b"), Some(4000)))
            .await
            .unwrap();
        let overdraw = engine
            .apply(&op(OperationType::Withdrawal, "b", None, Some(100000)))
            .await;
        assert!(matches!(
            overdraw,
            Err(LedgerError::InsufficientBalance { .. })
        ));

        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].label, "a");
        assert_eq!(snapshot[0].account.balance, Decimal::new(6000, 2));
        assert_eq!(snapshot[1].account.balance, Decimal::new(4000, 2));
        assert_eq!(snapshot[0].account.currency, Currency::Usd);
    }

    #[tokio::test]
    async fn test_labels_must_be_opened_once() {
        let engine = engine();

        assert!(matches!(
            engine
                .apply(&op(OperationType::Deposit, "ghost", None, Some(100)))
                .await,
            Err(LedgerError::UnknownAccountLabel { .. })
        ));

        engine.apply(&op(OperationType::Open, "a", None, None)).await.unwrap();
        assert!(matches!(
            engine.apply(&op(OperationType::Open, "a", None, None)).await,
            Err(LedgerError::DuplicateAccountLabel { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_through_label() {
        let engine = engine();
        engine.apply(&op(OperationType::Open, "a", None, None)).await.unwrap();

        engine.apply(&op(OperationType::Close, "a", None, None)).await.unwrap();

        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot[0].account.status, AccountStatus::Closed);
    }
}
