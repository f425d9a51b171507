//! Transaction-related types for the ledger
//!
//! This module defines transaction types, the in-flight draft built by the
//! processor, the committed record stored in the transaction log, and the
//! generic request accepted by the request-handling layer.

use super::account::AccountNumber;
use super::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Transaction identifier, assigned by the transaction log on append
pub type TransactionId = Uuid;

/// Number of fractional digits every amount and balance carries
pub const MONEY_SCALE: u32 = 2;

/// Transaction types supported by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Credit funds to an account
    Deposit,

    /// Debit funds from an account; requires a sufficient balance
    Withdrawal,

    /// Debit one account and credit another in a single atomic unit
    Transfer,
}

impl TransactionType {
    /// Lowercase name used in logs and CSV output
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    /// Case-insensitive parse; anything else is an unknown operation type
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "transfer" => Ok(TransactionType::Transfer),
            _ => Err(LedgerError::invalid_transaction_type(s)),
        }
    }
}

/// Status of a transaction record
///
/// Only `Success` records are ever appended to the log. `Pending` exists on
/// the in-flight draft while the balance mutation is being applied. `Failed`
/// is never produced: rejected requests return an error instead of leaving
/// history behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    /// Kept so persisted rows with this status still deserialize; never recorded
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => f.write_str("PENDING"),
            TransactionStatus::Success => f.write_str("SUCCESS"),
            TransactionStatus::Failed => f.write_str("FAILED"),
        }
    }
}

/// In-flight transaction built by the processor
///
/// Starts out `Pending`. The processor flips it to `Success` once the balance
/// mutation it describes has been applied, then hands it to the transaction
/// log, which assigns the identifier and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: Option<String>,

    /// Owning account (the source account for transfers)
    pub account: AccountNumber,

    pub source_account: Option<AccountNumber>,
    pub destination_account: Option<AccountNumber>,
}

impl TransactionDraft {
    /// Draft a deposit or withdrawal against a single account
    pub fn single(
        transaction_type: TransactionType,
        account: AccountNumber,
        amount: Decimal,
        description: Option<String>,
    ) -> Self {
        TransactionDraft {
            transaction_type,
            amount,
            status: TransactionStatus::Pending,
            description,
            account,
            source_account: None,
            destination_account: None,
        }
    }

    /// Draft a transfer, owned by the source account
    pub fn transfer(
        source: AccountNumber,
        destination: AccountNumber,
        amount: Decimal,
        description: Option<String>,
    ) -> Self {
        TransactionDraft {
            transaction_type: TransactionType::Transfer,
            amount,
            status: TransactionStatus::Pending,
            description,
            account: source.clone(),
            source_account: Some(source),
            destination_account: Some(destination),
        }
    }

    /// Mark the draft as applied
    pub fn succeed(mut self) -> Self {
        self.status = TransactionStatus::Success;
        self
    }
}

/// Committed transaction record
///
/// Immutable history: once appended, a record is never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Owning account (the source account for transfers)
    pub account: AccountNumber,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_account: Option<AccountNumber>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_account: Option<AccountNumber>,
}

impl Transaction {
    /// Materialize a draft with the identity and timestamp chosen by the log
    pub fn from_draft(draft: TransactionDraft, id: TransactionId, timestamp: DateTime<Utc>) -> Self {
        Transaction {
            id,
            transaction_type: draft.transaction_type,
            amount: draft.amount,
            status: draft.status,
            timestamp,
            description: draft.description,
            account: draft.account,
            source_account: draft.source_account,
            destination_account: draft.destination_account,
        }
    }
}

/// Generic transaction request from the request-handling layer
///
/// Mirrors the JSON body the surrounding API accepts. The type is kept as a
/// string so an unknown operation surfaces as `InvalidTransactionType`
/// instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub transaction_type: String,
    pub amount: Decimal,
    pub account_number: String,

    /// Receiving account, transfers only
    #[serde(default)]
    pub destination_account_number: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Validate a requested amount and bring it to the ledger scale
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` if the amount is not strictly
/// positive or carries more than two fractional digits.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(amount, "must be greater than zero"));
    }

    if amount.round_dp(MONEY_SCALE) != amount {
        return Err(LedgerError::invalid_amount(
            amount,
            "must not have more than two decimal places",
        ));
    }

    let mut normalized = amount;
    normalized.rescale(MONEY_SCALE);
    Ok(normalized)
}
