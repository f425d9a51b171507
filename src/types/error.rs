//! Error types for the ledger
//!
//! This module defines every error the ledger core and its replay surface can
//! produce. Each variant belongs to one [`ErrorKind`], which decides how the
//! error propagates and which status code the response envelope carries.
//!
//! # Error Categories
//!
//! - **Not found**: unknown account number or replay label
//! - **Invalid argument**: bad amount, self-transfer, unknown operation type, etc.
//! - **Account closed**: mutation attempted on a closed account
//! - **Insufficient balance**: withdrawal/transfer exceeds available funds
//! - **Contention**: concurrent-mutation conflicts and lock timeouts (retryable)
//! - **Storage failure**: durable-write failures, overflow and I/O errors

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::{AccountNumber, Currency};

/// Taxonomy the propagation policy is written against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    AccountClosed,
    InsufficientBalance,
    Contention,
    StorageFailure,
}

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// No account exists with the given number
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The account number that was looked up
        account: String,
    },

    /// Amount is not strictly positive or has sub-cent precision
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
        /// Why it was rejected
        reason: String,
    },

    /// Source and destination of a transfer are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SelfTransfer {
        /// The account used on both sides
        account: String,
    },

    /// Unknown operation type in a request
    #[error("Invalid transaction type '{tx_type}'")]
    InvalidTransactionType {
        /// The type string that could not be recognized
        tx_type: String,
    },

    /// Value does not have the ten-digit account number format
    #[error("Invalid account number '{value}'")]
    InvalidAccountNumber {
        /// The malformed value
        value: String,
    },

    /// Required request field was absent
    #[error("Missing required field '{field}'")]
    MissingField {
        /// Name of the absent field
        field: String,
    },

    /// Transfer between accounts denominated in different currencies
    #[error("Currency mismatch: source is {source_currency}, destination is {destination_currency}")]
    CurrencyMismatch {
        source_currency: Currency,
        destination_currency: Currency,
    },

    /// Mutation attempted on a closed account
    #[error("Account {account} is closed")]
    AccountClosed {
        /// The closed account
        account: String,
    },

    /// Close attempted while the account still holds funds
    #[error("Account {account} balance must be zero before closing (balance {balance})")]
    AccountNotEmpty {
        /// The account that was asked to close
        account: String,
        /// Its remaining balance
        balance: Decimal,
    },

    /// Withdrawal or transfer exceeds the available balance
    #[error("Insufficient balance in account {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Account being debited
        account: String,
        /// Balance at the time of the check
        available: Decimal,
        /// Amount requested
        requested: Decimal,
    },

    /// Balance would leave the representable decimal(19,2) range
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account involved
        account: String,
    },

    /// Compare-and-set lost against a concurrent writer
    #[error("Balance of account {account} changed concurrently")]
    Conflict {
        /// Account whose balance no longer matched
        account: String,
    },

    /// Locks could not be acquired in time, or retries were exhausted
    #[error("Accounts {accounts} are busy: {reason}")]
    Busy {
        /// Comma-separated account numbers involved
        accounts: String,
        /// What ran out (lock wait or retry budget)
        reason: String,
    },

    /// Account number already taken at insert time
    #[error("Account number {account} already exists")]
    DuplicateAccount {
        /// The colliding number
        account: String,
    },

    /// Durable write failed; the operation was aborted
    #[error("Storage failure: {message}")]
    StorageFailure {
        /// Description of the failure
        message: String,
    },

    /// Replay referenced a label that was never opened
    #[error("Unknown account label '{label}'")]
    UnknownAccountLabel {
        /// The label used in the input
        label: String,
    },

    /// Replay tried to open the same label twice
    #[error("Account label '{label}' is already open")]
    DuplicateAccountLabel {
        /// The label used in the input
        label: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AccountNotFound { .. } | LedgerError::UnknownAccountLabel { .. } => {
                ErrorKind::NotFound
            }
            LedgerError::InvalidAmount { .. }
            | LedgerError::SelfTransfer { .. }
            | LedgerError::InvalidTransactionType { .. }
            | LedgerError::InvalidAccountNumber { .. }
            | LedgerError::MissingField { .. }
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::AccountNotEmpty { .. }
            | LedgerError::DuplicateAccountLabel { .. }
            | LedgerError::ParseError { .. } => ErrorKind::InvalidArgument,
            LedgerError::AccountClosed { .. } => ErrorKind::AccountClosed,
            LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LedgerError::Conflict { .. }
            | LedgerError::Busy { .. }
            | LedgerError::DuplicateAccount { .. } => ErrorKind::Contention,
            LedgerError::StorageFailure { .. }
            | LedgerError::ArithmeticOverflow { .. }
            | LedgerError::IoError { .. } => ErrorKind::StorageFailure,
        }
    }

    /// Whether the caller may safely retry the same request
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Contention
    }

    /// HTTP-style status code used by the response envelope
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidArgument
            | ErrorKind::AccountClosed
            | ErrorKind::InsufficientBalance => 400,
            ErrorKind::Contention => 409,
            ErrorKind::StorageFailure => 500,
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account: &AccountNumber) -> Self {
        LedgerError::AccountNotFound {
            account: account.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, reason: &str) -> Self {
        LedgerError::InvalidAmount {
            amount,
            reason: reason.to_string(),
        }
    }

    /// Create a SelfTransfer error
    pub fn self_transfer(account: &AccountNumber) -> Self {
        LedgerError::SelfTransfer {
            account: account.to_string(),
        }
    }

    /// Create an InvalidTransactionType error
    pub fn invalid_transaction_type(tx_type: &str) -> Self {
        LedgerError::InvalidTransactionType {
            tx_type: tx_type.to_string(),
        }
    }

    /// Create an InvalidAccountNumber error
    pub fn invalid_account_number(value: &str) -> Self {
        LedgerError::InvalidAccountNumber {
            value: value.to_string(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: &str) -> Self {
        LedgerError::MissingField {
            field: field.to_string(),
        }
    }

    /// Create a CurrencyMismatch error
    pub fn currency_mismatch(source_currency: Currency, destination_currency: Currency) -> Self {
        LedgerError::CurrencyMismatch {
            source_currency,
            destination_currency,
        }
    }

    /// Create an AccountClosed error
    pub fn account_closed(account: &AccountNumber) -> Self {
        LedgerError::AccountClosed {
            account: account.to_string(),
        }
    }

    /// Create an AccountNotEmpty error
    pub fn account_not_empty(account: &AccountNumber, balance: Decimal) -> Self {
        LedgerError::AccountNotEmpty {
            account: account.to_string(),
            balance,
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(
        account: &AccountNumber,
        available: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::InsufficientBalance {
            account: account.to_string(),
            available,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: &AccountNumber) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(account: &AccountNumber) -> Self {
        LedgerError::Conflict {
            account: account.to_string(),
        }
    }

    /// Create a Busy error
    pub fn busy(accounts: &[AccountNumber], reason: &str) -> Self {
        LedgerError::Busy {
            accounts: accounts
                .iter()
                .map(AccountNumber::as_str)
                .collect::<Vec<_>>()
                .join(","),
            reason: reason.to_string(),
        }
    }

    /// Create a DuplicateAccount error
    pub fn duplicate_account(account: &AccountNumber) -> Self {
        LedgerError::DuplicateAccount {
            account: account.to_string(),
        }
    }

    /// Create a StorageFailure error
    pub fn storage_failure(message: impl Into<String>) -> Self {
        LedgerError::StorageFailure {
            message: message.into(),
        }
    }

    /// Create an UnknownAccountLabel error
    pub fn unknown_account_label(label: &str) -> Self {
        LedgerError::UnknownAccountLabel {
            label: label.to_string(),
        }
    }

    /// Create a DuplicateAccountLabel error
    pub fn duplicate_account_label(label: &str) -> Self {
        LedgerError::DuplicateAccountLabel {
            label: label.to_string(),
        }
    }
}
