//! Types module
//!
//! Contains core data structures used throughout the ledger.
//! This module organizes types into logical submodules:
//! - `account`: Account, account number and account enums
//! - `transaction`: Transaction records, drafts and requests
//! - `error`: Error types and the error taxonomy
//! - `page`: Paging requests and pages
//! - `response`: The `{statusCode, message, data, meta}` envelope

pub mod account;
pub mod error;
pub mod page;
pub mod response;
pub mod transaction;

pub use account::{Account, AccountNumber, AccountStatus, AccountType, Currency, OwnerId};
pub use error::{ErrorKind, LedgerError};
pub use page::{Page, PageRequest, SortOrder};
pub use response::{PageMeta, Response};
pub use transaction::{
    normalize_amount, Transaction, TransactionDraft, TransactionId, TransactionRequest,
    TransactionStatus, TransactionType, MONEY_SCALE,
};
