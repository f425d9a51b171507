//! Storage traits for the ledger
//!
//! The transaction processor only talks to storage through these traits, so
//! the in-memory implementations can be swapped for a database-backed one
//! without touching the locking or validation logic. All methods take `&self`;
//! implementations provide their own interior synchronization.

use crate::types::{
    Account, AccountNumber, LedgerError, OwnerId, Page, PageRequest, Transaction, TransactionDraft,
    TransactionId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Keyed storage of account records
///
/// `compare_and_set_balance` is the only way to change a balance. Writers
/// are expected to hold the concurrency guard for the account; readers are
/// not, and only ever observe fully committed values.
pub trait AccountStore: Send + Sync {
    /// Load an account by number
    fn get(&self, number: &AccountNumber) -> Result<Account, LedgerError>;

    /// Insert a new account; fails with `DuplicateAccount` if the number is taken
    fn create(&self, account: Account) -> Result<Account, LedgerError>;

    /// Replace the balance if it still equals `expected`
    ///
    /// Fails with `Conflict` if the stored balance moved, `AccountClosed` if
    /// the account is closed, `InsufficientBalance` if `new` is negative and
    /// `ArithmeticOverflow` if `new` exceeds the storable maximum.
    fn compare_and_set_balance(
        &self,
        number: &AccountNumber,
        expected: Decimal,
        new: Decimal,
    ) -> Result<Account, LedgerError>;

    /// Transition an active, empty account to closed
    fn close(&self, number: &AccountNumber, at: DateTime<Utc>) -> Result<Account, LedgerError>;

    /// Whether an account with this number exists
    fn contains(&self, number: &AccountNumber) -> bool;

    /// All accounts of one owner, ordered by creation time
    fn list_by_owner(&self, owner: OwnerId) -> Vec<Account>;

    /// Snapshot of every account
    fn all(&self) -> Vec<Account>;
}

/// Append-only storage of committed transactions
pub trait TransactionLog: Send + Sync {
    /// Record a successful transaction, assigning its id and timestamp
    ///
    /// Drafts that are not marked `Success` are rejected.
    fn append(&self, draft: TransactionDraft) -> Result<Transaction, LedgerError>;

    /// Transactions owned by `account`, ordered by time as requested
    fn list_by_account(&self, account: &AccountNumber, request: &PageRequest) -> Page<Transaction>;

    /// Look up a single record
    fn get(&self, id: &TransactionId) -> Option<Transaction>;

    /// Number of records in the log
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
