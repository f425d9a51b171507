//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - Storage abstractions for interchangeable implementations
//! - `account_store` - Thread-safe account storage with compare-and-set balances
//! - `transaction_log` - Append-only transaction history
//! - `guard` - Ordered, bounded-wait per-account locking
//! - `processor` - Validation and atomic application of money movement
//! - `replay` - Label-based application of CSV operation records
//! - `batch_processor` - Parallel replay of account-disjoint groups

pub mod account_store;
pub mod batch_processor;
pub mod guard;
pub mod processor;
pub mod replay;
pub mod traits;
pub mod transaction_log;

pub use account_store::InMemoryAccountStore;
pub use batch_processor::BatchProcessor;
pub use guard::{ConcurrencyGuard, LockSet};
pub use processor::{AccountNumberSource, RandomAccountNumbers, TransactionProcessor};
pub use replay::{LabeledAccount, ReplayEngine};
pub use traits::{AccountStore, TransactionLog};
pub use transaction_log::InMemoryTransactionLog;
