//! Rust Ledger Engine Library
//! # Overview
//!
//! The money-movement core of a banking backend: an account ledger and a
//! transaction processor that applies deposits, withdrawals and transfers
//! atomically, even under concurrent requests against the same accounts.
//! A CSV replay pipeline (sync and async strategies) drives the core from
//! the command line.
//!
//! # Architecture
//!
//! - [`types`] - Domain types (Account, Transaction, LedgerError, Response, paging)
//! - [`config`] - Ledger tunables
//! - [`core`] - Business logic components:
//!   - [`core::account_store`] - Account storage with compare-and-set balances
//!   - [`core::transaction_log`] - Append-only transaction history
//!   - [`core::guard`] - Ordered per-account locking with bounded waits
//!   - [`core::processor`] - Validate, lock, apply, record, notify
//! - [`notify`] - Post-commit alerts to account owners
//! - [`service`] - Request handling returning the response envelope
//! - [`io`] / [`strategy`] / [`cli`] - CSV replay surface
//!
//! # Money movement
//!
//! - **Deposit**: Credit funds to an active account
//! - **Withdrawal**: Debit funds from an active account with sufficient balance
//! - **Transfer**: Debit one account and credit another of the same currency,
//!   recorded once against the source
//!
//! # Guarantees
//!
//! - Balances are never negative and never exceed the decimal(19,2) range
//! - A balance change and its transaction record commit together or not at all
//! - Operations on one account are linearized; disjoint accounts run in parallel
//! - Lock waits are bounded; a timeout leaves no effect and is safe to retry

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod notify;
pub mod service;
pub mod strategy;
pub mod types;

pub use config::LedgerConfig;
pub use core::{InMemoryAccountStore, InMemoryTransactionLog, TransactionProcessor};
pub use service::BankingService;
pub use types::{
    Account, AccountNumber, AccountStatus, AccountType, Currency, LedgerError, OwnerId,
    Response, Transaction, TransactionId, TransactionStatus, TransactionType,
};
