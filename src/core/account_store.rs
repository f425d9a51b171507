//! Thread-safe in-memory account store
//!
//! This module provides `InMemoryAccountStore`, the [`AccountStore`]
//! implementation backed by `DashMap`.
//!
//! # Design
//!
//! `DashMap` shards its entries and locks per shard, so operations on
//! different accounts rarely contend while a single entry is always read and
//! written under its shard lock. That gives each method below single-entry
//! atomicity: a compare-and-set compares and writes inside one `get_mut`, and
//! readers clone the record, so they observe either the old or the new
//! committed value and never a half-written one.
//!
//! # Ledger invariants
//!
//! The store is the last line of defence for the per-account invariants and
//! checks them on every write regardless of what the caller already checked:
//! - balance never negative
//! - balance never above the decimal(19,2) maximum
//! - closed accounts keep a zero balance and accept no further writes

use crate::core::traits::AccountStore;
use crate::types::{Account, AccountNumber, AccountStatus, LedgerError, OwnerId, MONEY_SCALE};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

/// Largest balance a decimal(19,2) column can hold: 99999999999999999.99
pub fn max_balance() -> Decimal {
    Decimal::from_i128_with_scale(9_999_999_999_999_999_999, MONEY_SCALE)
}

/// Thread-safe account store
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    /// Account records keyed by account number
    accounts: DashMap<AccountNumber, Account>,
}

impl InMemoryAccountStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get(&self, number: &AccountNumber) -> Result<Account, LedgerError> {
        self.accounts
            .get(number)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::account_not_found(number))
    }

    fn create(&self, account: Account) -> Result<Account, LedgerError> {
        let number = account.number.clone();
        let mut inserted = false;

        let stored = self
            .accounts
            .entry(number.clone())
            .or_insert_with(|| {
                inserted = true;
                account
            })
            .value()
            .clone();

        if inserted {
            Ok(stored)
        } else {
            Err(LedgerError::duplicate_account(&number))
        }
    }

    fn compare_and_set_balance(
        &self,
        number: &AccountNumber,
        expected: Decimal,
        new: Decimal,
    ) -> Result<Account, LedgerError> {
        let mut entry = self
            .accounts
            .get_mut(number)
            .ok_or_else(|| LedgerError::account_not_found(number))?;
        let account = entry.value_mut();

        if account.status == AccountStatus::Closed {
            return Err(LedgerError::account_closed(number));
        }

        if account.balance != expected {
            return Err(LedgerError::conflict(number));
        }

        if new < Decimal::ZERO {
            return Err(LedgerError::insufficient_balance(
                number,
                account.balance,
                account.balance - new,
            ));
        }

        if new > max_balance() {
            return Err(LedgerError::arithmetic_overflow("balance update", number));
        }

        let mut balance = new;
        balance.rescale(MONEY_SCALE);
        account.balance = balance;

        Ok(account.clone())
    }

    fn close(&self, number: &AccountNumber, at: DateTime<Utc>) -> Result<Account, LedgerError> {
        let mut entry = self
            .accounts
            .get_mut(number)
            .ok_or_else(|| LedgerError::account_not_found(number))?;
        let account = entry.value_mut();

        if account.status == AccountStatus::Closed {
            return Err(LedgerError::account_closed(number));
        }

        if !account.balance.is_zero() {
            return Err(LedgerError::account_not_empty(number, account.balance));
        }

        account.status = AccountStatus::Closed;
        account.closed_at = Some(at);

        Ok(account.clone())
    }

    fn contains(&self, number: &AccountNumber) -> bool {
        self.accounts.contains_key(number)
    }

    fn list_by_owner(&self, owner: OwnerId) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|entry| entry.value().owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.number.cmp(&b.number))
        });
        accounts
    }

    fn all(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
