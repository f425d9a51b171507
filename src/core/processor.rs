//! Transaction processing
//!
//! This module provides the `TransactionProcessor`, which validates and
//! applies deposits, withdrawals and transfers against the account store and
//! records every committed operation in the transaction log.
//!
//! # Request lifecycle
//!
//! ```text
//! Received ──validate──▶ Validated ──lock──▶ Applied ──append──▶ Recorded ──spawn──▶ Notified
//!     │                      │                  │
//!     ▼                      ▼                  ▼
//!  Rejected               Rejected           Aborted (balances reverted)
//! ```
//!
//! Amount and self-transfer checks happen before any lock is taken. Checks
//! against live state (existence, status, currency, sufficient balance) run
//! inside the guarded section, on the same read the compare-and-set is based
//! on.
//!
//! # Atomicity
//!
//! Inside the guarded section the balance writes go first and the log append
//! last. If any later step fails, the earlier writes are reverted with
//! compensating compare-and-sets while the locks are still held, so callers
//! never observe a balance change without its record or the reverse. The
//! section is synchronous: once the locks are held it cannot be interrupted.
//!
//! # Thread Safety
//!
//! All methods take `&self`; share the processor through an `Arc`.

use crate::config::LedgerConfig;
use crate::core::account_store::InMemoryAccountStore;
use crate::core::guard::ConcurrencyGuard;
use crate::core::traits::{AccountStore, TransactionLog};
use crate::core::transaction_log::InMemoryTransactionLog;
use crate::notify::{AlertKind, NotificationDispatcher, NotificationEvent, TracingDispatcher};
use crate::types::{
    normalize_amount, Account, AccountNumber, AccountType, Currency, ErrorKind, LedgerError,
    OwnerId, Page, PageRequest, Transaction, TransactionDraft, TransactionType,
};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use std::fmt;
use std::slice;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Attempts at drawing an unused account number before giving up
pub const MAX_NUMBER_ATTEMPTS: usize = 16;

/// Supplier of candidate account numbers
pub trait AccountNumberSource: Send + Sync {
    fn next_number(&self) -> Result<AccountNumber, LedgerError>;
}

/// Uniformly random ten-digit numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomAccountNumbers;

impl AccountNumberSource for RandomAccountNumbers {
    fn next_number(&self) -> Result<AccountNumber, LedgerError> {
        let value = rand::thread_rng().gen_range(1_000_000_000u64..=9_999_999_999u64);
        AccountNumber::from_u64(value)
    }
}

/// Where a request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Received,
    Validated,
    Applied,
    Recorded,
    Notified,
    Rejected,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Applied => "applied",
            Stage::Recorded => "recorded",
            Stage::Notified => "notified",
            Stage::Rejected => "rejected",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Direction of a single balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Credit,
    Debit,
}

/// A balance write already applied inside the current guarded section
#[derive(Debug, Clone)]
struct Applied {
    previous: Decimal,
    account: Account,
}

/// Outcome of a committed single-account operation
type Committed = (Transaction, Vec<Applied>);

/// Validates and applies money movement against the ledger
pub struct TransactionProcessor {
    accounts: Arc<dyn AccountStore>,
    log: Arc<dyn TransactionLog>,
    guard: ConcurrencyGuard,
    dispatcher: Arc<dyn NotificationDispatcher>,
    numbers: Arc<dyn AccountNumberSource>,
    config: LedgerConfig,

    /// Alert tasks spawned after commit and not yet finished
    notifications: TaskTracker,
}

impl fmt::Debug for TransactionProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionProcessor")
            .field("config", &self.config)
            .field("guard", &self.guard)
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}

impl TransactionProcessor {
    /// Create a processor over the given stores
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        log: Arc<dyn TransactionLog>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            accounts,
            log,
            guard: ConcurrencyGuard::new(config.lock_timeout),
            dispatcher,
            numbers: Arc::new(RandomAccountNumbers),
            config,
            notifications: TaskTracker::new(),
        }
    }

    /// Processor over fresh in-memory stores that logs its alerts
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryTransactionLog::new()),
            Arc::new(TracingDispatcher),
            config,
        )
    }

    /// Replace the account number source
    pub fn with_number_source(mut self, numbers: Arc<dyn AccountNumberSource>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The account store this processor writes to
    pub fn account_store(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    /// The transaction log this processor appends to
    pub fn transaction_log(&self) -> &Arc<dyn TransactionLog> {
        &self.log
    }

    /// Open a new active account with a zero balance
    ///
    /// `currency` falls back to the configured default. Account numbers are
    /// drawn from the number source until an unused one is found.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::StorageFailure` if no unused number turned up
    /// within `MAX_NUMBER_ATTEMPTS` draws.
    pub async fn open_account(
        &self,
        owner: OwnerId,
        account_type: AccountType,
        currency: Option<Currency>,
    ) -> Result<Account, LedgerError> {
        let currency = currency.unwrap_or(self.config.default_currency);

        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let number = self.numbers.next_number()?;
            if self.accounts.contains(&number) {
                tracing::debug!(account = %number, attempt, "Account number taken, drawing again");
                continue;
            }

            match self
                .accounts
                .create(Account::new(number, owner, account_type, currency))
            {
                Ok(account) => {
                    tracing::info!(
                        account = %account.number,
                        owner,
                        currency = %currency,
                        "Account opened"
                    );
                    return Ok(account);
                }
                Err(LedgerError::DuplicateAccount { account }) => {
                    tracing::debug!(%account, attempt, "Account number taken at insert, drawing again");
                }
                Err(error) => return Err(error),
            }
        }

        Err(LedgerError::storage_failure(format!(
            "no unused account number after {} attempts",
            MAX_NUMBER_ATTEMPTS
        )))
    }

    /// Credit `amount` to an active account
    pub async fn deposit(
        &self,
        account: &AccountNumber,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        self.apply_single(TransactionType::Deposit, account, amount, description)
            .await
    }

    /// Debit `amount` from an active account with a sufficient balance
    pub async fn withdraw(
        &self,
        account: &AccountNumber,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        self.apply_single(TransactionType::Withdrawal, account, amount, description)
            .await
    }

    /// Move `amount` from `source` to `destination` as one unit
    ///
    /// Both accounts must be active and share a currency. The record is owned
    /// by the source account and names both sides.
    pub async fn transfer(
        &self,
        source: &AccountNumber,
        destination: &AccountNumber,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        tracing::debug!(
            stage = %Stage::Received,
            operation = "transfer",
            source = %source,
            destination = %destination,
            %amount
        );

        let amount = normalize_amount(amount).map_err(|e| self.fail("transfer", e))?;
        if source == destination {
            return Err(self.fail("transfer", LedgerError::self_transfer(source)));
        }
        tracing::debug!(stage = %Stage::Validated, operation = "transfer");

        let pair = [source.clone(), destination.clone()];
        let (transaction, applied) = self
            .guard
            .with_lock(&pair, || {
                let from = self.accounts.get(source)?;
                let to = self.accounts.get(destination)?;
                from.ensure_active()?;
                to.ensure_active()?;
                if from.currency != to.currency {
                    return Err(LedgerError::currency_mismatch(from.currency, to.currency));
                }

                let debited = self.change_balance(source, amount, Direction::Debit)?;
                let credited = match self.change_balance(destination, amount, Direction::Credit) {
                    Ok(credited) => credited,
                    Err(error) => {
                        self.compensate(slice::from_ref(&debited));
                        return Err(error);
                    }
                };
                let applied = vec![debited, credited];
                tracing::debug!(stage = %Stage::Applied, operation = "transfer");

                let draft = TransactionDraft::transfer(
                    source.clone(),
                    destination.clone(),
                    amount,
                    description,
                )
                .succeed();
                let transaction = self.record(draft, &applied)?;
                Ok((transaction, applied))
            })
            .await
            .map_err(|e| self.fail("transfer", e))?;

        tracing::info!(
            stage = %Stage::Recorded,
            transaction = %transaction.id,
            source = %source,
            destination = %destination,
            %amount,
            "Transfer committed"
        );

        self.dispatch(&transaction, &applied);
        Ok(transaction)
    }

    /// Close an active account whose balance is zero
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotEmpty` while the account holds funds and
    /// `LedgerError::AccountClosed` if it is already closed.
    pub async fn close_account(&self, account: &AccountNumber) -> Result<Account, LedgerError> {
        let closed = self
            .guard
            .with_lock(slice::from_ref(account), || {
                self.accounts.close(account, Utc::now())
            })
            .await
            .map_err(|e| self.fail("close", e))?;

        tracing::info!(account = %account, "Account closed");
        Ok(closed)
    }

    /// Committed balance of an account
    pub fn balance(&self, account: &AccountNumber) -> Result<Decimal, LedgerError> {
        Ok(self.accounts.get(account)?.balance)
    }

    /// Committed state of an account
    pub fn account(&self, account: &AccountNumber) -> Result<Account, LedgerError> {
        self.accounts.get(account)
    }

    /// Every account of one owner, oldest first
    pub fn accounts_of_owner(&self, owner: OwnerId) -> Vec<Account> {
        self.accounts.list_by_owner(owner)
    }

    /// Wait until every alert spawned so far has been handed to the dispatcher
    ///
    /// Requests never wait on their alerts. A runtime that is about to shut
    /// down calls this first, or the pending alert tasks are dropped with it.
    pub async fn drain_notifications(&self) {
        self.notifications.close();
        self.notifications.wait().await;
        self.notifications.reopen();
    }

    /// One page of the transactions owned by an account
    pub fn history(
        &self,
        account: &AccountNumber,
        request: &PageRequest,
    ) -> Result<Page<Transaction>, LedgerError> {
        if !self.accounts.contains(account) {
            return Err(LedgerError::account_not_found(account));
        }
        Ok(self.log.list_by_account(account, request))
    }

    async fn apply_single(
        &self,
        transaction_type: TransactionType,
        account: &AccountNumber,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        let operation = transaction_type.as_str();
        tracing::debug!(stage = %Stage::Received, operation, account = %account, %amount);

        let amount = normalize_amount(amount).map_err(|e| self.fail(operation, e))?;
        tracing::debug!(stage = %Stage::Validated, operation);

        let direction = match transaction_type {
            TransactionType::Withdrawal => Direction::Debit,
            _ => Direction::Credit,
        };

        let (transaction, applied): Committed = self
            .guard
            .with_lock(slice::from_ref(account), || {
                let applied = vec![self.change_balance(account, amount, direction)?];
                tracing::debug!(stage = %Stage::Applied, operation);

                let draft =
                    TransactionDraft::single(transaction_type, account.clone(), amount, description)
                        .succeed();
                let transaction = self.record(draft, &applied)?;
                Ok((transaction, applied))
            })
            .await
            .map_err(|e| self.fail(operation, e))?;

        tracing::info!(
            stage = %Stage::Recorded,
            transaction = %transaction.id,
            operation,
            account = %account,
            %amount,
            balance = %applied[0].account.balance,
            "Transaction committed"
        );

        self.dispatch(&transaction, &applied);
        Ok(transaction)
    }

    /// Read, check, compute and compare-and-set one balance
    ///
    /// A `Conflict` means some writer changed the balance between the read
    /// and the write; the read is repeated up to `max_retries` times before
    /// the request gives up with `Busy`.
    fn change_balance(
        &self,
        number: &AccountNumber,
        amount: Decimal,
        direction: Direction,
    ) -> Result<Applied, LedgerError> {
        let mut retries = 0;

        loop {
            let current = self.accounts.get(number)?;
            current.ensure_active()?;

            let new_balance = match direction {
                Direction::Credit => current
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::arithmetic_overflow("credit", number))?,
                Direction::Debit => {
                    if current.balance < amount {
                        return Err(LedgerError::insufficient_balance(
                            number,
                            current.balance,
                            amount,
                        ));
                    }
                    current.balance - amount
                }
            };

            match self
                .accounts
                .compare_and_set_balance(number, current.balance, new_balance)
            {
                Ok(account) => {
                    return Ok(Applied {
                        previous: current.balance,
                        account,
                    })
                }
                Err(LedgerError::Conflict { .. }) if retries < self.config.max_retries => {
                    retries += 1;
                    tracing::debug!(account = %number, retries, "Balance changed concurrently, retrying");
                }
                Err(LedgerError::Conflict { .. }) => {
                    return Err(LedgerError::busy(
                        slice::from_ref(number),
                        "compare-and-set retries exhausted",
                    ));
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Append the record, reverting `applied` if the log refuses it
    fn record(
        &self,
        draft: TransactionDraft,
        applied: &[Applied],
    ) -> Result<Transaction, LedgerError> {
        self.log.append(draft).map_err(|error| {
            self.compensate(applied);
            match error {
                LedgerError::StorageFailure { .. } => error,
                other => LedgerError::storage_failure(format!(
                    "transaction log append failed: {}",
                    other
                )),
            }
        })
    }

    /// Undo balance writes in reverse order
    fn compensate(&self, applied: &[Applied]) {
        for write in applied.iter().rev() {
            let number = &write.account.number;
            match self
                .accounts
                .compare_and_set_balance(number, write.account.balance, write.previous)
            {
                Ok(_) => {
                    tracing::debug!(account = %number, balance = %write.previous, "Balance reverted")
                }
                Err(error) => tracing::error!(
                    account = %number,
                    expected = %write.account.balance,
                    previous = %write.previous,
                    %error,
                    "Failed to revert balance"
                ),
            }
        }
    }

    fn fail(&self, operation: &str, error: LedgerError) -> LedgerError {
        let stage = match error.kind() {
            ErrorKind::Contention | ErrorKind::StorageFailure => Stage::Aborted,
            _ => Stage::Rejected,
        };
        tracing::debug!(stage = %stage, operation, %error);
        error
    }

    /// Tell the owners of every changed account, off the request path
    fn dispatch(&self, transaction: &Transaction, applied: &[Applied]) {
        let events: Vec<NotificationEvent> = applied
            .iter()
            .map(|write| NotificationEvent {
                kind: if write.account.balance >= write.previous {
                    AlertKind::CreditAlert
                } else {
                    AlertKind::DebitAlert
                },
                recipient: write.account.owner,
                account: write.account.number.clone(),
                amount: transaction.amount,
                resulting_balance: write.account.balance,
                transaction_id: transaction.id,
                timestamp: transaction.timestamp,
            })
            .collect();

        let dispatcher = Arc::clone(&self.dispatcher);
        let transaction_id = transaction.id;
        self.notifications.spawn(async move {
            for event in events {
                let recipient = event.recipient;
                if let Err(error) = dispatcher.notify(event).await {
                    tracing::warn!(
                        transaction = %transaction_id,
                        recipient,
                        %error,
                        "Notification failed"
                    );
                }
            }
            tracing::debug!(stage = %Stage::Notified, transaction = %transaction_id);
        });
    }
}
