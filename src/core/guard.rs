//! Per-account exclusive locking
//!
//! `ConcurrencyGuard` hands out scoped exclusive locks on sets of accounts.
//! Every acquisition sorts and de-duplicates the requested accounts and locks
//! them in that canonical order, so two operations touching the same pair of
//! accounts can never wait on each other in a cycle. The whole acquisition
//! shares one deadline; when it passes, the locks taken so far are released
//! and the caller gets `Busy`.
//!
//! Locks are `tokio` mutexes kept in a lazily populated `DashMap`, one per
//! account number. A [`LockSet`] owns its guards and releases them on drop,
//! so every exit path of a guarded section unlocks.

use crate::types::{AccountNumber, LedgerError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{timeout_at, Instant};

/// Exclusive hold on a set of accounts
///
/// Dropping the set releases every lock it holds.
#[derive(Debug)]
pub struct LockSet {
    accounts: Vec<AccountNumber>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl LockSet {
    /// Locked accounts, in the order they were acquired
    pub fn accounts(&self) -> &[AccountNumber] {
        &self.accounts
    }
}

/// Ordered, bounded-wait lock table keyed by account number
#[derive(Debug)]
pub struct ConcurrencyGuard {
    /// One mutex per account, created on first use
    locks: DashMap<AccountNumber, Arc<Mutex<()>>>,

    /// Upper bound on the wait for a whole lock set
    timeout: Duration,
}

impl ConcurrencyGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    fn lock_for(&self, number: &AccountNumber) -> Arc<Mutex<()>> {
        // clone the Arc out so the shard lock is not held across an await
        Arc::clone(self.locks.entry(number.clone()).or_default().value())
    }

    /// Lock every account in `accounts`
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Busy` if the locks are not all held before the
    /// deadline. Nothing stays locked in that case.
    pub async fn acquire(&self, accounts: &[AccountNumber]) -> Result<LockSet, LedgerError> {
        let mut ordered = accounts.to_vec();
        ordered.sort();
        ordered.dedup();

        let deadline = Instant::now() + self.timeout;
        let mut guards = Vec::with_capacity(ordered.len());

        for number in &ordered {
            let mutex = self.lock_for(number);
            match timeout_at(deadline, mutex.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    tracing::debug!(
                        account = %number,
                        held = guards.len(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Lock wait timed out"
                    );
                    return Err(LedgerError::busy(&ordered, "lock wait timed out"));
                }
            }
        }

        Ok(LockSet {
            accounts: ordered,
            _guards: guards,
        })
    }

    /// Run `f` while holding the locks of `accounts`
    ///
    /// `f` is synchronous, so once the locks are held the section runs to
    /// completion; only the wait for the locks can be abandoned.
    pub async fn with_lock<T, F>(&self, accounts: &[AccountNumber], f: F) -> Result<T, LedgerError>
    where
        F: FnOnce() -> Result<T, LedgerError>,
    {
        let _locks = self.acquire(accounts).await?;
        f()
    }

    /// Number of accounts that have been locked at least once
    pub fn tracked_accounts(&self) -> usize {
        self.locks.len()
    }
}
