//! Ledger configuration
//!
//! Tunables of the money-movement core. Populated from CLI arguments (which
//! also read environment variables) or built directly by library users.

use crate::types::Currency;
use std::time::Duration;

/// Configuration for the transaction processor and concurrency guard
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerConfig {
    /// Upper bound on the wait for all locks of one operation
    pub lock_timeout: Duration,

    /// Compare-and-set retries before a conflict surfaces as `Busy`
    pub max_retries: u32,

    /// Currency used when an account is opened without one
    pub default_currency: Currency,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
            max_retries: 3,
            default_currency: Currency::Usd,
        }
    }
}

impl LedgerConfig {
    /// Create a new LedgerConfig with custom values
    ///
    /// A zero lock timeout would turn every contended request into an
    /// immediate `Busy`, so it falls back to the default with a warning.
    /// Zero retries is allowed: the first conflict surfaces as `Busy`.
    pub fn new(lock_timeout: Duration, max_retries: u32, default_currency: Currency) -> Self {
        let default = Self::default();

        let lock_timeout = if lock_timeout.is_zero() {
            tracing::warn!(
                default_ms = default.lock_timeout.as_millis() as u64,
                "Invalid lock_timeout (0), using default"
            );
            default.lock_timeout
        } else {
            lock_timeout
        };

        Self {
            lock_timeout,
            max_retries,
            default_currency,
        }
    }
}
