//! Account-related types for the ledger
//!
//! This module defines the Account structure, the account number format and
//! the small enums that describe an account's kind, currency and lifecycle.

use super::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Owner identifier
///
/// Opaque foreign key of the user that owns an account. Identity resolution
/// happens outside the ledger; the core only carries the value around.
pub type OwnerId = u64;

/// Number of digits in an account number
pub const ACCOUNT_NUMBER_DIGITS: usize = 10;

/// Unique, system-generated account number
///
/// Always exactly ten ASCII digits with a non-zero first digit. Because every
/// number has the same width, the derived lexicographic ordering is also the
/// numeric ordering, which the concurrency guard relies on for its global
/// lock order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Parse and validate an account number
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAccountNumber` if the value is not ten
    /// digits or starts with `0`.
    pub fn parse(value: &str) -> Result<Self, LedgerError> {
        let value = value.trim();
        let well_formed = value.len() == ACCOUNT_NUMBER_DIGITS
            && value.bytes().all(|b| b.is_ascii_digit())
            && !value.starts_with('0');

        if !well_formed {
            return Err(LedgerError::invalid_account_number(value));
        }

        Ok(Self(value.to_string()))
    }

    /// Build an account number from its numeric value
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAccountNumber` if the value is outside
    /// `1_000_000_000..=9_999_999_999`.
    pub fn from_u64(value: u64) -> Result<Self, LedgerError> {
        Self::parse(&value.to_string())
    }

    /// The account number as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

/// Kind of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Savings,
    Current,
}

/// Currency an account is denominated in
///
/// Fixed when the account is opened. The ledger never converts between
/// currencies, so transfers require both accounts to share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            other => Err(format!("unsupported currency '{}'", other)),
        }
    }
}

/// Lifecycle state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    /// Accepts deposits, withdrawals and transfers
    Active,

    /// Terminal state; balance is zero and no mutation is accepted
    Closed,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => f.write_str("ACTIVE"),
            AccountStatus::Closed => f.write_str("CLOSED"),
        }
    }
}

/// Ledger account
///
/// Mutated only by the transaction processor (balance) and by the close
/// transition (status). Never physically deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique account number
    pub number: AccountNumber,

    /// User that owns the account
    pub owner: OwnerId,

    /// Savings or current account
    pub account_type: AccountType,

    /// Current balance, scale 2, never negative
    pub balance: Decimal,

    /// Denomination, fixed at creation
    pub currency: Currency,

    /// Active or closed
    pub status: AccountStatus,

    pub created_at: DateTime<Utc>,

    pub closed_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a new active account with a zero balance
    pub fn new(
        number: AccountNumber,
        owner: OwnerId,
        account_type: AccountType,
        currency: Currency,
    ) -> Self {
        Account {
            number,
            owner,
            account_type,
            balance: Decimal::new(0, 2),
            currency,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    /// Whether the account still accepts mutations
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Fail with `AccountClosed` unless the account is active
    pub fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(LedgerError::account_closed(&self.number))
        }
    }
}
