//! CSV format handling for replay operations and ledger output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to `OperationRecord`s
//! - Account state and transaction journal serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::core::replay::LabeledAccount;
use crate::types::{Currency, LedgerError, OwnerId, Transaction};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Operations a replay file can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Open,
    Deposit,
    Withdrawal,
    Transfer,
    Close,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Open => "open",
            OperationType::Deposit => "deposit",
            OperationType::Withdrawal => "withdrawal",
            OperationType::Transfer => "transfer",
            OperationType::Close => "close",
        };
        f.write_str(name)
    }
}

/// CSV record structure for deserialization
///
/// Columns: type, account, destination, amount, owner, currency, description.
/// Everything but the type and account label is optional because each
/// operation only uses some of the columns.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    pub account: String,
    pub destination: Option<String>,
    pub amount: Option<String>,
    pub owner: Option<String>,
    pub currency: Option<String>,
    pub description: Option<String>,
}

/// A validated replay operation
///
/// Accounts are referred to by caller-chosen labels; the replay engine maps
/// them to the account numbers the ledger generates.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    pub op_type: OperationType,
    pub account: String,
    pub destination: Option<String>,
    pub amount: Option<Decimal>,
    pub owner: Option<OwnerId>,
    pub currency: Option<Currency>,
    pub description: Option<String>,
}

impl OperationRecord {
    /// Every account label this operation touches
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.account.as_str()).chain(self.destination.as_deref())
    }
}

fn parse_error(message: String) -> LedgerError {
    LedgerError::ParseError {
        line: None,
        message,
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Convert a CsvRecord to an OperationRecord
///
/// This function:
/// - Parses the operation type (case-insensitive)
/// - Parses amount, owner and currency when present
/// - Checks that each operation carries the columns it needs
///
/// Amount sign and precision are left to the ledger, which rejects them with
/// the same errors any other caller would get.
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<OperationRecord, LedgerError> {
    let op_type = match csv_record.op_type.trim().to_lowercase().as_str() {
        "open" => OperationType::Open,
        "deposit" => OperationType::Deposit,
        "withdrawal" => OperationType::Withdrawal,
        "transfer" => OperationType::Transfer,
        "close" => OperationType::Close,
        _ => return Err(LedgerError::invalid_transaction_type(&csv_record.op_type)),
    };

    let account = csv_record.account.trim().to_string();
    if account.is_empty() {
        return Err(LedgerError::missing_field("account"));
    }

    let amount = match non_empty(csv_record.amount) {
        Some(raw) => Some(Decimal::from_str(&raw).map_err(|_| {
            parse_error(format!("Invalid amount '{}' for {} on '{}'", raw, op_type, account))
        })?),
        None => None,
    };

    let owner = match non_empty(csv_record.owner) {
        Some(raw) => Some(raw.parse::<OwnerId>().map_err(|_| {
            parse_error(format!("Invalid owner '{}' for '{}'", raw, account))
        })?),
        None => None,
    };

    let currency = match non_empty(csv_record.currency) {
        Some(raw) => Some(Currency::from_str(&raw).map_err(parse_error)?),
        None => None,
    };

    let destination = non_empty(csv_record.destination);

    match op_type {
        OperationType::Open if owner.is_none() => return Err(LedgerError::missing_field("owner")),
        OperationType::Deposit | OperationType::Withdrawal | OperationType::Transfer
            if amount.is_none() =>
        {
            return Err(LedgerError::missing_field("amount"))
        }
        OperationType::Transfer if destination.is_none() => {
            return Err(LedgerError::missing_field("destination"))
        }
        _ => {}
    }

    Ok(OperationRecord {
        op_type,
        account,
        destination,
        amount,
        owner,
        currency,
        description: non_empty(csv_record.description),
    })
}

/// Write account states to CSV format
///
/// Columns: account, number, owner, currency, status, balance. Rows are
/// sorted by label for deterministic output and balances carry two decimals.
pub fn write_accounts_csv(
    accounts: &[LabeledAccount],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "number", "owner", "currency", "status", "balance"])?;

    let mut sorted = accounts.to_vec();
    sorted.sort_by(|a, b| a.label.cmp(&b.label));

    for entry in sorted {
        writer.write_record(&[
            entry.label,
            entry.account.number.to_string(),
            entry.account.owner.to_string(),
            entry.account.currency.to_string(),
            entry.account.status.to_string(),
            format!("{:.2}", entry.account.balance),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write committed transactions to CSV format, in the given order
///
/// Columns: id, type, account, source, destination, amount, status,
/// timestamp (RFC 3339), description.
pub fn write_transactions_csv(
    transactions: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record([
        "id",
        "type",
        "account",
        "source",
        "destination",
        "amount",
        "status",
        "timestamp",
        "description",
    ])?;

    for transaction in transactions {
        writer.write_record(&[
            transaction.id.to_string(),
            transaction.transaction_type.to_string(),
            transaction.account.to_string(),
            transaction
                .source_account
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            transaction
                .destination_account
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            format!("{:.2}", transaction.amount),
            transaction.status.to_string(),
            transaction.timestamp.to_rfc3339(),
            transaction.description.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, AccountNumber, AccountType, TransactionDraft, TransactionType};
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn csv_record(
        op_type: &str,
        account: &str,
        destination: Option<&str>,
        amount: Option<&str>,
        owner: Option<&str>,
    ) -> CsvRecord {
        CsvRecord {
            op_type: op_type.to_string(),
            account: account.to_string(),
            destination: destination.map(str::to_string),
            amount: amount.map(str::to_string),
            owner: owner.map(str::to_string),
            currency: None,
            description: None,
        }
    }

    #[rstest]
    #[case("open", OperationType::Open)]
    #[case("DEPOSIT", OperationType::Deposit)] // case insensitive
    #[case("Withdrawal", OperationType::Withdrawal)]
    #[case("transfer", OperationType::Transfer)]
    #[case("close", OperationType::Close)]
    fn test_convert_csv_record_types(#[case] op_type: &str, #[case] expected: OperationType) {
        let record = convert_csv_record(csv_record(
            op_type,
            "alice",
            Some("bob"),
            Some("10.00"),
            Some("1"),
        ))
        .unwrap();

        assert_eq!(record.op_type, expected);
        assert_eq!(record.account, "alice");
        assert_eq!(record.amount, Some(Decimal::new(1000, 2)));
        assert_eq!(record.owner, Some(1));
    }

    #[rstest]
    #[case::unknown_type(csv_record("reversal", "alice", None, Some("1.00"), None))]
    #[case::missing_owner(csv_record("open", "alice", None, None, None))]
    #[case::missing_amount(csv_record("deposit", "alice", None, None, None))]
    #[case::blank_amount(csv_record("withdrawal", "alice", None, Some("  "), None))]
    #[case::missing_destination(csv_record("transfer", "alice", None, Some("1.00"), None))]
    #[case::bad_amount(csv_record("deposit", "alice", None, Some("ten"), None))]
    #[case::bad_owner(csv_record("open", "alice", None, None, Some("-4")))]
    #[case::blank_account(csv_record("close", " ", None, None, None))]
    fn test_convert_csv_record_rejects(#[case] record: CsvRecord) {
        assert!(convert_csv_record(record).is_err());
    }

    #[test]
    fn test_convert_csv_record_currency() {
        let mut record = csv_record("open", "alice", None, None, Some("7"));
        record.currency = Some("eur".to_string());

        let converted = convert_csv_record(record).unwrap();
        assert_eq!(converted.currency, Some(Currency::Eur));

        let mut record = csv_record("open", "alice", None, None, Some("7"));
        record.currency = Some("JPY".to_string());
        assert!(matches!(
            convert_csv_record(record),
            Err(LedgerError::ParseError { .. })
        ));
    }

    #[test]
    fn test_labels_include_destination() {
        let record = convert_csv_record(csv_record(
            "transfer",
            "alice",
            Some("bob"),
            Some("5.00"),
            None,
        ))
        .unwrap();

        assert_eq!(record.labels().collect::<Vec<_>>(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_write_accounts_csv_sorted_by_label() {
        let mut bob = Account::new(
            AccountNumber::from_u64(2_222_222_222).unwrap(),
            2,
            AccountType::Savings,
            Currency::Usd,
        );
        bob.balance = Decimal::new(40, 0);
        let alice = Account::new(
            AccountNumber::from_u64(1_111_111_111).unwrap(),
            1,
            AccountType::Savings,
            Currency::Eur,
        );

        let accounts = vec![
            LabeledAccount {
                label: "bob".to_string(),
                account: bob,
            },
            LabeledAccount {
                label: "alice".to_string(),
                account: alice,
            },
        ];

        let mut output = Vec::new();
        write_accounts_csv(&accounts, &mut output).unwrap();

        let expected = "account,number,owner,currency,status,balance\n\
                        alice,1111111111,1,EUR,ACTIVE,0.00\n\
                        bob,2222222222,2,USD,ACTIVE,40.00\n";
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn test_write_transactions_csv() {
        let draft = TransactionDraft::transfer(
            AccountNumber::from_u64(1_111_111_111).unwrap(),
            AccountNumber::from_u64(2_222_222_222).unwrap(),
            Decimal::new(4000, 2),
            Some("rent".to_string()),
        )
        .succeed();
        let transaction = Transaction::from_draft(draft, Uuid::nil(), Utc::now());

        let mut output = Vec::new();
        write_transactions_csv(&[transaction], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with(
            "00000000-0000-0000-0000-000000000000,transfer,1111111111,1111111111,2222222222,40.00,SUCCESS,"
        ));
        assert!(row.ends_with(",rent"));
        assert_eq!(TransactionType::Transfer.to_string(), "transfer");
    }
}
