//! Request-handling layer
//!
//! `BankingService` is the inbound contract of the ledger. It takes raw
//! request values (account numbers as strings, paging as integers), calls
//! the [`TransactionProcessor`] and wraps every outcome in the
//! [`Response`] envelope: `200` with data on success, the error's status code
//! and message otherwise. Authentication and ownership checks happen before a
//! request reaches this layer.

use crate::core::processor::TransactionProcessor;
use crate::types::{
    Account, AccountNumber, AccountType, Currency, LedgerError, OwnerId, PageMeta, PageRequest,
    Response, Transaction, TransactionRequest, TransactionType,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Envelope-returning facade over the transaction processor
#[derive(Debug, Clone)]
pub struct BankingService {
    processor: Arc<TransactionProcessor>,
}

fn respond<T>(message: &str, result: Result<T, LedgerError>) -> Response<T> {
    match result {
        Ok(data) => Response::ok(message, data),
        Err(error) => {
            tracing::debug!(status = error.status_code(), %error, "Request failed");
            Response::from(error)
        }
    }
}

impl BankingService {
    pub fn new(processor: Arc<TransactionProcessor>) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &Arc<TransactionProcessor> {
        &self.processor
    }

    pub async fn apply_deposit(
        &self,
        account_number: &str,
        amount: Decimal,
        description: Option<String>,
    ) -> Response<Transaction> {
        let result = match AccountNumber::parse(account_number) {
            Ok(number) => self.processor.deposit(&number, amount, description).await,
            Err(error) => Err(error),
        };
        respond("Deposit successful", result)
    }

    pub async fn apply_withdrawal(
        &self,
        account_number: &str,
        amount: Decimal,
        description: Option<String>,
    ) -> Response<Transaction> {
        let result = match AccountNumber::parse(account_number) {
            Ok(number) => self.processor.withdraw(&number, amount, description).await,
            Err(error) => Err(error),
        };
        respond("Withdrawal successful", result)
    }

    pub async fn apply_transfer(
        &self,
        source: &str,
        destination: &str,
        amount: Decimal,
        description: Option<String>,
    ) -> Response<Transaction> {
        let result = match (AccountNumber::parse(source), AccountNumber::parse(destination)) {
            (Ok(source), Ok(destination)) => {
                self.processor
                    .transfer(&source, &destination, amount, description)
                    .await
            }
            (Err(error), _) | (_, Err(error)) => Err(error),
        };
        respond("Transfer successful", result)
    }

    /// Execute a generic request, dispatching on its `transactionType`
    ///
    /// An unrecognized type is answered with `400` and touches nothing.
    pub async fn create_transaction(&self, request: TransactionRequest) -> Response<Transaction> {
        let transaction_type = match request.transaction_type.parse::<TransactionType>() {
            Ok(transaction_type) => transaction_type,
            Err(error) => return respond("Transaction successful", Err(error)),
        };

        let response = match transaction_type {
            TransactionType::Deposit => {
                self.apply_deposit(&request.account_number, request.amount, request.description)
                    .await
            }
            TransactionType::Withdrawal => {
                self.apply_withdrawal(&request.account_number, request.amount, request.description)
                    .await
            }
            TransactionType::Transfer => match request.destination_account_number {
                Some(destination) => {
                    self.apply_transfer(
                        &request.account_number,
                        &destination,
                        request.amount,
                        request.description,
                    )
                    .await
                }
                None => Response::from(LedgerError::missing_field("destinationAccountNumber")),
            },
        };

        if response.is_success() {
            Response {
                message: "Transaction successful".to_string(),
                ..response
            }
        } else {
            response
        }
    }

    pub async fn open_account(
        &self,
        owner: OwnerId,
        account_type: AccountType,
        currency: Option<Currency>,
    ) -> Response<Account> {
        let result = self
            .processor
            .open_account(owner, account_type, currency)
            .await;
        respond("Account created successfully", result)
    }

    pub async fn close_account(&self, account_number: &str) -> Response<Account> {
        let result = match AccountNumber::parse(account_number) {
            Ok(number) => self.processor.close_account(&number).await,
            Err(error) => Err(error),
        };
        respond("Account closed successfully", result)
    }

    pub fn get_balance(&self, account_number: &str) -> Response<Decimal> {
        let result = AccountNumber::parse(account_number)
            .and_then(|number| self.processor.balance(&number));
        respond("Balance fetched successfully", result)
    }

    pub fn get_account(&self, account_number: &str) -> Response<Account> {
        let result = AccountNumber::parse(account_number)
            .and_then(|number| self.processor.account(&number));
        respond("Account found", result)
    }

    pub fn accounts_of_owner(&self, owner: OwnerId) -> Response<Vec<Account>> {
        Response::ok(
            "User accounts fetched successfully",
            self.processor.accounts_of_owner(owner),
        )
    }

    /// Newest-first page of an account's transactions, with paging metadata
    pub fn transaction_history(
        &self,
        account_number: &str,
        page: usize,
        size: usize,
    ) -> Response<Vec<Transaction>> {
        let request = PageRequest::newest_first(page, size);
        let result = AccountNumber::parse(account_number)
            .and_then(|number| self.processor.history(&number, &request));

        match result {
            Ok(page) => {
                let meta = PageMeta::from(&page);
                Response::ok("Transactions retrieved", page.items).with_meta(meta)
            }
            Err(error) => respond("Transactions retrieved", Err(error)),
        }
    }
}
