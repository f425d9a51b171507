//! Library-level integration tests
//!
//! These drive the public API the way an embedding service would: through
//! `TransactionProcessor` and `BankingService`, with custom storage and
//! notification implementations plugged in where a test needs failures.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_ledger_engine::core::{
    InMemoryAccountStore, InMemoryTransactionLog, ReplayEngine, TransactionLog,
};
use rust_ledger_engine::io::{OperationRecord, OperationType};
use rust_ledger_engine::notify::{
    ChannelDispatcher, NotificationDispatcher, NotificationError, NotificationEvent,
    TracingDispatcher,
};
use rust_ledger_engine::types::{Page, PageRequest, TransactionDraft, TransactionId};
use rust_ledger_engine::{
    Account, AccountNumber, AccountStatus, AccountType, BankingService, LedgerConfig, LedgerError,
    Transaction, TransactionProcessor,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

async fn open_funded(processor: &TransactionProcessor, owner: u64, cents: i64) -> Account {
    let account = processor
        .open_account(owner, AccountType::Savings, None)
        .await
        .unwrap();
    if cents > 0 {
        processor
            .deposit(&account.number, dollars(cents), None)
            .await
            .unwrap();
    }
    account
}

/// Log that refuses appends while `failing` is set
#[derive(Default)]
struct FlakyLog {
    inner: InMemoryTransactionLog,
    failing: AtomicBool,
}

impl TransactionLog for FlakyLog {
    fn append(&self, draft: TransactionDraft) -> Result<Transaction, LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::storage_failure("disk full"));
        }
        self.inner.append(draft)
    }

    fn list_by_account(&self, account: &AccountNumber, request: &PageRequest) -> Page<Transaction> {
        self.inner.list_by_account(account, request)
    }

    fn get(&self, id: &TransactionId) -> Option<Transaction> {
        self.inner.get(id)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Dispatcher whose transport is always down
#[derive(Default)]
struct UnreachableDispatcher {
    attempts: AtomicUsize,
}

#[async_trait]
impl NotificationDispatcher for UnreachableDispatcher {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotificationError::Delivery {
            recipient: event.recipient,
            message: "smtp unreachable".to_string(),
        })
    }
}

#[tokio::test]
async fn test_reference_scenario() {
    let processor = TransactionProcessor::in_memory(LedgerConfig::default());
    let a = open_funded(&processor, 1, 0).await;
    let b = open_funded(&processor, 2, 0).await;

    processor.deposit(&a.number, dollars(10000), None).await.unwrap();
    processor
        .transfer(&a.number, &b.number, dollars(4000), None)
        .await
        .unwrap();
    let error = processor
        .withdraw(&b.number, dollars(100000), None)
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), 400);
    assert_eq!(processor.balance(&a.number).unwrap(), dollars(6000));
    assert_eq!(processor.balance(&b.number).unwrap(), dollars(4000));
    assert_eq!(processor.transaction_log().len(), 2);
}

#[tokio::test]
async fn test_random_operations_conserve_money() {
    let processor = TransactionProcessor::in_memory(LedgerConfig::default());
    let mut accounts = Vec::new();
    for owner in 1..=4 {
        accounts.push(open_funded(&processor, owner, 0).await.number);
    }

    let mut rng = StdRng::seed_from_u64(42);
    let mut external = Decimal::ZERO;

    for _ in 0..500 {
        let amount = dollars(rng.gen_range(1..5_000));
        let from = &accounts[rng.gen_range(0..accounts.len())];
        let to = &accounts[rng.gen_range(0..accounts.len())];

        match rng.gen_range(0..3) {
            0 => {
                if processor.deposit(from, amount, None).await.is_ok() {
                    external += amount;
                }
            }
            1 => {
                if processor.withdraw(from, amount, None).await.is_ok() {
                    external -= amount;
                }
            }
            _ => {
                let _ = processor.transfer(from, to, amount, None).await;
            }
        }

        let total: Decimal = accounts
            .iter()
            .map(|number| processor.balance(number).unwrap())
            .sum();
        assert_eq!(total, external);
        assert!(accounts
            .iter()
            .all(|number| processor.balance(number).unwrap() >= Decimal::ZERO));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_transfers_do_not_deadlock() {
    let processor = Arc::new(TransactionProcessor::in_memory(LedgerConfig::default()));
    let a = open_funded(&processor, 1, 100_000).await.number;
    let b = open_funded(&processor, 2, 100_000).await.number;

    let mut tasks = Vec::new();
    for i in 0..100 {
        let processor = Arc::clone(&processor);
        let (from, to) = if i % 2 == 0 {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        tasks.push(tokio::spawn(async move {
            processor.transfer(&from, &to, dollars(100), None).await.is_ok()
        }));
    }

    let joined = tokio::time::timeout(Duration::from_secs(30), futures::future::join_all(tasks))
        .await
        .expect("transfers deadlocked");
    let committed = joined.into_iter().filter(|r| *r.as_ref().unwrap()).count();

    let total = processor.balance(&a).unwrap() + processor.balance(&b).unwrap();
    assert_eq!(total, dollars(200_000));
    assert_eq!(processor.transaction_log().len(), 2 + committed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() {
    const DEBITS: usize = 20;

    let processor = Arc::new(TransactionProcessor::in_memory(LedgerConfig::default()));
    let source = open_funded(&processor, 1, 500 * DEBITS as i64).await.number;
    let sink = open_funded(&processor, 2, 0).await.number;

    let observer = {
        let processor = Arc::clone(&processor);
        let source = source.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                assert!(processor.balance(&source).unwrap() >= Decimal::ZERO);
                tokio::task::yield_now().await;
            }
        })
    };

    // twice as many debits of 5.00 as the balance covers
    let mut tasks = Vec::new();
    for i in 0..2 * DEBITS {
        let processor = Arc::clone(&processor);
        let (source, sink) = (source.clone(), sink.clone());
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                (false, processor.withdraw(&source, dollars(500), None).await)
            } else {
                (true, processor.transfer(&source, &sink, dollars(500), None).await)
            }
        }));
    }

    let mut committed = 0;
    let mut transfers = 0;
    for task in tasks {
        let (is_transfer, result) = task.await.unwrap();
        match result {
            Ok(_) => {
                committed += 1;
                if is_transfer {
                    transfers += 1;
                }
            }
            Err(error) => assert!(
                matches!(error, LedgerError::InsufficientBalance { .. }),
                "unexpected error: {}",
                error
            ),
        }
    }
    observer.await.unwrap();

    assert_eq!(committed, DEBITS);
    assert_eq!(processor.balance(&source).unwrap(), Decimal::ZERO);
    assert_eq!(processor.balance(&sink).unwrap(), dollars(500 * transfers));
    assert_eq!(processor.transaction_log().len(), 1 + DEBITS);
}

#[test]
fn test_replay_alerts_reach_dispatcher_before_shutdown() {
    let (dispatcher, mut receiver) = ChannelDispatcher::new();
    let processor = TransactionProcessor::new(
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryTransactionLog::new()),
        Arc::new(dispatcher),
        LedgerConfig::default(),
    );
    let engine = ReplayEngine::new(Arc::new(processor));

    let record = |op_type, account: &str, destination: Option<&str>, cents: Option<i64>| {
        OperationRecord {
            op_type,
            account: account.to_string(),
            destination: destination.map(str::to_string),
            amount: cents.map(dollars),
            owner: Some(1),
            currency: None,
            description: None,
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        engine.apply(&record(OperationType::Open, "a", None, None)).await.unwrap();
        engine.apply(&record(OperationType::Open, "b", None, None)).await.unwrap();
        for _ in 0..10 {
            engine
                .apply(&record(OperationType::Deposit, "a", None, Some(100)))
                .await
                .unwrap();
        }
        engine
            .apply(&record(OperationType::Transfer, "a", Some("b"), Some(500)))
            .await
            .unwrap();
        engine.processor().drain_notifications().await;
    });
    drop(runtime);

    let mut delivered = 0;
    while receiver.try_recv().is_ok() {
        delivered += 1;
    }
    // ten deposits plus both legs of the transfer
    assert_eq!(delivered, 12);
}

#[tokio::test]
async fn test_log_failure_leaves_balances_untouched() {
    let log = Arc::new(FlakyLog::default());
    let processor = TransactionProcessor::new(
        Arc::new(InMemoryAccountStore::new()),
        log.clone(),
        Arc::new(TracingDispatcher),
        LedgerConfig::default(),
    );
    let a = open_funded(&processor, 1, 5_000).await.number;
    let b = open_funded(&processor, 2, 0).await.number;

    log.failing.store(true, Ordering::SeqCst);

    let deposit = processor.deposit(&a, dollars(100), None).await.unwrap_err();
    let transfer = processor
        .transfer(&a, &b, dollars(1_000), None)
        .await
        .unwrap_err();

    assert!(matches!(deposit, LedgerError::StorageFailure { .. }));
    assert_eq!(transfer.status_code(), 500);
    assert_eq!(processor.balance(&a).unwrap(), dollars(5_000));
    assert_eq!(processor.balance(&b).unwrap(), Decimal::ZERO);
    assert_eq!(log.len(), 1);

    log.failing.store(false, Ordering::SeqCst);
    processor.transfer(&a, &b, dollars(1_000), None).await.unwrap();
    assert_eq!(processor.balance(&b).unwrap(), dollars(1_000));
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_operation() {
    let dispatcher = Arc::new(UnreachableDispatcher::default());
    let processor = TransactionProcessor::new(
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryTransactionLog::new()),
        dispatcher.clone(),
        LedgerConfig::default(),
    );
    let a = open_funded(&processor, 1, 0).await.number;

    let transaction = processor.deposit(&a, dollars(2_500), None).await.unwrap();

    assert_eq!(transaction.amount, dollars(2_500));
    assert_eq!(processor.balance(&a).unwrap(), dollars(2_500));

    tokio::time::timeout(Duration::from_secs(5), async {
        while dispatcher.attempts.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("notification was never attempted");
}

#[rstest]
#[case::deposit("deposit")]
#[case::withdrawal("withdrawal")]
#[tokio::test]
async fn test_closed_account_refuses_money(#[case] operation: &str) {
    let processor = TransactionProcessor::in_memory(LedgerConfig::default());
    let account = open_funded(&processor, 1, 0).await.number;
    let closed = processor.close_account(&account).await.unwrap();
    assert_eq!(closed.status, AccountStatus::Closed);
    assert!(closed.closed_at.is_some());

    let result = match operation {
        "deposit" => processor.deposit(&account, dollars(100), None).await,
        _ => processor.withdraw(&account, dollars(100), None).await,
    };

    assert!(matches!(result, Err(LedgerError::AccountClosed { .. })));
    assert_eq!(processor.account(&account).unwrap().balance, Decimal::ZERO);
}

#[tokio::test]
async fn test_service_envelope_serialization() {
    let service = BankingService::new(Arc::new(TransactionProcessor::in_memory(
        LedgerConfig::default(),
    )));

    let missing = serde_json::to_value(service.get_balance("9999999999")).unwrap();
    assert_eq!(missing["statusCode"], 404);
    assert!(missing.get("data").is_none());

    let account = service
        .open_account(5, AccountType::Current, None)
        .await
        .data
        .unwrap();
    for cents in [100, 200, 300, 400, 500] {
        service
            .apply_deposit(account.number.as_str(), dollars(cents), None)
            .await;
    }

    let page = serde_json::to_value(service.transaction_history(account.number.as_str(), 1, 2))
        .unwrap();
    assert_eq!(page["statusCode"], 200);
    assert_eq!(page["meta"]["totalItems"], 5);
    assert_eq!(page["meta"]["totalPages"], 3);
    assert_eq!(page["data"].as_array().map(Vec::len), Some(2));
}
