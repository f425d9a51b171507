//! Outbound notifications
//!
//! After a balance-changing operation commits, the processor tells the
//! account owners about it through a [`NotificationDispatcher`]. Delivery is
//! fire-and-forget: events are sent from a spawned task, and a failed
//! delivery is logged and dropped without touching the committed operation.
//!
//! # Implementations
//!
//! - [`TracingDispatcher`]: emits each alert as a `tracing` event (default)
//! - [`ChannelDispatcher`]: forwards alerts over a `tokio` mpsc channel to
//!   whatever delivers them (mail worker, tests)

use crate::types::{AccountNumber, OwnerId, TransactionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Direction of the balance change an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// Funds arrived (deposit, incoming transfer)
    CreditAlert,

    /// Funds left (withdrawal, outgoing transfer)
    DebitAlert,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::CreditAlert => f.write_str("credit"),
            AlertKind::DebitAlert => f.write_str("debit"),
        }
    }
}

/// One alert for one account owner
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub kind: AlertKind,
    pub recipient: OwnerId,
    pub account: AccountNumber,
    pub amount: Decimal,

    /// Balance of `account` right after the operation committed
    pub resulting_balance: Decimal,

    pub transaction_id: TransactionId,
    pub timestamp: DateTime<Utc>,
}

/// Delivery failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotificationError {
    /// The receiving side of the channel is gone
    #[error("Notification channel is closed")]
    ChannelClosed,

    /// The downstream transport rejected the alert
    #[error("Failed to notify owner {recipient}: {message}")]
    Delivery {
        /// Owner the alert was meant for
        recipient: OwnerId,
        /// Description of the failure
        message: String,
    },
}

/// Sink for post-commit alerts
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotificationError>;
}

/// Logs every alert and never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotificationError> {
        tracing::info!(
            kind = %event.kind,
            recipient = event.recipient,
            account = %event.account,
            amount = %event.amount,
            balance = %event.resulting_balance,
            transaction = %event.transaction_id,
            "Account alert"
        );
        Ok(())
    }
}

/// Forwards alerts to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiver its alerts arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationDispatcher for ChannelDispatcher {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotificationError> {
        self.sender
            .send(event)
            .map_err(|_| NotificationError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn event() -> NotificationEvent {
        NotificationEvent {
            kind: AlertKind::CreditAlert,
            recipient: 7,
            account: AccountNumber::from_u64(1_234_567_890).unwrap(),
            amount: Decimal::new(10000, 2),
            resulting_balance: Decimal::new(10000, 2),
            transaction_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_channel_dispatcher_forwards_events() {
        let (dispatcher, mut receiver) = ChannelDispatcher::new();
        let sent = event();

        dispatcher.notify(sent.clone()).await.unwrap();

        assert_eq!(receiver.recv().await, Some(sent));
    }

    #[tokio::test]
    async fn test_channel_dispatcher_reports_closed_channel() {
        let (dispatcher, receiver) = ChannelDispatcher::new();
        drop(receiver);

        assert_eq!(
            dispatcher.notify(event()).await,
            Err(NotificationError::ChannelClosed)
        );
    }

    #[tokio::test]
    async fn test_tracing_dispatcher_never_fails() {
        assert!(TracingDispatcher.notify(event()).await.is_ok());
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["kind"], "CREDIT_ALERT");
        assert_eq!(json["account"], "1234567890");
        assert!(json.get("resultingBalance").is_some());
    }
}
