//! Simulated payment-history backend for the account pages.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::CheckoutError;
use crate::gateway::{FailurePolicy, PaymentStatus};

/// One row of a user's payment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    pub transaction_id: String,
    pub amount: Decimal,
    pub method: String,
    pub status: PaymentStatus,
    pub occurred_at: DateTime<Utc>,
    pub item_title: String,
    pub item_id: Uuid,
}

#[derive(Debug, Default)]
pub struct PaymentHistoryService {
    records: DashMap<String, Vec<PaymentHistoryEntry>>,
    latency: Duration,
    fetch_failure: FailurePolicy,
}

impl PaymentHistoryService {
    /// Zero latency, never fails.
    pub fn reliable() -> Self {
        Self::default()
    }

    /// The original storefront's simulated latency and failure rate.
    pub fn flaky() -> Self {
        Self {
            latency: Duration::from_millis(1000),
            fetch_failure: FailurePolicy::rate(0.05),
            ..Self::default()
        }
    }

    pub fn with_fetch_failure(mut self, policy: FailurePolicy) -> Self {
        self.fetch_failure = policy;
        self
    }

    /// A user's payment history: the seeded demo rows plus anything
    /// recorded since, newest first.
    #[instrument(skip(self))]
    pub async fn get_payment_history(
        &self,
        user_id: &str,
    ) -> Result<Vec<PaymentHistoryEntry>, CheckoutError> {
        debug!("simulating payment history fetch");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(reason) = self.fetch_failure.trip(|| {
            "Failed to fetch payment history: Database error".to_string()
        }) {
            return Err(CheckoutError::ExternalServiceError(reason));
        }

        let mut entries = seeded_history();
        if let Some(recorded) = self.records.get(user_id) {
            entries.extend(recorded.iter().cloned());
        }
        entries.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(entries)
    }

    /// Appends a completed checkout to the user's history.
    pub fn record_payment(&self, user_id: &str, entry: PaymentHistoryEntry) {
        self.records
            .entry(user_id.to_string())
            .or_default()
            .push(entry);
    }
}

fn seeded_history() -> Vec<PaymentHistoryEntry> {
    let now = Utc::now();
    vec![
        PaymentHistoryEntry {
            transaction_id: "mock_stripe_123456".to_string(),
            amount: dec!(299.99),
            method: "stripe".to_string(),
            status: PaymentStatus::Completed,
            occurred_at: now - ChronoDuration::days(13),
            item_title: "Diamond Ring".to_string(),
            item_id: Uuid::from_u128(0x01),
        },
        PaymentHistoryEntry {
            transaction_id: "mock_paypal_789012".to_string(),
            amount: dec!(450.50),
            method: "paypal".to_string(),
            status: PaymentStatus::Completed,
            occurred_at: now - ChronoDuration::days(18),
            item_title: "Gold Necklace".to_string(),
            item_id: Uuid::from_u128(0x02),
        },
        PaymentHistoryEntry {
            transaction_id: "mock_card_345678".to_string(),
            amount: dec!(1200.00),
            method: "card".to_string(),
            status: PaymentStatus::Pending,
            occurred_at: now - ChronoDuration::days(16),
            item_title: "Sapphire Bracelet".to_string(),
            item_id: Uuid::from_u128(0x03),
        },
    ]
}
