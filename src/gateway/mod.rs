//! The payment-processing capability the checkout session drives.
//!
//! In production this is a network client for the storefront's payment
//! providers; here it is simulated by [`mock::MockPaymentGateway`]. The
//! session only ever sees the trait, so tests force success or failure
//! deterministically instead of depending on simulated network luck.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use uuid::Uuid;

pub mod mock;

pub use mock::{FailurePolicy, MockPaymentGateway};

/// Charge against a saved card instrument (or any method addressed by tag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardPaymentRequest {
    pub amount: Decimal,
    pub method_tag: String,
    pub item_id: Uuid,
    pub item_title: String,
}

/// Charge against a newly entered card through Stripe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePaymentRequest {
    pub amount: Decimal,
    pub currency: String,
    pub payment_method_id: String,
    pub item_id: Uuid,
}

/// Charge through PayPal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayPalPaymentRequest {
    pub amount: Decimal,
    pub currency: String,
    pub item_id: Uuid,
    pub payer_email: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Pending,
}

/// Normalized success result across the three capture methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
    pub status: PaymentStatus,
    pub item_id: Option<Uuid>,
    /// Set for PayPal captures.
    pub payer_email: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Result of a confirmation-email send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfirmation {
    pub email: String,
    pub order_id: String,
    pub subject: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// Failures from the payment capability. The checkout session treats every
/// variant as a retryable payment failure; the distinction exists for
/// logging and for callers that want to tell declines from outages.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum GatewayError {
    #[error("{0}")]
    Declined(String),
    #[error("payment service unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Asynchronous payment capability.
///
/// `send_confirmation_email` must only be called after a capture method has
/// resolved successfully; its failure is best-effort for callers.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process_payment(
        &self,
        request: CardPaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError>;

    async fn process_stripe_payment(
        &self,
        request: StripePaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError>;

    async fn process_paypal_payment(
        &self,
        request: PayPalPaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError>;

    async fn send_confirmation_email(
        &self,
        receipt: &PaymentReceipt,
        email: &str,
    ) -> Result<EmailConfirmation, GatewayError>;
}
