//! Simulated payment backend.
//!
//! Emulates network conditions with injected latency and configurable
//! failure policies. Demos run with the original storefront's failure rates
//! (15% card, 10% Stripe, 5% PayPal); tests pin `Never` or `Always` so
//! nothing depends on randomness.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    CardPaymentRequest, EmailConfirmation, GatewayError, PaymentGateway, PaymentReceipt,
    PaymentStatus, PayPalPaymentRequest, StripePaymentRequest,
};
use crate::config::GatewaySimConfig;

/// When a simulated call should fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Never,
    Always {
        reason: String,
    },
    /// Fails with the call's canonical reason at the given probability.
    Rate {
        probability: f64,
    },
}

impl FailurePolicy {
    pub fn always(reason: impl Into<String>) -> Self {
        Self::Always {
            reason: reason.into(),
        }
    }

    pub fn rate(probability: f64) -> Self {
        Self::Rate { probability }
    }

    /// Returns the failure reason if this call should fail.
    pub(crate) fn trip(&self, canonical_reason: impl FnOnce() -> String) -> Option<String> {
        match self {
            Self::Never => None,
            Self::Always { reason } => Some(reason.clone()),
            Self::Rate { probability } => {
                if rand::thread_rng().gen::<f64>() < *probability {
                    Some(canonical_reason())
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    latency: Duration,
    card_failure: FailurePolicy,
    stripe_failure: FailurePolicy,
    paypal_failure: FailurePolicy,
    email_failure: FailurePolicy,
}

impl MockPaymentGateway {
    /// Zero latency, never fails. The baseline for tests.
    pub fn reliable() -> Self {
        Self {
            latency: Duration::ZERO,
            card_failure: FailurePolicy::Never,
            stripe_failure: FailurePolicy::Never,
            paypal_failure: FailurePolicy::Never,
            email_failure: FailurePolicy::Never,
        }
    }

    /// Every capture method fails with the given reason; email still works.
    pub fn declining(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            card_failure: FailurePolicy::always(reason.clone()),
            stripe_failure: FailurePolicy::always(reason.clone()),
            paypal_failure: FailurePolicy::always(reason),
            ..Self::reliable()
        }
    }

    /// Simulation knobs from configuration (latency plus per-method rates).
    pub fn from_config(config: &GatewaySimConfig) -> Self {
        Self {
            latency: Duration::from_millis(config.latency_ms),
            card_failure: FailurePolicy::rate(config.card_decline_rate),
            stripe_failure: FailurePolicy::rate(config.stripe_decline_rate),
            paypal_failure: FailurePolicy::rate(config.paypal_decline_rate),
            email_failure: FailurePolicy::rate(config.email_failure_rate),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_card_failure(mut self, policy: FailurePolicy) -> Self {
        self.card_failure = policy;
        self
    }

    pub fn with_stripe_failure(mut self, policy: FailurePolicy) -> Self {
        self.stripe_failure = policy;
        self
    }

    pub fn with_paypal_failure(mut self, policy: FailurePolicy) -> Self {
        self.paypal_failure = policy;
        self
    }

    pub fn with_email_failure(mut self, policy: FailurePolicy) -> Self {
        self.email_failure = policy;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::reliable()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    #[instrument(skip(self), fields(method = %request.method_tag, amount = %request.amount))]
    async fn process_payment(
        &self,
        request: CardPaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError> {
        debug!(item = %request.item_title, "simulating {} payment", request.method_tag);
        self.simulate_latency().await;

        if let Some(reason) = self.card_failure.trip(|| {
            format!("Payment failed: {} transaction declined", request.method_tag)
        }) {
            return Err(GatewayError::Declined(reason));
        }

        Ok(PaymentReceipt {
            transaction_id: format!(
                "mock_{}_{}",
                request.method_tag,
                Utc::now().timestamp_millis()
            ),
            amount: request.amount,
            currency: "USD".to_string(),
            method: request.method_tag,
            status: PaymentStatus::Completed,
            item_id: Some(request.item_id),
            payer_email: None,
            processed_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(amount = %request.amount))]
    async fn process_stripe_payment(
        &self,
        request: StripePaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError> {
        debug!(payment_method_id = %request.payment_method_id, "simulating Stripe payment");
        self.simulate_latency().await;

        if let Some(reason) = self
            .stripe_failure
            .trip(|| "Stripe payment failed: Insufficient funds".to_string())
        {
            return Err(GatewayError::Declined(reason));
        }

        Ok(PaymentReceipt {
            transaction_id: format!("pi_{}", Utc::now().timestamp_millis()),
            amount: request.amount,
            currency: request.currency,
            method: "stripe".to_string(),
            status: PaymentStatus::Completed,
            item_id: Some(request.item_id),
            payer_email: None,
            processed_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(amount = %request.amount))]
    async fn process_paypal_payment(
        &self,
        request: PayPalPaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError> {
        debug!(payer = %request.payer_email, "simulating PayPal payment");
        self.simulate_latency().await;

        if let Some(reason) = self
            .paypal_failure
            .trip(|| "PayPal payment failed: Payment declined".to_string())
        {
            return Err(GatewayError::Declined(reason));
        }

        Ok(PaymentReceipt {
            transaction_id: format!("pay_{}", Utc::now().timestamp_millis()),
            amount: request.amount,
            currency: request.currency,
            method: "paypal".to_string(),
            status: PaymentStatus::Completed,
            item_id: Some(request.item_id),
            payer_email: Some(request.payer_email),
            processed_at: Utc::now(),
        })
    }

    #[instrument(skip(self, receipt))]
    async fn send_confirmation_email(
        &self,
        receipt: &PaymentReceipt,
        email: &str,
    ) -> Result<EmailConfirmation, GatewayError> {
        debug!(order_id = %receipt.transaction_id, "simulating confirmation email");
        self.simulate_latency().await;

        if let Some(reason) = self
            .email_failure
            .trip(|| "Confirmation email could not be delivered".to_string())
        {
            return Err(GatewayError::Unavailable(reason));
        }

        Ok(EmailConfirmation {
            email: email.to_string(),
            order_id: receipt.transaction_id.clone(),
            subject: format!("Order Confirmation #{}", receipt.transaction_id),
            message: "Thank you for your jewelry purchase!".to_string(),
            sent_at: Utc::now(),
        })
    }
}
