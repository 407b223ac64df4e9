//! The checkout session state machine.
//!
//! One `CheckoutSession` per purchase: it owns the order state, walks the
//! step sequence (shipping/billing → payment method → insurance → capture →
//! success), gates `next()` on the step validator, and drives the payment
//! and confirmation-email pipeline against the injected [`PaymentGateway`].

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::{CheckoutError, ErrorMap};
use crate::events::{Event, EventSender};
use crate::gateway::{
    CardPaymentRequest, EmailConfirmation, PaymentGateway, PaymentReceipt, PayPalPaymentRequest,
    StripePaymentRequest,
};
use crate::models::{
    Address, BillingAddress, InsuranceSelection, InsuranceTier, JewelryItem, OrderState,
    OrderSummary, PaymentSelection, ShippingMethod, ShippingProtection, ShippingSelection,
};
use crate::services::{summary, validation};

/// The stages of the checkout flow, in order. `Cancelled` is the terminal
/// state for abandoned sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    ShippingBilling,
    Payment,
    Insurance,
    PaymentCapture,
    Success,
    Cancelled,
}

impl CheckoutStep {
    /// Position shown in the progress header (1-based); terminal states
    /// keep the number of the screen they end on.
    pub fn number(self) -> u8 {
        match self {
            Self::ShippingBilling => 1,
            Self::Payment => 2,
            Self::Insurance => 3,
            Self::PaymentCapture | Self::Cancelled => 4,
            Self::Success => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Cancelled)
    }

    fn following(self) -> Option<Self> {
        match self {
            Self::ShippingBilling => Some(Self::Payment),
            Self::Payment => Some(Self::Insurance),
            Self::Insurance => Some(Self::PaymentCapture),
            // Capture completes only through `submit_payment`.
            Self::PaymentCapture | Self::Success | Self::Cancelled => None,
        }
    }

    fn preceding(self) -> Option<Self> {
        match self {
            Self::Payment => Some(Self::ShippingBilling),
            Self::Insurance => Some(Self::Payment),
            Self::PaymentCapture => Some(Self::Insurance),
            Self::ShippingBilling | Self::Success | Self::Cancelled => None,
        }
    }
}

/// Everything the storefront needs to render the success screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfirmation {
    pub receipt: PaymentReceipt,
    /// `None` when the confirmation email could not be sent; the order is
    /// still complete.
    pub email_confirmation: Option<EmailConfirmation>,
    pub summary: OrderSummary,
    pub shipping_address: Address,
}

pub struct CheckoutSession {
    id: Uuid,
    order: OrderState,
    step: CheckoutStep,
    errors: ErrorMap,
    payment_error: Option<String>,
    receipt: Option<PaymentReceipt>,
    tax_rate: Decimal,
    currency: String,
    gateway: Arc<dyn PaymentGateway>,
    events: Option<EventSender>,
}

impl CheckoutSession {
    /// Seeds a session from the auctioned item and winning bid. Defaults to
    /// an 8% tax rate and USD; see [`with_config`](Self::with_config).
    pub fn new(item: JewelryItem, bid_amount: Decimal, gateway: Arc<dyn PaymentGateway>) -> Self {
        let order = OrderState::new(item, bid_amount);
        let mut session = Self {
            id: Uuid::new_v4(),
            order,
            step: CheckoutStep::ShippingBilling,
            errors: ErrorMap::new(),
            payment_error: None,
            receipt: None,
            tax_rate: dec!(0.08),
            currency: "USD".to_string(),
            gateway,
            events: None,
        };
        session.recompute();
        session
    }

    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.tax_rate = config.tax_rate();
        self.currency = config.default_currency.clone();
        self.recompute();
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self.emit(Event::CheckoutStarted {
            session_id: self.id,
            item_id: self.order.item.id,
            bid_amount: self.order.bid_amount,
        });
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn order(&self) -> &OrderState {
        &self.order
    }

    pub fn summary(&self) -> &OrderSummary {
        &self.order.summary
    }

    /// Field errors from the most recent failed `next()`.
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// Banner message from the most recent failed payment attempt.
    pub fn payment_error(&self) -> Option<&str> {
        self.payment_error.as_deref()
    }

    /// The receipt of the completed payment, once the session succeeded.
    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        self.receipt.as_ref()
    }

    // ==================== Order mutation ====================

    pub fn set_shipping_address(&mut self, address: Address) {
        self.order.shipping_address = address;
        self.recompute();
    }

    pub fn set_billing(&mut self, billing: BillingAddress) {
        self.order.billing = billing;
        self.recompute();
    }

    pub fn select_payment_method(&mut self, selection: PaymentSelection) {
        self.order.payment = Some(selection);
        self.recompute();
    }

    pub fn clear_payment_method(&mut self) {
        self.order.payment = None;
        self.recompute();
    }

    pub fn select_insurance(&mut self, tier: InsuranceTier) {
        self.order.insurance = InsuranceSelection::for_item_value(tier, self.order.bid_amount);
        self.recompute();
    }

    pub fn select_shipping(&mut self, method: ShippingMethod, protection: ShippingProtection) {
        self.order.shipping = ShippingSelection::new(method, protection);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.order.summary = summary::recompute(&self.order, self.tax_rate);
    }

    // ==================== Step transitions ====================

    /// Validates the current step and advances one step on success. On
    /// validation failure the session stays in place and exposes the field
    /// errors through [`errors`](Self::errors).
    #[instrument(skip(self), fields(session_id = %self.id, step = %self.step))]
    pub fn next(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_open()?;

        let from = self.step;
        let to = from.following().ok_or_else(|| {
            CheckoutError::InvalidTransition(
                "payment capture completes through submit_payment, not next()".to_string(),
            )
        })?;

        let errors = validation::validate_step(from, &self.order);
        if !errors.is_empty() {
            info!(error_count = errors.len(), "step validation failed");
            self.errors = errors.clone();
            return Err(CheckoutError::Validation { step: from, errors });
        }

        self.errors.clear();
        self.step = to;
        self.emit(Event::StepAdvanced {
            session_id: self.id,
            from,
            to,
        });
        Ok(to)
    }

    /// Moves exactly one step back. Rejected at the first step and in
    /// terminal states.
    #[instrument(skip(self), fields(session_id = %self.id, step = %self.step))]
    pub fn back(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_open()?;

        let from = self.step;
        let to = from.preceding().ok_or_else(|| {
            CheckoutError::InvalidTransition(format!("cannot go back from {}", from))
        })?;

        self.step = to;
        self.errors.clear();
        self.payment_error = None;
        self.emit(Event::SteppedBack {
            session_id: self.id,
            from,
            to,
        });
        Ok(to)
    }

    /// Abandons the session. Terminal: a cancelled session refuses all
    /// further operations, so a payment result resolving afterwards is
    /// dropped instead of applied.
    pub fn cancel(&mut self) -> Result<(), CheckoutError> {
        self.ensure_open()?;
        self.step = CheckoutStep::Cancelled;
        self.emit(Event::CheckoutCancelled {
            session_id: self.id,
        });
        Ok(())
    }

    // ==================== Payment pipeline ====================

    /// Captures payment through the gateway method matching the selected
    /// instrument, then sends the confirmation email best-effort.
    ///
    /// On gateway failure the session stays at the capture step with every
    /// entered field intact and the reason exposed through
    /// [`payment_error`](Self::payment_error); the caller may retry or go
    /// [`back`](Self::back) to change the payment method.
    #[instrument(skip(self), fields(session_id = %self.id, total = %self.order.summary.total))]
    pub async fn submit_payment(&mut self) -> Result<CheckoutConfirmation, CheckoutError> {
        self.ensure_open()?;
        if self.step != CheckoutStep::PaymentCapture {
            return Err(CheckoutError::InvalidTransition(format!(
                "submit_payment is only valid at payment capture, not {}",
                self.step
            )));
        }
        let selection = self
            .order
            .payment
            .clone()
            .ok_or(CheckoutError::PaymentMethodMissing)?;

        let total = self.order.summary.total;
        let item_id = self.order.item.id;

        let result = match &selection {
            PaymentSelection::SavedCard { .. } => {
                self.gateway
                    .process_payment(CardPaymentRequest {
                        amount: total,
                        method_tag: selection.method_tag().to_string(),
                        item_id,
                        item_title: self.order.item.title.clone(),
                    })
                    .await
            }
            PaymentSelection::Stripe { payment_method_id } => {
                self.gateway
                    .process_stripe_payment(StripePaymentRequest {
                        amount: total,
                        currency: self.currency.clone(),
                        payment_method_id: payment_method_id.clone(),
                        item_id,
                    })
                    .await
            }
            PaymentSelection::PayPal => {
                self.gateway
                    .process_paypal_payment(PayPalPaymentRequest {
                        amount: total,
                        currency: self.currency.clone(),
                        item_id,
                        payer_email: self.order.shipping_address.email.clone(),
                    })
                    .await
            }
        };

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(err) => {
                let reason = err.reason();
                warn!(%reason, "payment capture failed");
                self.payment_error = Some(reason.clone());
                self.emit(Event::PaymentFailed {
                    session_id: self.id,
                    reason: reason.clone(),
                });
                return Err(CheckoutError::PaymentDeclined(reason));
            }
        };

        // The session may have been closed while the gateway call was in
        // flight; a late result must not be applied.
        if self.step != CheckoutStep::PaymentCapture {
            return Err(CheckoutError::SessionClosed(
                "payment result arrived after the session closed".to_string(),
            ));
        }

        info!(transaction_id = %receipt.transaction_id, "payment captured");
        self.emit(Event::PaymentCaptured {
            session_id: self.id,
            transaction_id: receipt.transaction_id.clone(),
            amount: receipt.amount,
        });

        // Strictly after a successful capture, and best-effort: a failed
        // email never blocks the order.
        let email = self.order.shipping_address.email.clone();
        let email_confirmation = match self.gateway.send_confirmation_email(&receipt, &email).await
        {
            Ok(confirmation) => Some(confirmation),
            Err(err) => {
                warn!(error = %err, %email, "confirmation email failed");
                self.emit(Event::ConfirmationEmailFailed {
                    session_id: self.id,
                    email: email.clone(),
                });
                None
            }
        };

        self.step = CheckoutStep::Success;
        self.payment_error = None;
        self.receipt = Some(receipt.clone());
        self.emit(Event::CheckoutCompleted {
            session_id: self.id,
            order_total: total,
        });

        Ok(CheckoutConfirmation {
            receipt,
            email_confirmation,
            summary: self.order.summary,
            shipping_address: self.order.shipping_address.clone(),
        })
    }

    fn ensure_open(&self) -> Result<(), CheckoutError> {
        match self.step {
            CheckoutStep::Success => Err(CheckoutError::SessionClosed(
                "checkout already completed".to_string(),
            )),
            CheckoutStep::Cancelled => Err(CheckoutError::SessionClosed(
                "checkout was cancelled".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.try_send(event);
        }
    }
}
