//! Integration tests for the checkout flow.
//!
//! Tests cover:
//! - Full happy paths for each payment method
//! - Validation gating at the shipping and payment steps
//! - Gateway declines, retry, and state preservation
//! - Best-effort confirmation email
//! - Cancellation and terminal-state behavior

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;

use crystalcrown_checkout::gateway::{
    CardPaymentRequest, EmailConfirmation, GatewayError, PaymentGateway, PaymentReceipt,
    PaymentStatus, PayPalPaymentRequest, StripePaymentRequest,
};
use crystalcrown_checkout::models::{
    Address, BillingAddress, InsuranceTier, JewelryItem, PaymentSelection, ShippingMethod,
    ShippingProtection,
};
use crystalcrown_checkout::{
    CheckoutError, CheckoutSession, CheckoutStep, FailurePolicy, MockPaymentGateway,
};

fn shipping_address() -> Address {
    let mut address = Address::empty();
    address.full_name = "Ada Lovelace".into();
    address.email = "ada@example.com".into();
    address.line1 = "12 Analytical Way".into();
    address.city = "New York".into();
    address.state = "NY".into();
    address.zip_code = "10001".into();
    address
}

fn session_with(gateway: Arc<dyn PaymentGateway>) -> CheckoutSession {
    CheckoutSession::new(
        JewelryItem::new("Diamond Ring", "1.2ct round solitaire"),
        dec!(2500),
        gateway,
    )
}

/// Drives a session to the capture step with the given payment method.
fn advance_to_capture(session: &mut CheckoutSession, payment: PaymentSelection) {
    session.set_shipping_address(shipping_address());
    session.next().expect("shipping step should pass");
    session.select_payment_method(payment);
    session.next().expect("payment step should pass");
    session.select_insurance(InsuranceTier::Premium);
    session.select_shipping(ShippingMethod::Standard, ShippingProtection::None);
    session.next().expect("insurance step should pass");
    assert_eq!(session.step(), CheckoutStep::PaymentCapture);
}

/// Test gateway that declines the first `fail_first` captures, then
/// succeeds, and counts every call.
struct StagedGateway {
    fail_first: usize,
    decline_reason: String,
    payment_calls: AtomicUsize,
    email_calls: AtomicUsize,
}

impl StagedGateway {
    fn declining_first(fail_first: usize, reason: &str) -> Self {
        Self {
            fail_first,
            decline_reason: reason.to_string(),
            payment_calls: AtomicUsize::new(0),
            email_calls: AtomicUsize::new(0),
        }
    }

    fn receipt(&self, amount: rust_decimal::Decimal, method: &str) -> Result<PaymentReceipt, GatewayError> {
        let attempt = self.payment_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            return Err(GatewayError::Declined(self.decline_reason.clone()));
        }
        Ok(PaymentReceipt {
            transaction_id: format!("txn_{attempt}"),
            amount,
            currency: "USD".into(),
            method: method.into(),
            status: PaymentStatus::Completed,
            item_id: None,
            payer_email: None,
            processed_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StagedGateway {
    async fn process_payment(
        &self,
        request: CardPaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError> {
        self.receipt(request.amount, &request.method_tag)
    }

    async fn process_stripe_payment(
        &self,
        request: StripePaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError> {
        self.receipt(request.amount, "stripe")
    }

    async fn process_paypal_payment(
        &self,
        request: PayPalPaymentRequest,
    ) -> Result<PaymentReceipt, GatewayError> {
        self.receipt(request.amount, "paypal")
    }

    async fn send_confirmation_email(
        &self,
        receipt: &PaymentReceipt,
        email: &str,
    ) -> Result<EmailConfirmation, GatewayError> {
        self.email_calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmailConfirmation {
            email: email.into(),
            order_id: receipt.transaction_id.clone(),
            subject: format!("Order Confirmation #{}", receipt.transaction_id),
            message: "Thank you for your jewelry purchase!".into(),
            sent_at: Utc::now(),
        })
    }
}

// ==================== Happy Path Tests ====================

#[tokio::test]
async fn stripe_checkout_reaches_success_with_email() {
    let mut session = session_with(Arc::new(MockPaymentGateway::reliable()));
    advance_to_capture(
        &mut session,
        PaymentSelection::Stripe {
            payment_method_id: "pm_4242".into(),
        },
    );

    // $2500 item + $25 shipping + $50 premium insurance + $202 tax.
    assert_eq!(session.summary().display_total(), dec!(2777.00));

    let confirmation = session.submit_payment().await.expect("capture should succeed");
    assert_eq!(session.step(), CheckoutStep::Success);
    assert!(confirmation.receipt.transaction_id.starts_with("pi_"));
    assert_eq!(confirmation.receipt.amount, dec!(2777.00));

    let email = confirmation.email_confirmation.expect("email should send");
    assert_eq!(email.email, "ada@example.com");
    assert!(email.subject.starts_with("Order Confirmation #"));
}

#[tokio::test]
async fn paypal_checkout_carries_the_payer_email() {
    let mut session = session_with(Arc::new(MockPaymentGateway::reliable()));
    advance_to_capture(&mut session, PaymentSelection::PayPal);

    let confirmation = session.submit_payment().await.unwrap();
    assert!(confirmation.receipt.transaction_id.starts_with("pay_"));
    assert_eq!(
        confirmation.receipt.payer_email.as_deref(),
        Some("ada@example.com")
    );
}

#[tokio::test]
async fn saved_card_checkout_uses_the_card_method() {
    let mut session = session_with(Arc::new(MockPaymentGateway::reliable()));
    advance_to_capture(
        &mut session,
        PaymentSelection::SavedCard {
            reference: "**** **** **** 4242".into(),
        },
    );

    let confirmation = session.submit_payment().await.unwrap();
    assert!(confirmation.receipt.transaction_id.starts_with("mock_card_"));
    assert_eq!(confirmation.receipt.method, "card");
}

// ==================== Validation Gating Tests ====================

#[tokio::test]
async fn empty_shipping_form_blocks_the_first_step() {
    let mut session = session_with(Arc::new(MockPaymentGateway::reliable()));

    let err = session.next().unwrap_err();
    assert_matches!(err, CheckoutError::Validation { errors, .. } => {
        assert!(errors.contains_key("shippingFullName"));
    });
    assert_eq!(session.step(), CheckoutStep::ShippingBilling);

    // Fixing the form unblocks the step.
    session.set_shipping_address(shipping_address());
    assert_eq!(session.next().unwrap(), CheckoutStep::Payment);
}

#[tokio::test]
async fn payment_step_requires_a_selection() {
    let mut session = session_with(Arc::new(MockPaymentGateway::reliable()));
    session.set_shipping_address(shipping_address());
    session.next().unwrap();

    let err = session.next().unwrap_err();
    assert_matches!(err, CheckoutError::Validation { errors, .. } => {
        assert_eq!(errors["paymentMethod"], "Please select a payment method");
    });

    session.select_payment_method(PaymentSelection::PayPal);
    assert_eq!(session.next().unwrap(), CheckoutStep::Insurance);
}

#[tokio::test]
async fn independent_billing_gates_the_first_step() {
    let mut session = session_with(Arc::new(MockPaymentGateway::reliable()));
    session.set_shipping_address(shipping_address());
    session.set_billing(BillingAddress::Independent(Address::empty()));

    let err = session.next().unwrap_err();
    assert_matches!(err, CheckoutError::Validation { errors, .. } => {
        assert!(errors.contains_key("billingFullName"));
        assert!(errors.contains_key("billingZip"));
    });

    // Mirroring again removes the requirement entirely.
    session.set_billing(BillingAddress::Mirrored);
    assert_eq!(session.next().unwrap(), CheckoutStep::Payment);
}

// ==================== Decline and Retry Tests ====================

#[tokio::test]
async fn decline_keeps_the_session_at_capture_with_state_intact() {
    let gateway = Arc::new(StagedGateway::declining_first(
        usize::MAX,
        "Stripe payment failed: insufficient funds",
    ));
    let mut session = session_with(gateway.clone());
    advance_to_capture(
        &mut session,
        PaymentSelection::Stripe {
            payment_method_id: "pm_4242".into(),
        },
    );
    let order_before = session.order().clone();

    let err = session.submit_payment().await.unwrap_err();
    assert_matches!(err, CheckoutError::PaymentDeclined(reason) => {
        assert!(reason.contains("insufficient funds"));
    });

    assert_eq!(session.step(), CheckoutStep::PaymentCapture);
    assert_eq!(session.order(), &order_before);
    assert!(session
        .payment_error()
        .is_some_and(|reason| reason.contains("insufficient funds")));
    // A failed payment never triggers a confirmation email.
    assert_eq!(gateway.email_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retry_after_a_decline_succeeds() {
    let gateway = Arc::new(StagedGateway::declining_first(1, "card transaction declined"));
    let mut session = session_with(gateway.clone());
    advance_to_capture(
        &mut session,
        PaymentSelection::SavedCard {
            reference: "**** 4242".into(),
        },
    );

    assert!(session.submit_payment().await.is_err());
    let confirmation = session.submit_payment().await.expect("retry should succeed");

    assert_eq!(session.step(), CheckoutStep::Success);
    assert!(session.payment_error().is_none());
    assert_eq!(gateway.payment_calls.load(Ordering::SeqCst), 2);
    assert_eq!(confirmation.receipt.transaction_id, "txn_2");
}

#[tokio::test]
async fn back_from_capture_allows_switching_payment_method() {
    let mut session = session_with(Arc::new(MockPaymentGateway::reliable()));
    advance_to_capture(&mut session, PaymentSelection::PayPal);

    assert_eq!(session.back().unwrap(), CheckoutStep::Insurance);
    assert_eq!(session.back().unwrap(), CheckoutStep::Payment);
    session.select_payment_method(PaymentSelection::Stripe {
        payment_method_id: "pm_new".into(),
    });
    session.next().unwrap();
    session.next().unwrap();

    let confirmation = session.submit_payment().await.unwrap();
    assert_eq!(confirmation.receipt.method, "stripe");
}

// ==================== Confirmation Email Tests ====================

#[tokio::test]
async fn email_failure_still_reaches_success() {
    let gateway = MockPaymentGateway::reliable()
        .with_email_failure(FailurePolicy::always("smtp unreachable"));
    let mut session = session_with(Arc::new(gateway));
    advance_to_capture(&mut session, PaymentSelection::PayPal);

    let confirmation = session.submit_payment().await.expect("order should complete");
    assert_eq!(session.step(), CheckoutStep::Success);
    assert!(confirmation.email_confirmation.is_none());
    assert!(session.receipt().is_some());
}

// ==================== Terminal State Tests ====================

#[tokio::test]
async fn success_is_terminal() {
    let mut session = session_with(Arc::new(MockPaymentGateway::reliable()));
    advance_to_capture(&mut session, PaymentSelection::PayPal);
    session.submit_payment().await.unwrap();

    assert_matches!(session.next().unwrap_err(), CheckoutError::SessionClosed(_));
    assert_matches!(session.back().unwrap_err(), CheckoutError::SessionClosed(_));
    assert_matches!(
        session.submit_payment().await.unwrap_err(),
        CheckoutError::SessionClosed(_)
    );
}

#[tokio::test]
async fn cancelled_sessions_never_capture() {
    let gateway = Arc::new(StagedGateway::declining_first(0, ""));
    let mut session = session_with(gateway.clone());
    advance_to_capture(&mut session, PaymentSelection::PayPal);

    session.cancel().unwrap();
    assert_matches!(
        session.submit_payment().await.unwrap_err(),
        CheckoutError::SessionClosed(_)
    );
    assert_eq!(gateway.payment_calls.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.email_calls.load(Ordering::SeqCst), 0);
}
