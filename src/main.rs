use std::sync::Arc;

use rust_decimal_macros::dec;
use tracing::{info, warn};

use crystalcrown_checkout as checkout;

use checkout::models::{Address, InsuranceTier, JewelryItem, PaymentSelection};
use checkout::models::{ShippingMethod, ShippingProtection};
use checkout::services::checkout::CheckoutSession;
use checkout::services::payment_history::{PaymentHistoryEntry, PaymentHistoryService};
use checkout::MockPaymentGateway;

/// Drives one scripted checkout against the simulated backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = checkout::config::load_config()?;
    checkout::config::init_tracing(cfg.log_level(), cfg.log_json);

    let (event_sender, event_rx) = checkout::events::channel(cfg.event_channel_capacity);
    tokio::spawn(checkout::events::process_events(event_rx));

    let gateway = Arc::new(MockPaymentGateway::from_config(&cfg.gateway));
    let history = PaymentHistoryService::reliable();

    let item = JewelryItem::new("Diamond Ring", "1.2ct round solitaire, 18k white gold");
    let mut session = CheckoutSession::new(item, dec!(2500), gateway)
        .with_config(&cfg)
        .with_events(event_sender);

    let mut address = Address::empty();
    address.full_name = "Ada Lovelace".to_string();
    address.email = "ada@example.com".to_string();
    address.line1 = "12 Analytical Way".to_string();
    address.city = "New York".to_string();
    address.state = "NY".to_string();
    address.zip_code = "10001".to_string();
    session.set_shipping_address(address);
    session.next()?;

    session.select_payment_method(PaymentSelection::Stripe {
        payment_method_id: "pm_demo_4242".to_string(),
    });
    session.next()?;

    session.select_insurance(InsuranceTier::Premium);
    session.select_shipping(ShippingMethod::Standard, ShippingProtection::None);
    session.next()?;

    let summary = *session.summary();
    info!(
        item_total = %summary.item_total,
        shipping = %summary.shipping_cost,
        insurance = %summary.insurance_cost,
        tax = %summary.display_tax(),
        total = %summary.display_total(),
        "order summary ready for capture"
    );

    // The simulated gateway declines at the configured rates, so retry a
    // few times the way a shopper would.
    let mut attempts = 0;
    let confirmation = loop {
        attempts += 1;
        match session.submit_payment().await {
            Ok(confirmation) => break confirmation,
            Err(err) if err.is_retryable() && attempts < 5 => {
                warn!(attempt = attempts, error = %err, "payment attempt failed; retrying");
            }
            Err(err) => return Err(err.into()),
        }
    };

    info!(
        transaction_id = %confirmation.receipt.transaction_id,
        email_sent = confirmation.email_confirmation.is_some(),
        "checkout complete"
    );

    history.record_payment(
        "demo-user",
        PaymentHistoryEntry {
            transaction_id: confirmation.receipt.transaction_id.clone(),
            amount: confirmation.receipt.amount,
            method: confirmation.receipt.method.clone(),
            status: confirmation.receipt.status,
            occurred_at: confirmation.receipt.processed_at,
            item_title: session.order().item.title.clone(),
            item_id: session.order().item.id,
        },
    );
    let entries = history.get_payment_history("demo-user").await?;
    info!(count = entries.len(), "payment history updated");

    Ok(())
}
