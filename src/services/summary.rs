//! Order-summary arithmetic.

use rust_decimal::Decimal;

use crate::models::{OrderState, OrderSummary};

/// Recomputes the full order summary from the current order state.
///
/// Pure and synchronous. Called after every mutation that can affect a
/// total, so the stored summary is always a faithful projection; partial
/// updates of individual lines are deliberately not supported. Intermediate
/// values keep full precision; rounding belongs to display.
pub fn recompute(order: &OrderState, tax_rate: Decimal) -> OrderSummary {
    let item_total = order.bid_amount;
    let shipping_cost = order.shipping.base_cost;
    // Re-derived from the tier so a stale selection amount can never leak
    // into the totals.
    let insurance_cost = order.insurance.tier.premium_for(item_total);
    let shipping_insurance_cost = order.shipping.protection_cost;
    let tax = (item_total + shipping_cost) * tax_rate;
    let total = item_total + shipping_cost + insurance_cost + shipping_insurance_cost + tax;

    OrderSummary {
        item_total,
        shipping_cost,
        insurance_cost,
        shipping_insurance_cost,
        tax,
        total,
    }
}
