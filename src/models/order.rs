use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{
    Address, BillingAddress, InsuranceSelection, JewelryItem, PaymentSelection, ShippingSelection,
};

/// Everything the customer has entered or selected for one checkout.
///
/// Owned exclusively by its `CheckoutSession`; all mutation happens through
/// the session's methods, which recompute `summary` after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    pub item: JewelryItem,
    /// The winning bid being paid for.
    pub bid_amount: Decimal,
    pub shipping_address: Address,
    pub billing: BillingAddress,
    pub payment: Option<PaymentSelection>,
    pub insurance: InsuranceSelection,
    pub shipping: ShippingSelection,
    /// Derived; see `services::summary`. Never edited by hand.
    pub summary: OrderSummary,
}

impl OrderState {
    /// Seeds a fresh order from the auctioned item and winning bid. The
    /// summary starts zeroed and is recomputed by the session on creation.
    pub fn new(item: JewelryItem, bid_amount: Decimal) -> Self {
        Self {
            item,
            bid_amount,
            shipping_address: Address::empty(),
            billing: BillingAddress::Mirrored,
            payment: None,
            insurance: InsuranceSelection::default(),
            shipping: ShippingSelection::default(),
            summary: OrderSummary::default(),
        }
    }

    /// The address charges will be billed to, resolving a mirrored billing
    /// address against the current shipping address.
    pub fn billing_address(&self) -> &Address {
        self.billing.resolve(&self.shipping_address)
    }
}

/// The itemized monetary breakdown shown in the order-summary sidebar.
///
/// A pure projection of `OrderState`: recomputed whole whenever any
/// contributing field changes, never patched incrementally. Values keep full
/// decimal precision; rounding to cents happens in `display_*` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub item_total: Decimal,
    pub shipping_cost: Decimal,
    pub insurance_cost: Decimal,
    pub shipping_insurance_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    /// A line value rounded for display.
    pub fn display(value: Decimal) -> Decimal {
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn display_total(&self) -> Decimal {
        Self::display(self.total)
    }

    pub fn display_tax(&self) -> Decimal {
        Self::display(self.tax)
    }
}
