use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Jewelry insurance tiers, priced as a fixed percentage of item value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceTier {
    /// The customer takes full risk of shipping.
    #[default]
    None,
    /// Covers loss during delivery (1% of item value).
    Basic,
    /// Covers loss plus accidental damage (2% of item value).
    Premium,
}

impl InsuranceTier {
    pub fn rate(self) -> Decimal {
        match self {
            Self::None => Decimal::ZERO,
            Self::Basic => dec!(0.01),
            Self::Premium => dec!(0.02),
        }
    }

    pub fn premium_for(self, item_value: Decimal) -> Decimal {
        item_value * self.rate()
    }
}

/// The insurance choice attached to an order. The amount is derived from the
/// tier and item value at selection time and re-derived by the summary
/// calculator, never entered by hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceSelection {
    pub tier: InsuranceTier,
    pub amount: Decimal,
}

impl InsuranceSelection {
    pub fn for_item_value(tier: InsuranceTier, item_value: Decimal) -> Self {
        Self {
            tier,
            amount: tier.premium_for(item_value),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.tier != InsuranceTier::None
    }
}
