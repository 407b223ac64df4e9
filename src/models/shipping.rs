use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Shipping methods offered at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    Overnight,
}

impl ShippingMethod {
    pub fn base_cost(self) -> Decimal {
        match self {
            Self::Standard => dec!(25.00),
            Self::Express => dec!(45.00),
            Self::Overnight => dec!(75.00),
        }
    }

    pub fn estimated_days(self) -> u32 {
        match self {
            Self::Standard => 5,
            Self::Express => 2,
            Self::Overnight => 1,
        }
    }
}

/// Flat-priced shipping protection plans, independent of jewelry insurance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ShippingProtection {
    /// No coverage; the customer bears full transit risk.
    #[default]
    None,
    /// Covers shipping delays and minor damages.
    Standard,
    /// Covers full package loss plus major damages.
    Advanced,
}

impl ShippingProtection {
    pub fn cost(self) -> Decimal {
        match self {
            Self::None => Decimal::ZERO,
            Self::Standard => dec!(5.00),
            Self::Advanced => dec!(15.00),
        }
    }
}

/// The shipping choice attached to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSelection {
    pub method: ShippingMethod,
    pub base_cost: Decimal,
    pub protection: ShippingProtection,
    pub protection_cost: Decimal,
}

impl ShippingSelection {
    pub fn new(method: ShippingMethod, protection: ShippingProtection) -> Self {
        Self {
            method,
            base_cost: method.base_cost(),
            protection,
            protection_cost: protection.cost(),
        }
    }
}

impl Default for ShippingSelection {
    fn default() -> Self {
        Self::new(ShippingMethod::Standard, ShippingProtection::None)
    }
}
