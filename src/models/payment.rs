use serde::{Deserialize, Serialize};

/// The customer's chosen payment instrument.
///
/// Exactly one variant is active at a time; `Option<PaymentSelection>`
/// models the valid "nothing selected yet" state that blocks progression
/// past the payment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentSelection {
    /// A previously saved card, referenced by its vault handle.
    SavedCard { reference: String },
    /// A new card entered through the Stripe element.
    Stripe { payment_method_id: String },
    #[serde(rename = "paypal")]
    PayPal,
}

impl PaymentSelection {
    /// Tag used in gateway calls and receipts ("card", "stripe", "paypal").
    pub fn method_tag(&self) -> &'static str {
        match self {
            Self::SavedCard { .. } => "card",
            Self::Stripe { .. } => "stripe",
            Self::PayPal => "paypal",
        }
    }
}
