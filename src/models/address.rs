use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Pattern the storefront accepts for customer email addresses.
pub static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// A shipping or billing address as entered in the checkout form.
///
/// Created with empty defaults at session start and mutated field-by-field
/// as the customer types. Required fields are enforced by the step
/// validator, not at construction, so partially filled addresses are always
/// representable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(custom = "not_blank")]
    pub full_name: String,
    #[validate(custom = "email_format")]
    pub email: String,
    /// Optional.
    pub phone: String,
    #[validate(custom = "not_blank")]
    pub line1: String,
    #[validate(custom = "not_blank")]
    pub city: String,
    /// Optional.
    pub state: String,
    #[validate(custom = "not_blank")]
    pub zip_code: String,
    pub country: String,
}

impl Address {
    /// An empty address with the storefront's default country.
    pub fn empty() -> Self {
        Self {
            country: "US".to_string(),
            ..Self::default()
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required"))
    } else {
        Ok(())
    }
}

fn email_format(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required"))
    } else if !EMAIL_PATTERN.is_match(value) {
        Err(ValidationError::new("email"))
    } else {
        Ok(())
    }
}

/// Billing address for the order.
///
/// `Mirrored` resolves against the live shipping address whenever it is
/// read, so a shipping edit after toggling "same as shipping" can never
/// leave a stale billing copy behind. Only `Independent` addresses are
/// validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillingAddress {
    Mirrored,
    Independent(Address),
}

impl BillingAddress {
    pub fn is_mirrored(&self) -> bool {
        matches!(self, Self::Mirrored)
    }

    /// The address that will actually be billed, given the current shipping
    /// address.
    pub fn resolve<'a>(&'a self, shipping: &'a Address) -> &'a Address {
        match self {
            Self::Mirrored => shipping,
            Self::Independent(address) => address,
        }
    }
}

impl Default for BillingAddress {
    fn default() -> Self {
        Self::Mirrored
    }
}
