//! Per-step checkout validation.
//!
//! Each call produces a fresh [`ErrorMap`] scoped to the requested step, so
//! errors from one step can never bleed into another. Keys and messages are
//! the storefront's form contract.

use validator::Validate;

use crate::errors::ErrorMap;
use crate::models::{Address, BillingAddress, OrderState};
use crate::services::checkout::CheckoutStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressRole {
    Shipping,
    Billing,
}

/// Validates the given step against the current order state. An empty map
/// means the step passes and the wizard may advance.
pub fn validate_step(step: CheckoutStep, order: &OrderState) -> ErrorMap {
    let mut errors = ErrorMap::new();

    match step {
        CheckoutStep::ShippingBilling => {
            collect_address_errors(&order.shipping_address, AddressRole::Shipping, &mut errors);
            if let BillingAddress::Independent(address) = &order.billing {
                collect_address_errors(address, AddressRole::Billing, &mut errors);
            }
        }
        CheckoutStep::Payment => {
            if order.payment.is_none() {
                errors.insert("paymentMethod", "Please select a payment method".to_string());
            }
        }
        // Insurance is optional by design (a no-insurance tier exists), and
        // the capture and terminal steps carry no blocking validation.
        CheckoutStep::Insurance
        | CheckoutStep::PaymentCapture
        | CheckoutStep::Success
        | CheckoutStep::Cancelled => {}
    }

    errors
}

fn collect_address_errors(address: &Address, role: AddressRole, errors: &mut ErrorMap) {
    let Err(field_errors) = address.validate() else {
        return;
    };
    let field_errors = field_errors.field_errors();

    for &(field, key, required_message) in role.required_fields() {
        let Some(violations) = field_errors.get(field) else {
            continue;
        };
        let message = if field == "email"
            && !violations.iter().any(|v| v.code == "required")
        {
            "Please enter a valid email address"
        } else {
            required_message
        };
        errors.insert(key, message.to_string());
    }
}

impl AddressRole {
    /// (model field, error-map key, required message) for each validated
    /// field of this role.
    fn required_fields(self) -> &'static [(&'static str, &'static str, &'static str)] {
        match self {
            Self::Shipping => &[
                ("full_name", "shippingFullName", "Full name is required"),
                ("email", "shippingEmail", "Email is required"),
                ("line1", "shippingAddress", "Address is required"),
                ("city", "shippingCity", "City is required"),
                ("zip_code", "shippingZip", "ZIP code is required"),
            ],
            // Billing never requires an email; the shipping address owns
            // order notifications.
            Self::Billing => &[
                ("full_name", "billingFullName", "Full name is required"),
                ("line1", "billingAddress", "Address is required"),
                ("city", "billingCity", "City is required"),
                ("zip_code", "billingZip", "ZIP code is required"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InsuranceSelection, InsuranceTier, JewelryItem, PaymentSelection};
    use rust_decimal_macros::dec;

    fn order_with_empty_forms() -> OrderState {
        OrderState::new(JewelryItem::new("Diamond Ring", "1.2ct solitaire"), dec!(2500))
    }

    fn filled_shipping(order: &mut OrderState) {
        let address = &mut order.shipping_address;
        address.full_name = "Ada Lovelace".into();
        address.email = "ada@example.com".into();
        address.line1 = "12 Analytical Way".into();
        address.city = "London".into();
        address.zip_code = "10001".into();
    }

    // ==================== Shipping & Billing Step ====================

    #[test]
    fn empty_shipping_form_reports_every_required_field() {
        let order = order_with_empty_forms();
        let errors = validate_step(CheckoutStep::ShippingBilling, &order);

        for key in [
            "shippingFullName",
            "shippingEmail",
            "shippingAddress",
            "shippingCity",
            "shippingZip",
        ] {
            assert!(errors.contains_key(key), "missing {key}: {errors:?}");
        }
        assert_eq!(errors["shippingFullName"], "Full name is required");
    }

    #[test]
    fn phone_and_state_are_optional() {
        let mut order = order_with_empty_forms();
        filled_shipping(&mut order);
        assert!(order.shipping_address.phone.is_empty());
        assert!(order.shipping_address.state.is_empty());

        let errors = validate_step(CheckoutStep::ShippingBilling, &order);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn malformed_email_gets_the_format_message() {
        let mut order = order_with_empty_forms();
        filled_shipping(&mut order);
        order.shipping_address.email = "ada-at-example".into();

        let errors = validate_step(CheckoutStep::ShippingBilling, &order);
        assert_eq!(errors["shippingEmail"], "Please enter a valid email address");
    }

    #[test]
    fn blank_email_gets_the_required_message() {
        let mut order = order_with_empty_forms();
        filled_shipping(&mut order);
        order.shipping_address.email = " ".into();

        let errors = validate_step(CheckoutStep::ShippingBilling, &order);
        assert_eq!(errors["shippingEmail"], "Email is required");
    }

    #[test]
    fn mirrored_billing_requires_no_billing_fields() {
        let mut order = order_with_empty_forms();
        filled_shipping(&mut order);
        assert!(order.billing.is_mirrored());

        let errors = validate_step(CheckoutStep::ShippingBilling, &order);
        assert!(!errors.keys().any(|k| k.starts_with("billing")));
        assert!(errors.is_empty());
    }

    #[test]
    fn independent_billing_is_validated_without_email() {
        let mut order = order_with_empty_forms();
        filled_shipping(&mut order);
        order.billing = BillingAddress::Independent(Address::empty());

        let errors = validate_step(CheckoutStep::ShippingBilling, &order);
        for key in ["billingFullName", "billingAddress", "billingCity", "billingZip"] {
            assert!(errors.contains_key(key), "missing {key}: {errors:?}");
        }
        assert!(!errors.contains_key("billingEmail"));
    }

    // ==================== Payment Step ====================

    #[test]
    fn unselected_payment_method_blocks_the_step() {
        let order = order_with_empty_forms();
        let errors = validate_step(CheckoutStep::Payment, &order);
        assert_eq!(errors["paymentMethod"], "Please select a payment method");
    }

    #[test]
    fn any_payment_variant_passes_regardless_of_other_steps() {
        // Shipping form left completely empty on purpose: steps validate
        // independently.
        let mut order = order_with_empty_forms();
        order.payment = Some(PaymentSelection::PayPal);
        assert!(validate_step(CheckoutStep::Payment, &order).is_empty());

        order.payment = Some(PaymentSelection::Stripe {
            payment_method_id: "pm_123".into(),
        });
        assert!(validate_step(CheckoutStep::Payment, &order).is_empty());
    }

    // ==================== Non-Blocking Steps ====================

    #[test]
    fn insurance_and_capture_steps_always_pass() {
        let mut order = order_with_empty_forms();
        order.insurance = InsuranceSelection::for_item_value(InsuranceTier::None, dec!(2500));
        assert!(validate_step(CheckoutStep::Insurance, &order).is_empty());
        assert!(validate_step(CheckoutStep::PaymentCapture, &order).is_empty());
        assert!(validate_step(CheckoutStep::Success, &order).is_empty());
    }
}
