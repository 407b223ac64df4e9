use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::services::checkout::CheckoutStep;

/// Field-level validation errors for a single checkout step.
///
/// Keys are the field identifiers the storefront UI binds error text to
/// (e.g. `shippingFullName`); values are the human-readable messages. An
/// empty map means the step passes. A fresh map is produced per validation
/// call, so errors never leak across steps.
pub type ErrorMap = BTreeMap<&'static str, String>;

/// Errors produced by the checkout core.
///
/// Everything here is recoverable: validation errors are corrected by the
/// user, payment failures are retryable, and transition errors indicate a
/// caller bug rather than a broken session.
#[derive(Debug, Error, Serialize)]
pub enum CheckoutError {
    /// The current step failed validation; the session did not advance.
    #[error("validation failed for step {step}")]
    Validation { step: CheckoutStep, errors: ErrorMap },

    /// The payment gateway declined or errored. Retryable from the capture
    /// step; unexpected gateway errors are surfaced through this variant as
    /// well since the wizard treats them identically.
    #[error("payment failed: {0}")]
    PaymentDeclined(String),

    /// No payment method was selected when one was required.
    #[error("no payment method selected")]
    PaymentMethodMissing,

    /// The requested transition is not legal from the current step.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The session already reached a terminal step (Success or Cancelled).
    #[error("checkout session is closed: {0}")]
    SessionClosed(String),

    /// A simulated collaborator failed (certificate store, history).
    #[error("external service error: {0}")]
    ExternalServiceError(String),

    /// Invalid input outside the per-step validation flow.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CheckoutError {
    /// Step-level banner message for the storefront, if this error carries
    /// one. Validation errors are rendered field-by-field instead.
    pub fn banner_message(&self) -> Option<&str> {
        match self {
            Self::PaymentDeclined(reason) => Some(reason),
            Self::ExternalServiceError(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PaymentDeclined(_) | Self::ExternalServiceError(_)
        )
    }
}
