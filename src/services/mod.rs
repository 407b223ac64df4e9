pub mod certifications;
pub mod checkout;
pub mod payment_history;
pub mod summary;
pub mod validation;
