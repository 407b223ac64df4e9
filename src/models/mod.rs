pub mod address;
pub mod insurance;
pub mod item;
pub mod order;
pub mod payment;
pub mod shipping;

pub use address::{Address, BillingAddress};
pub use insurance::{InsuranceSelection, InsuranceTier};
pub use item::JewelryItem;
pub use order::{OrderState, OrderSummary};
pub use payment::PaymentSelection;
pub use shipping::{ShippingMethod, ShippingProtection, ShippingSelection};
