//! Aggregates module
pub mod account;
pub mod order;
pub mod product;

pub use account::Account;
pub use order::{order_total, LineItem, Order, OrderStatus, PaymentMethod, PaymentOutcome, PaymentStatus, StatusChange};
pub use product::Product;
