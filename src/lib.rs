//! Storefront Orders
//!
//! Order placement and payment reconciliation for the storefront backend.
//!
//! ## Features
//! - Cart checkout with atomic stock reservation
//! - Payment intent creation against an external gateway
//! - Signed payment confirmation with replay-safe verification
//! - Order lifecycle (status history, cancellation, admin transitions)
//! - Catalog pricing and restocking for admins

pub mod api;
pub mod config;
pub mod domain;
pub mod notify;
pub mod payment;
pub mod service;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

pub use domain::aggregates::{Account, LineItem, Order, OrderStatus, PaymentMethod, PaymentStatus, Product, StatusChange};
pub use domain::value_objects::DeliveryAddress;
pub use payment::GatewayError;
pub use service::{OrderService, OrderSettings};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: Uuid, requested: u32, available: u32 },

    #[error("Payment gateway error: {0}")]
    PaymentGateway(#[from] GatewayError),

    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    #[error("You are not authorized to act on this order")]
    NotAuthorized,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Operation timed out")]
    Timeout,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EcommerceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
