//! HTTP adapters over [`OrderService`]

pub mod auth;
pub mod error;
pub mod orders;
pub mod products;

use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::service::OrderService;
use crate::EcommerceError;

pub use auth::AuthUser;

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub jwt_secret: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-orders"})) }))
        .route("/api/v1/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/v1/orders/verify-payment", post(orders::verify_payment))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/cancel", put(orders::cancel_order))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route("/api/v1/products", post(products::create_product))
        .route("/api/v1/products/:id", get(products::get_product))
        .route("/api/v1/products/:id/pricing", put(products::update_pricing))
        .route("/api/v1/products/:id/restock", post(products::restock))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

pub(crate) fn parse_id(raw: &str, field: &str) -> Result<Uuid, EcommerceError> {
    Uuid::parse_str(raw).map_err(|_| EcommerceError::validation(field, "is not a valid id"))
}

pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, EcommerceError> {
    payload.map(|Json(v)| v).map_err(|e| EcommerceError::validation("body", e.body_text()))
}
