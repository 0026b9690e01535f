//! Catalog endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{body, parse_id, AppState, AuthUser};
use crate::domain::aggregates::Product;
use crate::service::catalog::{NewProduct, PricingUpdate};
use crate::EcommerceError;

type ApiResult<T> = Result<T, EcommerceError>;

#[derive(Debug, Serialize)]
pub struct ProductEnvelope {
    pub success: bool,
    pub product: Product,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: u32,
}

fn envelope(product: Product) -> Json<ProductEnvelope> {
    Json(ProductEnvelope { success: true, product })
}

pub async fn create_product(
    State(s): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductEnvelope>)> {
    let product = s.orders.create_product(&caller, body(payload)?).await?;
    Ok((StatusCode::CREATED, envelope(product)))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ProductEnvelope>> {
    let product = s.orders.product(parse_id(&id, "productId")?).await?;
    Ok(envelope(product))
}

pub async fn update_pricing(
    State(s): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<PricingUpdate>, JsonRejection>,
) -> ApiResult<Json<ProductEnvelope>> {
    let product_id = parse_id(&id, "productId")?;
    let product = s.orders.update_pricing(&caller, product_id, body(payload)?).await?;
    Ok(envelope(product))
}

pub async fn restock(
    State(s): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<RestockRequest>, JsonRejection>,
) -> ApiResult<Json<ProductEnvelope>> {
    let product_id = parse_id(&id, "productId")?;
    let r = body(payload)?;
    let product = s.orders.restock(&caller, product_id, r.quantity).await?;
    Ok(envelope(product))
}
