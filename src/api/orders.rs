//! Order endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{body, parse_id, AppState, AuthUser};
use crate::domain::aggregates::{Order, OrderStatus};
use crate::service::CreateOrderRequest;
use crate::EcommerceError;

type ApiResult<T> = Result<T, EcommerceError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub success: bool,
    pub order: Order,
    pub payment_intent_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct OrderEnvelope {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub success: bool,
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub intent_id: Option<String>,
    pub confirmation_id: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    pub cancel_reason: Option<String>,
}

fn envelope(order: Order) -> Json<OrderEnvelope> {
    Json(OrderEnvelope { success: true, order })
}

pub async fn create_order(
    State(s): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderCreated>)> {
    let request = body(payload)?;
    let placed = s.orders.create_order(caller.account_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderCreated {
            success: true,
            payment_intent_id: placed.payment_intent.id,
            amount_minor: placed.payment_intent.amount_minor,
            currency: placed.payment_intent.currency,
            order: placed.order,
        }),
    ))
}

pub async fn list_orders(State(s): State<AppState>, AuthUser(caller): AuthUser) -> ApiResult<Json<OrderList>> {
    let orders = s.orders.account_orders(&caller).await?;
    Ok(Json(OrderList { success: true, orders }))
}

pub async fn get_order(State(s): State<AppState>, AuthUser(caller): AuthUser, Path(id): Path<String>) -> ApiResult<Json<OrderEnvelope>> {
    let order = s.orders.order(&caller, parse_id(&id, "orderId")?).await?;
    Ok(envelope(order))
}

/// Gateway confirmation callback. Authenticated by signature, not by token.
pub async fn verify_payment(
    State(s): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> ApiResult<Json<OrderEnvelope>> {
    let r = body(payload)?;
    let order = s
        .orders
        .verify_payment(
            r.intent_id.as_deref().unwrap_or_default(),
            r.confirmation_id.as_deref().unwrap_or_default(),
            r.signature.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(envelope(order))
}

pub async fn cancel_order(
    State(s): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> ApiResult<Json<OrderEnvelope>> {
    let order_id = parse_id(&id, "orderId")?;
    let r = body(payload)?;
    let order = s.orders.cancel_order(&caller, order_id, r.cancel_reason.as_deref().unwrap_or_default()).await?;
    Ok(envelope(order))
}

pub async fn update_status(
    State(s): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<OrderEnvelope>> {
    let order_id = parse_id(&id, "orderId")?;
    let r = body(payload)?;
    let order = s.orders.update_status(&caller, order_id, r.status, r.cancel_reason.as_deref()).await?;
    Ok(envelope(order))
}
