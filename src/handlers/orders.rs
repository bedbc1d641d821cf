use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::{CheckoutOutcome, Payer};
use crate::application::Caller;
use crate::domain::checkout::CartLine;
use crate::domain::order::PaymentMethod;
use crate::errors::AppError;
use crate::AppState;

use super::{blocking, AddressDto, ListOrdersParams, ListOrdersResponse, OrderResponse};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CartLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CheckoutRequest {
    pub lines: Vec<CartLineRequest>,
    pub address: AddressDto,
    /// `cod` or `upi`
    pub payment_method: String,
    /// Payer details for the gateway form, pay-now orders only.
    pub first_name: Option<String>,
    pub email: Option<String>,
}

/// Form the client submits to the payment gateway.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PaymentRedirectResponse {
    pub action: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    /// Present for pay-now orders.
    pub payment: Option<PaymentRedirectResponse>,
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        CheckoutResponse {
            order: outcome.order.into(),
            payment: outcome.redirect.map(|r| PaymentRedirectResponse {
                action: r.action,
                fields: r.fields,
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ConfirmDeliveryRequest {
    pub confirmed: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Checks out the caller's cart. The order, its item snapshots, the payment
/// record (pay-now only) and an outbox event are written in one transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = CheckoutResponse),
        (status = 400, description = "Invalid cart, address or phone"),
        (status = 401, description = "Caller is not a customer"),
        (status = 503, description = "Online payments are not configured"),
    ),
    tag = "orders"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let payment_method: PaymentMethod = body.payment_method.parse()?;
    let lines: Vec<CartLine> = body
        .lines
        .iter()
        .map(|l| CartLine {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect();
    let payer = Payer {
        first_name: body.first_name,
        email: body.email,
    };

    let orders = state.orders.clone();
    let outcome = blocking(move || {
        orders.checkout(&caller, lines, body.address.into(), payment_method, payer)
    })
    .await?;

    Ok(HttpResponse::Created().json(CheckoutResponse::from(outcome)))
}

/// GET /orders
///
/// The caller's order history, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated order history", body = ListOrdersResponse),
        (status = 401, description = "Missing caller identity"),
    ),
    tag = "orders"
)]
pub async fn list_my_orders(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.bounds();
    let orders = state.orders.clone();
    let result = blocking(move || orders.list_mine(&caller, page, limit)).await?;
    Ok(HttpResponse::Ok().json(ListOrdersResponse::new(result, page, limit)))
}

/// GET /orders/{id}
///
/// Visible to the owner, the assigned partner and admins.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();
    let order = blocking(move || orders.get(&caller, order_id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is no longer pending"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let orders = state.orders.clone();
    let order = blocking(move || orders.cancel(&caller, order_id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/confirm-delivery
///
/// The owning customer confirms or rejects a delivery. A rejection returns the
/// order to its partner and is recorded for admin review.
#[utoipa::path(
    post,
    path = "/orders/{id}/confirm-delivery",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = ConfirmDeliveryRequest,
    responses(
        (status = 200, description = "Answer recorded", body = OrderResponse),
        (status = 404, description = "Order not found or not owned by the caller"),
        (status = 409, description = "No delivery confirmation is pending"),
    ),
    tag = "orders"
)]
pub async fn confirm_delivery(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<ConfirmDeliveryRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let confirmed = body.confirmed;
    let deliveries = state.deliveries.clone();
    let order = blocking(move || deliveries.confirm_delivery(&caller, order_id, confirmed)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
