use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::Caller;
use crate::domain::partner::DeliveryPartner;
use crate::errors::AppError;
use crate::AppState;

use super::{blocking, ListOrdersParams, ListOrdersResponse, OrderResponse};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PartnerResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub allowed: bool,
    pub created_at: String,
}

impl From<DeliveryPartner> for PartnerResponse {
    fn from(partner: DeliveryPartner) -> Self {
        PartnerResponse {
            id: partner.id,
            user_id: partner.user_id,
            status: partner.status.as_str().to_string(),
            allowed: partner.allowed,
            created_at: partner.created_at.to_rfc3339(),
        }
    }
}

/// POST /delivery/partners
///
/// Registers the caller as a delivery partner. New partners wait for admin
/// approval before they can take orders.
#[utoipa::path(
    post,
    path = "/delivery/partners",
    responses(
        (status = 201, description = "Partner registered", body = PartnerResponse),
        (status = 401, description = "Caller is not a delivery account"),
        (status = 409, description = "Caller is already registered"),
    ),
    tag = "delivery"
)]
pub async fn sign_up(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, AppError> {
    let deliveries = state.deliveries.clone();
    let partner = blocking(move || deliveries.sign_up(&caller)).await?;
    Ok(HttpResponse::Created().json(PartnerResponse::from(partner)))
}

/// GET /delivery/orders
///
/// Orders assigned to the calling partner that are not finished yet.
#[utoipa::path(
    get,
    path = "/delivery/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Open assignments", body = ListOrdersResponse),
        (status = 401, description = "Caller is not an approved delivery partner"),
    ),
    tag = "delivery"
)]
pub async fn list_assigned_orders(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.bounds();
    let orders = state.orders.clone();
    let result = blocking(move || orders.list_assigned(&caller, page, limit)).await?;
    Ok(HttpResponse::Ok().json(ListOrdersResponse::new(result, page, limit)))
}

/// POST /delivery/orders/{id}/mark-delivered
///
/// Moves the order to `out_for_delivery` and asks the customer to confirm.
/// Orders assigned to someone else answer 404.
#[utoipa::path(
    post,
    path = "/delivery/orders/{id}/mark-delivered",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Confirmation requested", body = OrderResponse),
        (status = 401, description = "Caller is not an approved delivery partner"),
        (status = 404, description = "Order not found or not assigned to the caller"),
        (status = 409, description = "Order is not awaiting delivery"),
    ),
    tag = "delivery"
)]
pub async fn mark_delivered(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let deliveries = state.deliveries.clone();
    let order = blocking(move || deliveries.mark_delivered(&caller, order_id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
