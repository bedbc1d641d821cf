pub mod admin;
pub mod changes;
pub mod delivery;
pub mod orders;
pub mod payments;

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{web, FromRequest, HttpRequest};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::application::{Caller, Role};
use crate::domain::order::{DeliveryAddress, ListResult, Order, OrderItem};
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

// ── Caller identity ──────────────────────────────────────────────────────────

fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, AppError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let user_id = header(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("missing caller identity".to_string()))?
        .parse::<Uuid>()
        .map_err(|_| AppError::Unauthorized("malformed caller identity".to_string()))?;
    let role = header(USER_ROLE_HEADER)
        .unwrap_or("customer")
        .parse::<Role>()?;
    Ok(Caller::new(user_id, role))
}

/// Identity headers are set by the auth gateway in front of this service.
impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(caller_from_headers(req.headers()))
    }
}

// ── Shared DTOs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressDto {
    pub recipient_name: Option<String>,
    pub phone: String,
    pub apartment: String,
    pub block_no: String,
    pub flat_no: String,
    pub note: Option<String>,
}

impl From<AddressDto> for DeliveryAddress {
    fn from(dto: AddressDto) -> Self {
        DeliveryAddress {
            recipient_name: dto.recipient_name,
            phone: dto.phone,
            apartment: dto.apartment,
            block_no: dto.block_no,
            flat_no: dto.flat_no,
            note: dto.note,
        }
    }
}

impl From<DeliveryAddress> for AddressDto {
    fn from(address: DeliveryAddress) -> Self {
        AddressDto {
            recipient_name: address.recipient_name,
            phone: address.phone,
            apartment: address.apartment,
            block_no: address.block_no,
            flat_no: address.flat_no,
            note: address.note,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        OrderItemResponse {
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub delivery_partner_id: Option<Uuid>,
    pub delivery_confirmation_requested_at: Option<String>,
    pub user_confirmed_delivery: Option<bool>,
    pub address: AddressDto,
    pub items: Vec<OrderItemResponse>,
    pub delivery_fee: String,
    pub total_amount: String,
    pub created_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id,
            customer_id: order.customer_id,
            status: order.status.as_str().to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            delivery_partner_id: order.delivery_partner_id,
            delivery_confirmation_requested_at: order
                .delivery_confirmation_requested_at
                .map(|t| t.to_rfc3339()),
            user_confirmed_delivery: order.user_confirmed_delivery,
            address: order.address.into(),
            items: order.items.into_iter().map(Into::into).collect(),
            delivery_fee: order.delivery_fee.to_string(),
            total_amount: order.total_amount.to_string(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Comma-separated statuses, admin listing only.
    pub status: Option<String>,
}

const MAX_PAGE: i64 = 1_000_000;
const MAX_LIMIT: i64 = 100;

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

impl ListOrdersParams {
    pub fn bounds(&self) -> (i64, i64) {
        (self.page.clamp(1, MAX_PAGE), self.limit.clamp(1, MAX_LIMIT))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl ListOrdersResponse {
    pub fn new(result: ListResult, page: i64, limit: i64) -> Self {
        ListOrdersResponse {
            items: result.items.into_iter().map(Into::into).collect(),
            total: result.total,
            page,
            limit,
        }
    }
}

/// Runs blocking store work on the actix thread pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, crate::domain::errors::DomainError> + Send + 'static,
    T: Send + 'static,
{
    Ok(web::block(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??)
}

// ── OpenAPI ──────────────────────────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::checkout,
        orders::list_my_orders,
        orders::get_order,
        orders::cancel_order,
        orders::confirm_delivery,
        delivery::sign_up,
        delivery::list_assigned_orders,
        delivery::mark_delivered,
        admin::list_orders,
        admin::order_stats,
        admin::assign_order,
        admin::list_partners,
        admin::set_partner_status,
        admin::get_auto_assign,
        admin::set_auto_assign,
        admin::list_activities,
        admin::review_activity,
        payments::payu_webhook,
        changes::subscribe,
    ),
    tags(
        (name = "orders", description = "Customer checkout and order tracking"),
        (name = "delivery", description = "Delivery partner operations"),
        (name = "admin", description = "Assignment, partners, settings and audit review"),
        (name = "payments", description = "Payment gateway callbacks"),
        (name = "changes", description = "Table change notifications"),
    )
)]
pub struct ApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(orders::checkout))
            .route("", web::get().to(orders::list_my_orders))
            .route("/{id}", web::get().to(orders::get_order))
            .route("/{id}/cancel", web::post().to(orders::cancel_order))
            .route(
                "/{id}/confirm-delivery",
                web::post().to(orders::confirm_delivery),
            ),
    )
    .service(
        web::scope("/delivery")
            .route("/partners", web::post().to(delivery::sign_up))
            .route("/orders", web::get().to(delivery::list_assigned_orders))
            .route(
                "/orders/{id}/mark-delivered",
                web::post().to(delivery::mark_delivered),
            ),
    )
    .service(
        web::scope("/admin")
            .route("/orders", web::get().to(admin::list_orders))
            .route("/orders/{id}/assign", web::post().to(admin::assign_order))
            .route("/stats", web::get().to(admin::order_stats))
            .route("/partners", web::get().to(admin::list_partners))
            .route(
                "/partners/{id}/status",
                web::put().to(admin::set_partner_status),
            )
            .route("/settings/auto-assign", web::get().to(admin::get_auto_assign))
            .route("/settings/auto-assign", web::put().to(admin::set_auto_assign))
            .route("/activities", web::get().to(admin::list_activities))
            .route(
                "/activities/{id}/review",
                web::put().to(admin::review_activity),
            ),
    )
    .route("/payments/payu/webhook", web::post().to(payments::payu_webhook))
    .route("/changes", web::get().to(changes::subscribe));
}
