use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::Caller;
use crate::domain::activity::{ActivityFilter, MaliciousActivity, ReviewStatus, Severity};
use crate::domain::order::{OrderStats, OrderStatus};
use crate::domain::partner::PartnerStatus;
use crate::errors::AppError;
use crate::AppState;

use super::delivery::PartnerResponse;
use super::{blocking, ListOrdersParams, ListOrdersResponse, OrderResponse};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_orders: i64,
    pub by_status: BTreeMap<String, i64>,
    pub delivered_revenue: String,
    /// Pending orders whose payment allows assignment.
    pub awaiting_assignment: i64,
}

impl From<OrderStats> for StatsResponse {
    fn from(stats: OrderStats) -> Self {
        StatsResponse {
            total_orders: stats.total_orders,
            by_status: stats
                .by_status
                .into_iter()
                .map(|(status, count)| (status.as_str().to_string(), count))
                .collect(),
            delivered_revenue: stats.delivered_revenue.to_string(),
            awaiting_assignment: stats.awaiting_assignment,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AssignRequest {
    /// Omit or send null to unassign.
    pub delivery_partner_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PartnerStatusRequest {
    /// `approved`, `paused` or `deleted`
    pub status: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AutoAssignSetting {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
}

impl ActivityQuery {
    fn filter(&self) -> Result<ActivityFilter, AppError> {
        Ok(ActivityFilter {
            status: self
                .status
                .as_deref()
                .map(str::parse::<ReviewStatus>)
                .transpose()?,
            severity: self
                .severity
                .as_deref()
                .map(str::parse::<Severity>)
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub delivery_partner_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub activity_type: String,
    pub severity: String,
    pub description: String,
    pub status: String,
    pub resolution_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

impl From<MaliciousActivity> for ActivityResponse {
    fn from(a: MaliciousActivity) -> Self {
        ActivityResponse {
            id: a.id,
            delivery_partner_id: a.delivery_partner_id,
            customer_id: a.customer_id,
            order_id: a.order_id,
            activity_type: a.activity_type.as_str().to_string(),
            severity: a.severity.as_str().to_string(),
            description: a.description,
            status: a.status.as_str().to_string(),
            resolution_notes: a.resolution_notes,
            reviewed_by: a.reviewed_by,
            reviewed_at: a.reviewed_at.map(|t| t.to_rfc3339()),
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReviewRequest {
    /// `reviewed`, `resolved` or `dismissed`
    pub status: String,
    pub notes: Option<String>,
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<OrderStatus>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<OrderStatus>().map_err(AppError::from))
        .collect()
}

// ── Orders ───────────────────────────────────────────────────────────────────

/// GET /admin/orders
#[utoipa::path(
    get,
    path = "/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("status" = Option<String>, Query, description = "Comma-separated statuses, e.g. pending,assigned"),
    ),
    responses(
        (status = 200, description = "Paginated orders", body = ListOrdersResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.bounds();
    let statuses = parse_statuses(query.status.as_deref())?;
    let orders = state.orders.clone();
    let result = blocking(move || orders.list_all(&caller, statuses, page, limit)).await?;
    Ok(HttpResponse::Ok().json(ListOrdersResponse::new(result, page, limit)))
}

/// GET /admin/stats
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Order counts and delivered revenue", body = StatsResponse),
        (status = 401, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn order_stats(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, AppError> {
    let orders = state.orders.clone();
    let stats = blocking(move || orders.stats(&caller)).await?;
    Ok(HttpResponse::Ok().json(StatsResponse::from(stats)))
}

/// POST /admin/orders/{id}/assign
///
/// Assigns a pending or assigned order to an approved partner, or unassigns
/// it when no partner is given.
#[utoipa::path(
    post,
    path = "/admin/orders/{id}/assign",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Assignment applied", body = OrderResponse),
        (status = 400, description = "Partner cannot take orders"),
        (status = 401, description = "Caller is not an admin"),
        (status = 404, description = "Order or partner not found"),
        (status = 409, description = "Order is past assignment"),
    ),
    tag = "admin"
)]
pub async fn assign_order(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<AssignRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let partner_id = body.delivery_partner_id;
    let assignments = state.assignments.clone();
    let order = blocking(move || assignments.assign(&caller, order_id, partner_id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

// ── Partners ─────────────────────────────────────────────────────────────────

/// GET /admin/partners
#[utoipa::path(
    get,
    path = "/admin/partners",
    responses(
        (status = 200, description = "Registered delivery partners", body = Vec<PartnerResponse>),
        (status = 401, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_partners(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, AppError> {
    let admin = state.admin.clone();
    let partners = blocking(move || admin.list_partners(&caller)).await?;
    let body: Vec<PartnerResponse> = partners.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// PUT /admin/partners/{id}/status
#[utoipa::path(
    put,
    path = "/admin/partners/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Delivery partner UUID"),
    ),
    request_body = PartnerStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = PartnerResponse),
        (status = 400, description = "Unknown or disallowed status"),
        (status = 401, description = "Caller is not an admin"),
        (status = 404, description = "Partner not found"),
    ),
    tag = "admin"
)]
pub async fn set_partner_status(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<PartnerStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let partner_id = path.into_inner();
    let status: PartnerStatus = body.status.parse()?;
    let admin = state.admin.clone();
    let partner = blocking(move || admin.set_partner_status(&caller, partner_id, status)).await?;
    Ok(HttpResponse::Ok().json(PartnerResponse::from(partner)))
}

// ── Settings ─────────────────────────────────────────────────────────────────

/// GET /admin/settings/auto-assign
#[utoipa::path(
    get,
    path = "/admin/settings/auto-assign",
    responses(
        (status = 200, description = "Current toggle", body = AutoAssignSetting),
        (status = 401, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn get_auto_assign(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, AppError> {
    let admin = state.admin.clone();
    let enabled = blocking(move || admin.auto_assign_enabled(&caller)).await?;
    Ok(HttpResponse::Ok().json(AutoAssignSetting { enabled }))
}

/// PUT /admin/settings/auto-assign
#[utoipa::path(
    put,
    path = "/admin/settings/auto-assign",
    request_body = AutoAssignSetting,
    responses(
        (status = 200, description = "Toggle stored", body = AutoAssignSetting),
        (status = 401, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn set_auto_assign(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<AutoAssignSetting>,
) -> Result<HttpResponse, AppError> {
    let wanted = body.enabled;
    let admin = state.admin.clone();
    let enabled = blocking(move || admin.set_auto_assign(&caller, wanted)).await?;
    Ok(HttpResponse::Ok().json(AutoAssignSetting { enabled }))
}

// ── Activity review ──────────────────────────────────────────────────────────

/// GET /admin/activities
#[utoipa::path(
    get,
    path = "/admin/activities",
    params(
        ("status" = Option<String>, Query, description = "pending, reviewed, resolved or dismissed"),
        ("severity" = Option<String>, Query, description = "low, medium, high or critical"),
    ),
    responses(
        (status = 200, description = "Audit records, newest first", body = Vec<ActivityResponse>),
        (status = 400, description = "Unknown filter value"),
        (status = 401, description = "Caller is not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_activities(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.filter()?;
    let admin = state.admin.clone();
    let activities = blocking(move || admin.list_activities(&caller, &filter)).await?;
    let body: Vec<ActivityResponse> = activities.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// PUT /admin/activities/{id}/review
#[utoipa::path(
    put,
    path = "/admin/activities/{id}/review",
    params(
        ("id" = Uuid, Path, description = "Activity UUID"),
    ),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = ActivityResponse),
        (status = 400, description = "Unknown or disallowed status"),
        (status = 401, description = "Caller is not an admin"),
        (status = 404, description = "Activity not found"),
        (status = 409, description = "Activity is already resolved or dismissed"),
    ),
    tag = "admin"
)]
pub async fn review_activity(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let activity_id = path.into_inner();
    let body = body.into_inner();
    let status: ReviewStatus = body.status.parse()?;
    let admin = state.admin.clone();
    let activity =
        blocking(move || admin.review_activity(&caller, activity_id, status, body.notes)).await?;
    Ok(HttpResponse::Ok().json(ActivityResponse::from(activity)))
}
