use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::domain::activity::{NewActivity, ReviewStatus};
use crate::domain::checkout::Product;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    page_offset, ListResult, NewOrder, Order, OrderFilter, OrderPatch, OrderStats, OrderStatus,
    PaymentStatus,
};
use crate::domain::ports::{CatalogRepository, OrderRepository};
use crate::schema::{
    cart_items, commerce_order_outbox, malicious_activities, order_items, orders, payments,
    products,
};

use super::models::{
    NewActivityRow, NewOrderItemRow, NewOrderRow, NewPaymentRow, OrderChangeset, OrderItemRow,
    OrderRow, ProductRow,
};
use super::{order_event, transition_event_type, DieselStore};

fn filtered(filter: &OrderFilter) -> orders::BoxedQuery<'static, Pg> {
    let mut query = orders::table.into_boxed();
    if let Some(customer) = filter.customer_id {
        query = query.filter(orders::customer_id.eq(customer));
    }
    if let Some(partner) = filter.delivery_partner_id {
        query = query.filter(orders::delivery_partner_id.eq(partner));
    }
    if !filter.statuses.is_empty() {
        let statuses: Vec<&'static str> = filter.statuses.iter().map(|s| s.as_str()).collect();
        query = query.filter(orders::status.eq_any(statuses));
    }
    query
}

fn order_payload(order: &Order) -> serde_json::Value {
    json!({
        "order_id": order.id,
        "customer_id": order.customer_id,
        "status": order.status.as_str(),
        "payment_status": order.payment_status.as_str(),
        "delivery_partner_id": order.delivery_partner_id,
    })
}

pub(crate) fn load_order(conn: &mut PgConnection, row: OrderRow) -> Result<Order, DomainError> {
    let items = OrderItemRow::belonging_to(&row)
        .select(OrderItemRow::as_select())
        .load(conn)?;
    row.into_domain(items)
}

/// Conditional update shared by every order transition. Runs inside the
/// caller's transaction.
pub(crate) fn apply_transition(
    conn: &mut PgConnection,
    id: Uuid,
    expected: OrderStatus,
    patch: &OrderPatch,
) -> Result<Order, DomainError> {
    let changeset = OrderChangeset::from(patch);
    let updated = diesel::update(
        orders::table
            .filter(orders::id.eq(id))
            .filter(orders::status.eq(expected.as_str())),
    )
    .set((&changeset, orders::updated_at.eq(Utc::now())))
    .returning(OrderRow::as_returning())
    .get_result(conn)
    .optional()?;

    let Some(row) = updated else {
        let exists: bool =
            diesel::select(diesel::dsl::exists(orders::table.filter(orders::id.eq(id))))
                .get_result(conn)?;
        return Err(if exists {
            DomainError::Conflict(format!("order {id} is no longer {expected}"))
        } else {
            DomainError::order_not_found()
        });
    };

    let order = load_order(conn, row)?;
    diesel::insert_into(commerce_order_outbox::table)
        .values(&order_event(
            order.id,
            transition_event_type(patch),
            order_payload(&order),
        ))
        .execute(conn)?;
    Ok(order)
}

impl OrderRepository for DieselStore {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        if order.items.is_empty() {
            return Err(DomainError::InvalidInput(
                "an order needs at least one item".to_string(),
            ));
        }
        let address = serde_json::to_value(&order.address)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order
            let row = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order.id,
                    customer_id: order.customer_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    payment_method: order.payment_method.as_str().to_string(),
                    address,
                    delivery_fee: order.delivery_fee.clone(),
                    total_amount: order.total_amount.clone(),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // 2. Insert the item snapshots
            let new_items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .map(|item| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                })
                .collect();
            let items = diesel::insert_into(order_items::table)
                .values(&new_items)
                .returning(OrderItemRow::as_returning())
                .get_results(conn)?;

            // 3. Pay-now orders get their payment record, COD orders are final
            //    and empty the cart.
            match &order.payment {
                Some(payment) => {
                    diesel::insert_into(payments::table)
                        .values(&NewPaymentRow {
                            id: payment.id,
                            order_id: order.id,
                            provider: payment.provider.clone(),
                            provider_payment_id: payment.provider_payment_id.clone(),
                            amount: payment.amount.clone(),
                            status: PaymentStatus::Pending.as_str().to_string(),
                        })
                        .execute(conn)?;
                }
                None => {
                    diesel::delete(cart_items::table.filter(cart_items::customer_id.eq(order.customer_id)))
                        .execute(conn)?;
                }
            }

            let created = row.into_domain(items)?;

            // 4. Outbox event in the same transaction.
            let lines: Vec<serde_json::Value> = created
                .items
                .iter()
                .map(|item| {
                    json!({
                        "product_id": item.product_id,
                        "product_name": item.product_name,
                        "quantity": item.quantity,
                        "unit_price": item.unit_price.to_string()
                    })
                })
                .collect();
            let mut payload = order_payload(&created);
            payload["total_amount"] = json!(created.total_amount.to_string());
            payload["lines"] = json!(lines);
            diesel::insert_into(commerce_order_outbox::table)
                .values(&order_event(created.id, "OrderCreated", payload))
                .execute(conn)?;

            Ok(created)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        match row {
            Some(row) => load_order(&mut conn, row).map(Some),
            None => Ok(None),
        }
    }

    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let offset = page_offset(page, limit)?;
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(filter).count().get_result(conn)?;

            let rows = filtered(filter)
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            let items = OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .load(conn)?
                .grouped_by(&rows);

            let orders = rows
                .into_iter()
                .zip(items)
                .map(|(row, items)| row.into_domain(items))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult {
                items: orders,
                total,
            })
        })
    }

    fn stats(&self) -> Result<OrderStats, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let counts: Vec<(String, i64)> = orders::table
                .group_by(orders::status)
                .select((orders::status, diesel::dsl::count_star()))
                .load(conn)?;

            let revenue: Option<BigDecimal> = orders::table
                .filter(orders::status.eq(OrderStatus::Delivered.as_str()))
                .select(diesel::dsl::sum(orders::total_amount))
                .get_result(conn)?;

            let awaiting_assignment: i64 = orders::table
                .filter(orders::status.eq(OrderStatus::Pending.as_str()))
                .filter(
                    orders::payment_status
                        .eq(PaymentStatus::Paid.as_str())
                        .or(orders::payment_method.eq("cod")),
                )
                .count()
                .get_result(conn)?;

            let mut by_status = Vec::with_capacity(counts.len());
            for (status, count) in counts {
                by_status.push((status.parse::<OrderStatus>()?, count));
            }
            by_status.sort();

            Ok(OrderStats {
                total_orders: by_status.iter().map(|(_, n)| n).sum(),
                by_status,
                delivered_revenue: revenue.unwrap_or_else(|| BigDecimal::from(0)),
                awaiting_assignment,
            })
        })
    }

    fn transition(
        &self,
        id: Uuid,
        expected: OrderStatus,
        patch: &OrderPatch,
        audit: Option<NewActivity>,
    ) -> Result<Order, DomainError> {
        if patch.is_empty() {
            return self.find_by_id(id)?.ok_or_else(DomainError::order_not_found);
        }
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = apply_transition(conn, id, expected, patch)?;

            if let Some(activity) = audit {
                diesel::insert_into(malicious_activities::table)
                    .values(&NewActivityRow {
                        id: Uuid::new_v4(),
                        delivery_partner_id: activity.delivery_partner_id,
                        customer_id: activity.customer_id,
                        order_id: activity.order_id,
                        activity_type: activity.activity_type.as_str().to_string(),
                        severity: activity.severity.as_str().to_string(),
                        description: activity.description,
                        status: ReviewStatus::Pending.as_str().to_string(),
                    })
                    .execute(conn)?;
            }

            Ok(order)
        })
    }
}

impl CatalogRepository for DieselStore {
    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}
