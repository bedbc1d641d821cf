use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::domain::order::OrderStatus;

use super::registry::ViewKey;

const ORDER_VIEWS: [&str; 3] = ["admin-orders", "delivery-orders", "user-orders"];
const PRODUCT_VIEWS: [&str; 2] = ["products", "admin-products"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationId(u64);

#[derive(Debug, Clone)]
struct CachedView {
    rows: Vec<Value>,
    stale: bool,
}

/// One field of one row overwritten ahead of the server.
#[derive(Debug, Clone)]
struct Overwrite {
    view: ViewKey,
    row_id: String,
    field: String,
    previous: Option<Value>,
    written: Value,
}

#[derive(Debug, Clone)]
struct PendingMutation {
    id: MutationId,
    overwrites: Vec<Overwrite>,
}

/// Locally cached query results keyed by view name.
///
/// A view is served only while fresh. Relay events mark views stale, the
/// next fetch stores authoritative rows and discards any optimistic overwrite
/// still pending for that view.
#[derive(Debug, Default)]
pub struct ViewCache {
    views: HashMap<ViewKey, CachedView>,
    pending: Vec<PendingMutation>,
    next_id: u64,
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores authoritative rows fetched for `view`.
    pub fn store(&mut self, view: impl Into<ViewKey>, rows: Vec<Value>) {
        let view = view.into();
        for mutation in &mut self.pending {
            mutation.overwrites.retain(|o| o.view != view);
        }
        self.pending.retain(|m| !m.overwrites.is_empty());
        self.views.insert(view, CachedView { rows, stale: false });
    }

    /// Rows of `view`, or `None` when it was never fetched or went stale.
    pub fn get(&self, view: &str) -> Option<&[Value]> {
        self.views
            .get(view)
            .filter(|v| !v.stale)
            .map(|v| v.rows.as_slice())
    }

    pub fn is_stale(&self, view: &str) -> bool {
        self.views.get(view).map_or(true, |v| v.stale)
    }

    /// Marks the given views stale. Returns how many cached views changed.
    pub fn invalidate<'a, I>(&mut self, views: I) -> usize
    where
        I: IntoIterator<Item = &'a ViewKey>,
    {
        let mut marked = 0;
        for key in views {
            if let Some(view) = self.views.get_mut(key) {
                if !view.stale {
                    view.stale = true;
                    marked += 1;
                }
            }
        }
        marked
    }

    pub fn invalidate_all(&mut self) {
        for view in self.views.values_mut() {
            view.stale = true;
        }
    }

    /// Overwrites `field` of row `id` in each cached view that holds it.
    pub fn apply_optimistic(
        &mut self,
        views: &[&str],
        id: &str,
        field: &str,
        value: Value,
    ) -> MutationId {
        let mutation_id = MutationId(self.next_id);
        self.next_id += 1;

        let mut overwrites = Vec::new();
        for view_key in views {
            let Some(view) = self.views.get_mut(*view_key) else {
                continue;
            };
            for row in view.rows.iter_mut().filter(|r| row_id(r) == Some(id)) {
                let Some(obj) = row.as_object_mut() else {
                    continue;
                };
                let previous = obj.insert(field.to_string(), value.clone());
                overwrites.push(Overwrite {
                    view: view_key.to_string(),
                    row_id: id.to_string(),
                    field: field.to_string(),
                    previous,
                    written: value.clone(),
                });
            }
        }

        self.pending.push(PendingMutation {
            id: mutation_id,
            overwrites,
        });
        mutation_id
    }

    /// The write behind `id` succeeded; its values stay until the next fetch.
    pub fn confirm(&mut self, id: MutationId) {
        self.pending.retain(|m| m.id != id);
    }

    /// The write behind `id` failed: restore what it overwrote, unless a later
    /// overwrite already replaced it, and mark the touched views stale.
    pub fn rollback(&mut self, id: MutationId) {
        let Some(pos) = self.pending.iter().position(|m| m.id == id) else {
            return;
        };
        let mutation = self.pending.remove(pos);

        for ow in mutation.overwrites.into_iter().rev() {
            let Some(view) = self.views.get_mut(&ow.view) else {
                continue;
            };
            for row in view
                .rows
                .iter_mut()
                .filter(|r| row_id(r) == Some(ow.row_id.as_str()))
            {
                let Some(obj) = row.as_object_mut() else {
                    continue;
                };
                if obj.get(&ow.field) != Some(&ow.written) {
                    continue;
                }
                match &ow.previous {
                    Some(prev) => {
                        obj.insert(ow.field.clone(), prev.clone());
                    }
                    None => {
                        obj.remove(&ow.field);
                    }
                }
            }
            view.stale = true;
        }
    }

    pub fn pending_mutations(&self) -> usize {
        self.pending.len()
    }

    pub fn update_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> MutationId {
        self.apply_optimistic(
            &ORDER_VIEWS,
            &order_id.to_string(),
            "status",
            Value::from(status.as_str()),
        )
    }

    pub fn update_product_stock(&mut self, product_id: Uuid, stock: i64) -> MutationId {
        self.apply_optimistic(
            &PRODUCT_VIEWS,
            &product_id.to_string(),
            "stock",
            Value::from(stock),
        )
    }
}
