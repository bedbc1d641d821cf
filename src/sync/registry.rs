use std::collections::{BTreeMap, BTreeSet};

use crate::relay::Table;

/// Name of a cached view, e.g. `admin-orders`.
pub type ViewKey = String;

/// Which cached views go stale when a table changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRegistry {
    views: BTreeMap<Table, BTreeSet<ViewKey>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The storefront screens and the tables they read.
    pub fn storefront() -> Self {
        let mut reg = Self::new();
        reg.register_all(
            Table::Orders,
            &[
                "orders",
                "admin-orders",
                "delivery-orders",
                "user-orders",
                "system-stats",
            ],
        );
        reg.register_all(
            Table::Products,
            &[
                "products",
                "admin-products",
                "featured-products",
                "category-stats",
            ],
        );
        reg.register_all(Table::Users, &["users", "system-stats"]);
        reg.register_all(
            Table::DeliveryPartners,
            &[
                "delivery-partners",
                "delivery-partners-all",
                "admin-delivery-partners",
                "system-stats",
            ],
        );
        reg.register_all(Table::MaliciousActivities, &["malicious-activities"]);
        reg
    }

    pub fn register(&mut self, table: Table, view: impl Into<ViewKey>) -> &mut Self {
        self.views.entry(table).or_default().insert(view.into());
        self
    }

    pub fn register_all(&mut self, table: Table, views: &[&str]) -> &mut Self {
        for view in views {
            self.register(table, *view);
        }
        self
    }

    pub fn views_for(&self, table: Table) -> impl Iterator<Item = &ViewKey> {
        self.views.get(&table).into_iter().flatten()
    }

    pub fn all_views(&self) -> BTreeSet<&ViewKey> {
        self.views.values().flatten().collect()
    }
}

impl FromIterator<(Table, ViewKey)> for ViewRegistry {
    fn from_iter<I: IntoIterator<Item = (Table, ViewKey)>>(iter: I) -> Self {
        let mut reg = Self::new();
        for (table, view) in iter {
            reg.register(table, view);
        }
        reg
    }
}
