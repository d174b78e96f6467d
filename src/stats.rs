//! Derived statistics over cached collections.
//!
//! Everything here is a pure, synchronous recomputation from data the query
//! layer already holds; nothing performs network activity of its own. While
//! the underlying query is still loading (or errored), statistics report
//! their zero values rather than failing; that is by contract, not an error
//! path.
//!
//! [`derive`] turns a query watch stream into a statistics stream, so an
//! aggregate recomputes automatically whenever its input cache entry
//! changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use pharma_client::api::inventory;
//! use pharma_client::stats::{self, InventoryStats};
//!
//! let records = inventory::watch_records(&client, &http, Default::default());
//! let mut stats = stats::derive(records, |records| InventoryStats::compute(records));
//! while let Some(snapshot) = stats.next().await {
//!     println!("{} low-stock items", snapshot.low_stock_count);
//! }
//! ```

use std::collections::BTreeMap;

use futures::Stream;
use futures::StreamExt;

use crate::client::QueryResult;
use crate::model::{
    Branch, Delivery, DeliveryStatus, InventoryRecord, Order, OrderStatus, Role, User,
};

/// Maps a query watch stream into a statistics stream.
///
/// Emits `S::default()` while the query has no data, and `compute(&data)`
/// for every success (stale data included, since a stale collection is still
/// the best available view).
pub fn derive<T, S, F>(
    results: impl Stream<Item = QueryResult<T>>,
    compute: F,
) -> impl Stream<Item = S>
where
    S: Default,
    F: Fn(&T) -> S,
{
    results.map(move |result| match result.data() {
        Some(data) => compute(data),
        None => S::default(),
    })
}

/// Aggregates over the inventory record collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InventoryStats {
    /// Number of records in the collection.
    pub total_records: usize,
    /// Records where `current_stock <= minimum_stock`.
    pub low_stock_items: Vec<InventoryRecord>,
    /// `low_stock_items.len()`, kept separately for display convenience.
    pub low_stock_count: usize,
    /// Sum over records of `current_stock * unit_price`.
    pub total_stock_value: f64,
}

impl InventoryStats {
    /// Computes the aggregate view of `records`.
    #[must_use]
    pub fn compute(records: &[InventoryRecord]) -> Self {
        let low_stock_items: Vec<InventoryRecord> = records
            .iter()
            .filter(|record| record.is_low_stock())
            .cloned()
            .collect();
        let total_stock_value = records
            .iter()
            .map(|record| record.current_stock as f64 * record.unit_price)
            .sum();
        Self {
            total_records: records.len(),
            low_stock_count: low_stock_items.len(),
            low_stock_items,
            total_stock_value,
        }
    }
}

/// Aggregates over the order collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderStats {
    /// Number of orders in the collection.
    pub total: usize,
    /// Order count per status.
    pub by_status: BTreeMap<OrderStatus, usize>,
    /// Sum of totals over non-cancelled orders.
    pub revenue: f64,
}

impl OrderStats {
    /// Computes the aggregate view of `orders`.
    #[must_use]
    pub fn compute(orders: &[Order]) -> Self {
        let mut by_status = BTreeMap::new();
        let mut revenue = 0.0;
        for order in orders {
            *by_status.entry(order.status).or_insert(0) += 1;
            if order.status != OrderStatus::Cancelled {
                revenue += order.total;
            }
        }
        Self {
            total: orders.len(),
            by_status,
            revenue,
        }
    }

    /// Order count for one status.
    #[must_use]
    pub fn count(&self, status: OrderStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Aggregates over the user collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserStats {
    /// Number of users in the collection.
    pub total: usize,
    /// User count per role.
    pub by_role: BTreeMap<Role, usize>,
}

impl UserStats {
    /// Computes the aggregate view of `users`.
    #[must_use]
    pub fn compute(users: &[User]) -> Self {
        let mut by_role = BTreeMap::new();
        for user in users {
            *by_role.entry(user.role).or_insert(0) += 1;
        }
        Self {
            total: users.len(),
            by_role,
        }
    }

    /// User count for one role.
    #[must_use]
    pub fn count(&self, role: Role) -> usize {
        self.by_role.get(&role).copied().unwrap_or(0)
    }
}

/// Aggregates over the branch collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BranchStats {
    /// Number of branches.
    pub total: usize,
    /// Branches flagged active.
    pub active: usize,
}

impl BranchStats {
    /// Computes the aggregate view of `branches`.
    #[must_use]
    pub fn compute(branches: &[Branch]) -> Self {
        Self {
            total: branches.len(),
            active: branches.iter().filter(|branch| branch.is_active).count(),
        }
    }
}

/// Aggregates over the delivery collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryStats {
    /// Number of deliveries.
    pub total: usize,
    /// Delivery count per status.
    pub by_status: BTreeMap<DeliveryStatus, usize>,
}

impl DeliveryStats {
    /// Computes the aggregate view of `deliveries`.
    #[must_use]
    pub fn compute(deliveries: &[Delivery]) -> Self {
        let mut by_status = BTreeMap::new();
        for delivery in deliveries {
            *by_status.entry(delivery.status).or_insert(0) += 1;
        }
        Self {
            total: deliveries.len(),
            by_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, current: i64, minimum: i64, price: f64) -> InventoryRecord {
        InventoryRecord {
            id,
            product: id,
            product_name: format!("product-{id}"),
            branch: 1,
            current_stock: current,
            minimum_stock: minimum,
            unit_price: price,
            updated_at: None,
        }
    }

    #[test]
    fn test_inventory_stats_low_stock_count_matches_items() {
        let records = vec![
            record(1, 2, 5, 1.0),
            record(2, 10, 5, 2.0),
            record(3, 5, 5, 3.0),
        ];
        let stats = InventoryStats::compute(&records);

        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.low_stock_count, 2);
        assert_eq!(stats.low_stock_items.len(), stats.low_stock_count);
        assert!(stats.low_stock_items.iter().all(InventoryRecord::is_low_stock));
        assert!((stats.total_stock_value - (2.0 + 20.0 + 15.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inventory_stats_empty_input_is_zero() {
        let stats = InventoryStats::compute(&[]);
        assert_eq!(stats, InventoryStats::default());
    }

    #[test]
    fn test_order_stats_revenue_excludes_cancelled() {
        let order = |id, status, total| Order {
            id,
            customer: 1,
            branch: None,
            status,
            items: vec![],
            total,
            created_at: None,
        };
        let orders = vec![
            order(1, OrderStatus::Completed, 10.0),
            order(2, OrderStatus::Cancelled, 99.0),
            order(3, OrderStatus::Pending, 5.0),
        ];
        let stats = OrderStats::compute(&orders);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.count(OrderStatus::Completed), 1);
        assert_eq!(stats.count(OrderStatus::Cancelled), 1);
        assert_eq!(stats.count(OrderStatus::Processing), 0);
        assert!((stats.revenue - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_user_stats_by_role() {
        let user = |id, role| User {
            id,
            first_name: String::new(),
            last_name: String::new(),
            email: format!("u{id}@example.com"),
            phone: None,
            role,
            branch: None,
            is_active: true,
            date_joined: None,
        };
        let users = vec![
            user(1, Role::Customer),
            user(2, Role::Customer),
            user(3, Role::Pharmacist),
        ];
        let stats = UserStats::compute(&users);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.count(Role::Customer), 2);
        assert_eq!(stats.count(Role::Admin), 0);
    }

    #[test]
    fn test_branch_stats() {
        let branch = |id, is_active| Branch {
            id,
            name: format!("branch-{id}"),
            address: None,
            phone: None,
            is_active,
        };
        let stats = BranchStats::compute(&[branch(1, true), branch(2, false), branch(3, true)]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 2);
    }

    #[tokio::test]
    async fn test_derive_reports_zero_while_loading() {
        use crate::client::QueryState;
        use futures::stream;

        let results = stream::iter(vec![
            QueryResult::<Vec<InventoryRecord>> {
                state: QueryState::Loading,
            },
            QueryResult {
                state: QueryState::Success {
                    data: std::sync::Arc::new(vec![record(1, 0, 5, 1.0)]),
                    is_stale: false,
                },
            },
        ]);

        let stats: Vec<InventoryStats> =
            derive(results, |records| InventoryStats::compute(records))
                .collect()
                .await;

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0], InventoryStats::default());
        assert_eq!(stats[1].low_stock_count, 1);
    }

    #[tokio::test]
    async fn test_derive_recomputes_on_each_emission() {
        use crate::client::QueryState;
        use futures::stream;

        let results = stream::iter(vec![
            QueryResult {
                state: QueryState::Success {
                    data: std::sync::Arc::new(vec![record(1, 10, 5, 1.0)]),
                    is_stale: false,
                },
            },
            QueryResult {
                state: QueryState::Success {
                    data: std::sync::Arc::new(vec![record(1, 3, 5, 1.0)]),
                    is_stale: false,
                },
            },
        ]);

        let counts: Vec<usize> = derive(results, |records: &Vec<InventoryRecord>| {
            InventoryStats::compute(records)
        })
        .map(|stats| stats.low_stock_count)
        .collect()
        .await;

        assert_eq!(counts, vec![0, 1]);
    }
}
