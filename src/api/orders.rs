//! Order operations.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::client::{QueryClient, QueryResult};
use crate::error::ApiError;
use crate::filter::{FilterPairs, OrderFilter};
use crate::http::Http;
use crate::invalidation::{self, Resource};
use crate::keys;
use crate::model::{Order, OrderItem, OrderStatus};
use crate::mutation::{Mutation, temp_id};

/// One line of a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product: i64,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Payload for placing an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer: i64,
    #[serde(default)]
    pub branch: Option<i64>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Client-side shape check, run before any network call.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.customer <= 0 {
            return Err(ApiError::Validation("customer id is required".to_string()));
        }
        if self.items.is_empty() {
            return Err(ApiError::Validation(
                "an order needs at least one item".to_string(),
            ));
        }
        if self.items.iter().any(|item| item.quantity == 0) {
            return Err(ApiError::Validation(
                "item quantities must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The provisional entity spliced into cached lists while the create is
    /// in flight.
    #[must_use]
    pub fn placeholder(&self, id: i64) -> Order {
        let items: Vec<OrderItem> = self
            .items
            .iter()
            .map(|item| OrderItem {
                product: item.product,
                product_name: String::new(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();
        let total = items
            .iter()
            .map(|item| f64::from(item.quantity) * item.unit_price)
            .sum();
        Order {
            id,
            customer: self.customer,
            branch: self.branch,
            status: OrderStatus::Pending,
            items,
            total,
            created_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusUpdate {
    status: OrderStatus,
}

/// Lists orders matching `filter`.
pub async fn list_orders(http: &Http, filter: &OrderFilter) -> Result<Vec<Order>, ApiError> {
    http.get_list("/orders/", &filter.pairs()).await
}

/// Fetches one order.
pub async fn get_order(http: &Http, id: i64) -> Result<Order, ApiError> {
    http.get_json(&format!("/orders/{id}/")).await
}

/// Places an order.
pub async fn create_order(http: &Http, payload: &NewOrder) -> Result<Order, ApiError> {
    http.post_json("/orders/", payload).await
}

/// Moves an order to a new status.
pub async fn update_status(http: &Http, id: i64, status: OrderStatus) -> Result<Order, ApiError> {
    http.patch_json(&format!("/orders/{id}/"), &StatusUpdate { status })
        .await
}

/// Deletes an order.
pub async fn delete_order(http: &Http, id: i64) -> Result<(), ApiError> {
    http.delete(&format!("/orders/{id}/")).await
}

/// Watches the filtered order list.
pub fn watch_orders(
    client: &Arc<QueryClient>,
    http: &Http,
    filter: OrderFilter,
) -> BoxStream<'static, QueryResult<Vec<Order>>> {
    let key = keys::orders::list(&filter);
    let http = http.clone();
    client.watch(key, client.default_options(), move || {
        let http = http.clone();
        let filter = filter.clone();
        async move { list_orders(&http, &filter).await }
    })
}

/// Watches one order. Disabled until `id` is a real (positive) id.
pub fn watch_order(
    client: &Arc<QueryClient>,
    http: &Http,
    id: i64,
) -> BoxStream<'static, QueryResult<Order>> {
    let options = client.default_options().enabled(id > 0);
    let http = http.clone();
    client.watch(keys::orders::detail(id), options, move || {
        let http = http.clone();
        async move { get_order(&http, id).await }
    })
}

/// Place-order mutation: validates, splices a pending placeholder into
/// cached lists, and invalidates orders plus the resources an order touches
/// (inventory, loyalty, reports).
pub fn create_order_mutation(client: &Arc<QueryClient>, http: &Http) -> Mutation<NewOrder, Order> {
    let http = http.clone();
    Mutation::new(Arc::clone(client), move |payload: NewOrder| {
        let http = http.clone();
        async move { create_order(&http, &payload).await }
    })
    .validate(NewOrder::validate)
    .optimistic(|guard, payload| {
        let placeholder = payload.placeholder(temp_id());
        guard.edit_list(&keys::orders::lists(), |orders: &mut Vec<Order>| {
            orders.push(placeholder);
        });
    })
    .invalidates(invalidation::for_resource(Resource::Orders))
}

/// Status-update mutation: rewrites the order's status in cached lists and
/// detail immediately.
pub fn update_status_mutation(
    client: &Arc<QueryClient>,
    http: &Http,
) -> Mutation<(i64, OrderStatus), Order> {
    let http = http.clone();
    Mutation::new(
        Arc::clone(client),
        move |(id, status): (i64, OrderStatus)| {
            let http = http.clone();
            async move { update_status(&http, id, status).await }
        },
    )
    .optimistic(|guard, (id, status)| {
        let (id, status) = (*id, *status);
        guard.edit_list(&keys::orders::lists(), |orders: &mut Vec<Order>| {
            if let Some(order) = orders.iter_mut().find(|order| order.id == id) {
                order.status = status;
            }
        });
    })
    .invalidates(invalidation::for_resource(Resource::Orders))
}
