//! Delivery operations.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::client::{QueryClient, QueryResult};
use crate::error::ApiError;
use crate::filter::{DeliveryFilter, FilterPairs};
use crate::http::Http;
use crate::invalidation::{self, Resource};
use crate::keys;
use crate::model::{Delivery, DeliveryStatus};
use crate::mutation::Mutation;

/// Payload for creating a delivery assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDelivery {
    pub order: i64,
    #[serde(default)]
    pub courier: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusUpdate {
    status: DeliveryStatus,
}

/// Lists deliveries matching `filter`.
pub async fn list_deliveries(
    http: &Http,
    filter: &DeliveryFilter,
) -> Result<Vec<Delivery>, ApiError> {
    http.get_list("/deliveries/", &filter.pairs()).await
}

/// Fetches one delivery.
pub async fn get_delivery(http: &Http, id: i64) -> Result<Delivery, ApiError> {
    http.get_json(&format!("/deliveries/{id}/")).await
}

/// Creates a delivery assignment for an order.
pub async fn create_delivery(http: &Http, payload: &NewDelivery) -> Result<Delivery, ApiError> {
    http.post_json("/deliveries/", payload).await
}

/// Moves a delivery to a new status.
pub async fn update_status(
    http: &Http,
    id: i64,
    status: DeliveryStatus,
) -> Result<Delivery, ApiError> {
    http.patch_json(&format!("/deliveries/{id}/"), &StatusUpdate { status })
        .await
}

/// Watches the filtered delivery list.
pub fn watch_deliveries(
    client: &Arc<QueryClient>,
    http: &Http,
    filter: DeliveryFilter,
) -> BoxStream<'static, QueryResult<Vec<Delivery>>> {
    let key = keys::deliveries::list(&filter);
    let http = http.clone();
    client.watch(key, client.default_options(), move || {
        let http = http.clone();
        let filter = filter.clone();
        async move { list_deliveries(&http, &filter).await }
    })
}

/// Status-update mutation: rewrites the delivery's status in cached lists
/// immediately.
pub fn update_status_mutation(
    client: &Arc<QueryClient>,
    http: &Http,
) -> Mutation<(i64, DeliveryStatus), Delivery> {
    let http = http.clone();
    Mutation::new(
        Arc::clone(client),
        move |(id, status): (i64, DeliveryStatus)| {
            let http = http.clone();
            async move { update_status(&http, id, status).await }
        },
    )
    .optimistic(|guard, (id, status)| {
        let (id, status) = (*id, *status);
        guard.edit_list(
            &keys::deliveries::lists(),
            |deliveries: &mut Vec<Delivery>| {
                if let Some(delivery) = deliveries.iter_mut().find(|d| d.id == id) {
                    delivery.status = status;
                }
            },
        );
    })
    .invalidates(invalidation::for_resource(Resource::Deliveries))
}
