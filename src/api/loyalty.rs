//! Loyalty point operations.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::Serialize;

use crate::client::{QueryClient, QueryResult};
use crate::error::ApiError;
use crate::http::Http;
use crate::keys;
use crate::model::LoyaltyPoints;

/// Payload for adjusting a customer's balance.
#[derive(Debug, Clone, Serialize)]
pub struct PointsAdjustment {
    pub customer: i64,
    pub delta: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Fetches the balance for one customer.
pub async fn get_points(http: &Http, customer: i64) -> Result<LoyaltyPoints, ApiError> {
    http.get_json(&format!("/loyalty-points/{customer}/")).await
}

/// Adjusts a customer's balance.
pub async fn adjust_points(
    http: &Http,
    payload: &PointsAdjustment,
) -> Result<LoyaltyPoints, ApiError> {
    http.post_json("/loyalty-points/adjust/", payload).await
}

/// Watches one customer's balance. Disabled until `customer` is a real
/// (positive) id.
pub fn watch_points(
    client: &Arc<QueryClient>,
    http: &Http,
    customer: i64,
) -> BoxStream<'static, QueryResult<LoyaltyPoints>> {
    let options = client.default_options().enabled(customer > 0);
    let http = http.clone();
    client.watch(keys::loyalty::for_customer(customer), options, move || {
        let http = http.clone();
        async move { get_points(&http, customer).await }
    })
}
