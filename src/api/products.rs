//! Product operations: medicines, supplements, and medical devices.
//!
//! Creates and updates first try the kind-specific endpoint, then the
//! generic `/products/` one. The fallback order is plain data
//! ([`create_candidates`]) tried in sequence, not a catch-and-recover
//! control flow, so it can be inspected and tested on its own.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{QueryClient, QueryResult};
use crate::error::ApiError;
use crate::filter::{FilterPairs, ProductFilter};
use crate::http::Http;
use crate::invalidation::{self, Resource};
use crate::keys;
use crate::model::{Product, ProductKind};
use crate::mutation::{Mutation, temp_id};

use super::BulkOutcome;

/// Payload for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub kind: ProductKind,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub requires_prescription: bool,
}

impl NewProduct {
    /// Client-side shape check, run before any network call.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("product name is required".to_string()));
        }
        if self.price < 0.0 {
            return Err(ApiError::Validation(
                "price must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// The provisional entity spliced into cached lists while the create is
    /// in flight.
    #[must_use]
    pub fn placeholder(&self, id: i64) -> Product {
        Product {
            id,
            name: self.name.clone(),
            kind: self.kind,
            price: self.price,
            description: self.description.clone(),
            manufacturer: self.manufacturer.clone(),
            requires_prescription: self.requires_prescription,
            expiry_date: None,
        }
    }
}

/// Partial update payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_prescription: Option<bool>,
}

const fn kind_path(kind: ProductKind) -> &'static str {
    match kind {
        ProductKind::Medicine => "/medicines/",
        ProductKind::Supplement => "/supplements/",
        ProductKind::MedicalDevice => "/medical-devices/",
    }
}

/// Ordered candidate endpoints for creating a product of `kind`:
/// the kind-specific path first, the generic one second.
#[must_use]
pub const fn create_candidates(kind: ProductKind) -> [&'static str; 2] {
    [kind_path(kind), "/products/"]
}

/// Lists products matching `filter`.
pub async fn list_products(http: &Http, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
    http.get_list("/products/", &filter.pairs()).await
}

/// Fetches one product.
pub async fn get_product(http: &Http, id: i64) -> Result<Product, ApiError> {
    http.get_json(&format!("/products/{id}/")).await
}

/// Creates a product, trying each candidate endpoint in order.
///
/// A candidate that is simply not there (404/405) falls through to the next
/// one; any other failure propagates immediately.
pub async fn create_product(http: &Http, payload: &NewProduct) -> Result<Product, ApiError> {
    let mut last_error = None;
    for path in create_candidates(payload.kind) {
        match http.post_json(path, payload).await {
            Ok(product) => return Ok(product),
            Err(e) if matches!(e.status(), Some(404 | 405)) => {
                debug!(path, "candidate endpoint unavailable, trying next");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_error
        .unwrap_or_else(|| ApiError::Network("no candidate endpoint accepted".to_string())))
}

/// Applies a partial update to a product.
pub async fn update_product(
    http: &Http,
    id: i64,
    payload: &ProductUpdate,
) -> Result<Product, ApiError> {
    http.patch_json(&format!("/products/{id}/"), payload).await
}

/// Deletes a product.
pub async fn delete_product(http: &Http, id: i64) -> Result<(), ApiError> {
    http.delete(&format!("/products/{id}/")).await
}

/// Creates several products, collecting per-item outcomes.
pub async fn create_products(
    http: &Http,
    payloads: Vec<NewProduct>,
) -> BulkOutcome<NewProduct, Product> {
    let mut outcome = BulkOutcome::new();
    for payload in payloads {
        match create_product(http, &payload).await {
            Ok(product) => outcome.created.push(product),
            Err(e) => {
                warn!(name = %payload.name, error = %e, "bulk product create: item failed");
                outcome.failed.push((payload, e));
            }
        }
    }
    outcome
}

/// Watches the filtered product list.
pub fn watch_products(
    client: &Arc<QueryClient>,
    http: &Http,
    filter: ProductFilter,
) -> BoxStream<'static, QueryResult<Vec<Product>>> {
    let key = keys::products::list(&filter);
    let http = http.clone();
    client.watch(key, client.default_options(), move || {
        let http = http.clone();
        let filter = filter.clone();
        async move { list_products(&http, &filter).await }
    })
}

/// Watches one product. Disabled until `id` is a real (positive) id.
pub fn watch_product(
    client: &Arc<QueryClient>,
    http: &Http,
    id: i64,
) -> BoxStream<'static, QueryResult<Product>> {
    let options = client.default_options().enabled(id > 0);
    let http = http.clone();
    client.watch(keys::products::detail(id), options, move || {
        let http = http.clone();
        async move { get_product(&http, id).await }
    })
}

/// Create-product mutation with placeholder splice and invalidation.
pub fn create_product_mutation(
    client: &Arc<QueryClient>,
    http: &Http,
) -> Mutation<NewProduct, Product> {
    let http = http.clone();
    Mutation::new(Arc::clone(client), move |payload: NewProduct| {
        let http = http.clone();
        async move { create_product(&http, &payload).await }
    })
    .validate(NewProduct::validate)
    .optimistic(|guard, payload| {
        let placeholder = payload.placeholder(temp_id());
        guard.edit_list(&keys::products::lists(), |products: &mut Vec<Product>| {
            products.push(placeholder);
        });
    })
    .invalidates(invalidation::for_resource(Resource::Products))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_put_specialized_endpoint_first() {
        assert_eq!(
            create_candidates(ProductKind::Medicine),
            ["/medicines/", "/products/"]
        );
        assert_eq!(
            create_candidates(ProductKind::Supplement),
            ["/supplements/", "/products/"]
        );
        assert_eq!(
            create_candidates(ProductKind::MedicalDevice),
            ["/medical-devices/", "/products/"]
        );
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let payload = NewProduct {
            name: "Ibuprofen 200mg".to_string(),
            kind: ProductKind::Medicine,
            price: -1.0,
            description: None,
            manufacturer: None,
            requires_prescription: false,
        };
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_placeholder_keeps_kind() {
        let payload = NewProduct {
            name: "Thermometer".to_string(),
            kind: ProductKind::MedicalDevice,
            price: 12.0,
            description: None,
            manufacturer: None,
            requires_prescription: false,
        };
        let product = payload.placeholder(-7);
        assert_eq!(product.id, -7);
        assert_eq!(product.kind, ProductKind::MedicalDevice);
    }
}
