//! Inventory operations: stock records, low-stock views, and transactions.
//!
//! Inventory is the fastest-moving data in the system, so its watches use
//! [`QueryOptions::volatile`]: a one-minute staleness window and the
//! aggressive retry policy.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::client::{QueryClient, QueryResult};
use crate::config::QueryOptions;
use crate::error::ApiError;
use crate::filter::{FilterPairs, InventoryFilter};
use crate::http::Http;
use crate::invalidation::{self, Resource};
use crate::keys;
use crate::model::{InventoryRecord, InventoryTransaction, TransactionKind};
use crate::mutation::Mutation;

/// Payload for creating an inventory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryRecord {
    pub product: i64,
    pub branch: i64,
    pub current_stock: i64,
    pub minimum_stock: i64,
    #[serde(default)]
    pub unit_price: f64,
}

impl NewInventoryRecord {
    /// Client-side shape check, run before any network call.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.product <= 0 || self.branch <= 0 {
            return Err(ApiError::Validation(
                "product and branch ids are required".to_string(),
            ));
        }
        if self.current_stock < 0 || self.minimum_stock < 0 {
            return Err(ApiError::Validation(
                "stock levels must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update payload for an inventory record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InventoryRecordUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
}

/// Payload for recording a stock movement.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub record: i64,
    pub kind: TransactionKind,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Lists inventory records matching `filter`.
pub async fn list_records(
    http: &Http,
    filter: &InventoryFilter,
) -> Result<Vec<InventoryRecord>, ApiError> {
    http.get_list("/inventory-records/", &filter.pairs()).await
}

/// Fetches one inventory record.
pub async fn get_record(http: &Http, id: i64) -> Result<InventoryRecord, ApiError> {
    http.get_json(&format!("/inventory-records/{id}/")).await
}

/// Lists records currently at or below minimum stock, via the scoped
/// endpoint.
pub async fn list_low_stock(http: &Http) -> Result<Vec<InventoryRecord>, ApiError> {
    http.get_list("/inventory-records/low-stock/", &[]).await
}

/// Creates an inventory record.
pub async fn create_record(
    http: &Http,
    payload: &NewInventoryRecord,
) -> Result<InventoryRecord, ApiError> {
    http.post_json("/inventory-records/", payload).await
}

/// Applies a partial update to an inventory record.
pub async fn update_record(
    http: &Http,
    id: i64,
    payload: &InventoryRecordUpdate,
) -> Result<InventoryRecord, ApiError> {
    http.patch_json(&format!("/inventory-records/{id}/"), payload)
        .await
}

/// Deletes an inventory record.
pub async fn delete_record(http: &Http, id: i64) -> Result<(), ApiError> {
    http.delete(&format!("/inventory-records/{id}/")).await
}

/// Lists stock movements for one record.
pub async fn list_transactions(
    http: &Http,
    record: i64,
) -> Result<Vec<InventoryTransaction>, ApiError> {
    http.get_list(
        &format!("/inventory-records/{record}/transactions/"),
        &[],
    )
    .await
}

/// Records a stock movement.
pub async fn record_transaction(
    http: &Http,
    payload: &NewTransaction,
) -> Result<InventoryTransaction, ApiError> {
    http.post_json("/inventory-transactions/", payload).await
}

/// Watches the filtered record list with the volatile policy.
pub fn watch_records(
    client: &Arc<QueryClient>,
    http: &Http,
    filter: InventoryFilter,
) -> BoxStream<'static, QueryResult<Vec<InventoryRecord>>> {
    let key = keys::inventory::list(&filter);
    let http = http.clone();
    client.watch(key, QueryOptions::volatile(), move || {
        let http = http.clone();
        let filter = filter.clone();
        async move { list_records(&http, &filter).await }
    })
}

/// Watches the low-stock list with the volatile policy.
pub fn watch_low_stock(
    client: &Arc<QueryClient>,
    http: &Http,
) -> BoxStream<'static, QueryResult<Vec<InventoryRecord>>> {
    let http = http.clone();
    client.watch(keys::scoped::low_stock(), QueryOptions::volatile(), move || {
        let http = http.clone();
        async move { list_low_stock(&http).await }
    })
}

/// Watches one record. Disabled until `id` is a real (positive) id.
pub fn watch_record(
    client: &Arc<QueryClient>,
    http: &Http,
    id: i64,
) -> BoxStream<'static, QueryResult<InventoryRecord>> {
    let options = QueryOptions::volatile().enabled(id > 0);
    let http = http.clone();
    client.watch(keys::inventory::detail(id), options, move || {
        let http = http.clone();
        async move { get_record(&http, id).await }
    })
}

/// Record-transaction mutation: adjusts the cached record's stock level
/// immediately, then reconciles with server truth via invalidation.
pub fn record_transaction_mutation(
    client: &Arc<QueryClient>,
    http: &Http,
) -> Mutation<NewTransaction, InventoryTransaction> {
    let http = http.clone();
    Mutation::new(Arc::clone(client), move |payload: NewTransaction| {
        let http = http.clone();
        async move { record_transaction(&http, &payload).await }
    })
    .validate(|payload| {
        if payload.quantity == 0 {
            Err(ApiError::Validation(
                "transaction quantity must not be zero".to_string(),
            ))
        } else {
            Ok(())
        }
    })
    .optimistic(|guard, payload| {
        let record = payload.record;
        let delta = match payload.kind {
            TransactionKind::Restock => payload.quantity,
            TransactionKind::Sale | TransactionKind::Transfer => -payload.quantity,
            TransactionKind::Adjustment => payload.quantity,
        };
        guard.edit_list(
            &keys::inventory::lists(),
            |records: &mut Vec<InventoryRecord>| {
                if let Some(r) = records.iter_mut().find(|r| r.id == record) {
                    r.current_stock += delta;
                }
            },
        );
    })
    .invalidates(invalidation::for_resource(Resource::Inventory))
}

/// Create-record mutation with validation and invalidation.
pub fn create_record_mutation(
    client: &Arc<QueryClient>,
    http: &Http,
) -> Mutation<NewInventoryRecord, InventoryRecord> {
    let http = http.clone();
    Mutation::new(Arc::clone(client), move |payload: NewInventoryRecord| {
        let http = http.clone();
        async move { create_record(&http, &payload).await }
    })
    .validate(NewInventoryRecord::validate)
    .invalidates(invalidation::for_resource(Resource::Inventory))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_validation() {
        let payload = NewInventoryRecord {
            product: 1,
            branch: 3,
            current_stock: 10,
            minimum_stock: 5,
            unit_price: 2.0,
        };
        assert!(payload.validate().is_ok());

        let bad_branch = NewInventoryRecord {
            branch: 0,
            ..payload.clone()
        };
        assert!(bad_branch.validate().is_err());

        let negative_stock = NewInventoryRecord {
            current_stock: -1,
            ..payload
        };
        assert!(negative_stock.validate().is_err());
    }

    #[test]
    fn test_record_update_serializes_only_present_fields() {
        let update = InventoryRecordUpdate {
            current_stock: Some(25),
            ..InventoryRecordUpdate::default()
        };
        let json = serde_json::to_value(&update).expect("should serialize");
        assert_eq!(json, serde_json::json!({"current_stock": 25}));
    }
}
