//! Derived statistics: reactive recomputation from the cached collection.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use pharma_client::keys;
use pharma_client::model::InventoryRecord;
use pharma_client::prelude::*;
use pharma_client::stats::{self, InventoryStats};

fn test_client() -> Arc<QueryClient> {
    Arc::new(QueryClient::new(ClientConfig::new("http://localhost:8000")))
}

fn record(id: i64, current: i64, minimum: i64) -> InventoryRecord {
    InventoryRecord {
        id,
        product: id,
        product_name: format!("product-{id}"),
        branch: 1,
        current_stock: current,
        minimum_stock: minimum,
        unit_price: 2.0,
        updated_at: None,
    }
}

#[tokio::test]
async fn low_stock_count_tracks_the_cached_collection() {
    let client = test_client();
    let key = keys::scoped::low_stock();
    let generation = Arc::new(AtomicUsize::new(0));

    // First fetch: one low-stock item. After invalidation: two.
    let fetch_generation = Arc::clone(&generation);
    let results = client.watch::<Vec<InventoryRecord>, _, _>(
        key,
        QueryOptions::volatile(),
        move || {
            let n = fetch_generation.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(vec![record(1, 2, 5), record(2, 10, 5)])
                } else {
                    Ok(vec![record(1, 2, 5), record(2, 10, 5), record(3, 0, 3)])
                }
            }
        },
    );

    let mut stats_stream = stats::derive(results, |records: &Vec<InventoryRecord>| {
        InventoryStats::compute(records)
    });

    // Loading -> zero values.
    let loading = stats_stream.next().await.expect("loading snapshot");
    assert_eq!(loading, InventoryStats::default());

    let first = stats_stream.next().await.expect("first snapshot");
    assert_eq!(first.total_records, 2);
    assert_eq!(first.low_stock_count, 1);
    assert_eq!(first.low_stock_items.len(), first.low_stock_count);

    client.invalidate(&keys::inventory::all());

    let reloading = stats_stream.next().await.expect("reloading snapshot");
    assert_eq!(reloading, InventoryStats::default());

    let second = stats_stream.next().await.expect("second snapshot");
    assert_eq!(second.total_records, 3);
    assert_eq!(
        second.low_stock_count, 2,
        "count recomputes when the collection changes"
    );
    assert!(
        second
            .low_stock_items
            .iter()
            .all(|r| r.current_stock <= r.minimum_stock)
    );
}

#[tokio::test]
async fn stats_report_zero_for_disabled_queries() {
    let client = test_client();
    let options = QueryOptions::volatile().enabled(false);

    let results = client.watch::<Vec<InventoryRecord>, _, _>(
        keys::scoped::low_stock_for_branch(0),
        options,
        || async { Ok(vec![]) },
    );

    let snapshots: Vec<InventoryStats> = stats::derive(results, |records: &Vec<InventoryRecord>| {
        InventoryStats::compute(records)
    })
    .collect()
    .await;

    assert_eq!(snapshots, vec![InventoryStats::default()]);
}
