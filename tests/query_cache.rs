//! Cache behavior: staleness, deduplication, invalidation idempotence.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pharma_client::filter::{FilterPairs, InventoryFilter, UserFilter};
use pharma_client::keys;
use pharma_client::model::{InventoryRecord, Role};
use pharma_client::prelude::*;

fn test_client() -> Arc<QueryClient> {
    Arc::new(QueryClient::new(ClientConfig::new("http://localhost:8000")))
}

fn record(id: i64, branch: i64) -> InventoryRecord {
    InventoryRecord {
        id,
        product: id,
        product_name: format!("product-{id}"),
        branch,
        current_stock: 10,
        minimum_stock: 5,
        unit_price: 1.0,
        updated_at: None,
    }
}

#[test]
fn equal_filters_produce_equal_keys_regardless_of_construction_order() {
    let a = UserFilter {
        role: Some(Role::Customer),
        branch: Some(3),
        search: Some("smith".to_string()),
        ..UserFilter::default()
    };
    let b = UserFilter {
        search: Some("smith".to_string()),
        branch: Some(3),
        role: Some(Role::Customer),
        ..UserFilter::default()
    };
    assert_eq!(keys::users::list(&a), keys::users::list(&b));
}

#[test]
fn absent_and_empty_filters_collapse_to_one_key() {
    let default = InventoryFilter::default();
    let empty_search = InventoryFilter {
        search: Some(String::new()),
        ..InventoryFilter::default()
    };
    assert!(default.is_default());
    assert_eq!(
        keys::inventory::list(&default),
        keys::inventory::list(&empty_search)
    );
    assert_eq!(keys::inventory::list(&default), keys::inventory::lists());
}

#[tokio::test]
async fn second_fetch_within_staleness_window_hits_cache() {
    let client = test_client();
    let filter = InventoryFilter {
        branch: Some(3),
        ..InventoryFilter::default()
    };
    let key = keys::inventory::list(&filter);
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::volatile();

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        let data = client
            .fetch(&key, &options, move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![record(1, 3)])
                }
            })
            .await
            .expect("fetch should succeed");
        assert_eq!(data.len(), 1);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rapid_concurrent_fetches_share_one_request() {
    let client = test_client();
    let filter = InventoryFilter {
        branch: Some(3),
        ..InventoryFilter::default()
    };
    let key = keys::inventory::list(&filter);
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::volatile();

    let fetcher = || {
        let calls = Arc::clone(&calls);
        move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(vec![record(1, 3), record(2, 3)])
            }
        }
    };

    let (first, second) = tokio::join!(
        client.fetch(&key, &options, fetcher()),
        client.fetch(&key, &options, fetcher()),
    );

    let first = first.expect("first caller should succeed");
    let second = second.expect("second caller should succeed");

    assert_eq!(calls.load(Ordering::SeqCst), 1, "exactly one outbound request");
    assert_eq!(*first, *second, "both callers see the same resolved data");
}

#[tokio::test]
async fn invalidating_an_already_stale_key_adds_no_network_calls() {
    let client = test_client();
    let key = keys::orders::lists();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = QueryOptions::default();

    let fetcher = || {
        let calls = Arc::clone(&calls);
        move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0_i32)
            }
        }
    };

    let _ = client.fetch(&key, &options, fetcher()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // First invalidation marks the entry stale; the second finds it already
    // stale and marks nothing further.
    assert_eq!(client.invalidate(&keys::orders::all()), 1);
    assert_eq!(client.invalidate(&keys::orders::all()), 0);

    let _ = client.fetch(&key, &options, fetcher()).await;
    assert_eq!(
        calls.load(Ordering::SeqCst),
        2,
        "one revalidation regardless of how many invalidations piled up"
    );
}

#[tokio::test]
async fn invalidating_lists_prefix_reaches_every_filtered_list() {
    let client = test_client();
    let branch_3 = InventoryFilter {
        branch: Some(3),
        ..InventoryFilter::default()
    };
    let branch_4 = InventoryFilter {
        branch: Some(4),
        ..InventoryFilter::default()
    };
    let options = QueryOptions::volatile();

    for filter in [&branch_3, &branch_4] {
        let branch = filter.branch.unwrap_or_default();
        let _ = client
            .fetch(&keys::inventory::list(filter), &options, move || async move {
                Ok(vec![record(1, branch)])
            })
            .await;
    }

    let marked = client.invalidate(&keys::inventory::lists());
    assert_eq!(marked, 2);
}

#[tokio::test]
async fn sweeper_removes_expired_entries() {
    let config = ClientConfig::new("http://localhost:8000")
        .with_gc_interval(Duration::from_millis(10));
    let client = Arc::new(QueryClient::new(config));
    let options = QueryOptions::default().with_stale_time(Duration::from_secs(60));

    // gc_time of zero expires the entry immediately.
    let mut short_lived = options.clone();
    short_lived.gc_time = Duration::from_millis(0);

    let _ = client
        .fetch(&keys::branches::list(), &short_lived, || async { Ok(1_i32) })
        .await;
    assert_eq!(client.cache().len(), 1);

    let sweeper = client.spawn_sweeper();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.cache().is_empty(), "expired entry should be swept");

    sweeper.cancel();
}
