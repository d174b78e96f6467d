//! # pharma-client: client core for the pharmacy platform
//!
//! This crate is the layer between any pharmacy front end (storefront, admin
//! dashboard) and the remote REST API. It owns everything that is not
//! presentation: typed service calls, the query cache, optimistic writes,
//! and derived statistics.
//!
//! ## Architecture
//!
//! Data flows leaf to root:
//!
//! 1. **Keys** ([`key`], [`keys`]): deterministic hierarchical cache keys per
//!    resource and filter set.
//! 2. **Services** ([`api`]): one async function per remote operation,
//!    translating typed payloads into HTTP calls via [`http::Http`].
//! 3. **Queries** ([`client`]): the [`client::QueryClient`] binds services
//!    to the cache with staleness windows, request deduplication, retry with
//!    exponential backoff, and prefix-based invalidation.
//! 4. **Mutations** ([`mutation`]): writes with an explicit
//!    snapshot -> apply -> commit-or-rollback optimistic protocol.
//! 5. **Statistics** ([`stats`]): pure aggregates recomputed from cached
//!    collections.
//!
//! The cache is owned by an explicitly constructed `QueryClient`, never a
//! global, so applications inject it and tests run isolated instances.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pharma_client::api::inventory;
//! use pharma_client::filter::InventoryFilter;
//! use pharma_client::prelude::*;
//! use pharma_client::store::{MemoryStore, Session};
//!
//! # async fn run() -> Result<(), pharma_client::error::ApiError> {
//! let config = ClientConfig::from_env();
//! let session = Session::new(Arc::new(MemoryStore::new()));
//! let http = Http::new(config.clone(), session);
//! let client = Arc::new(QueryClient::new(config));
//!
//! let filter = InventoryFilter {
//!     branch: Some(3),
//!     ..InventoryFilter::default()
//! };
//! let records = client
//!     .fetch(
//!         &pharma_client::keys::inventory::list(&filter),
//!         &QueryOptions::volatile(),
//!         || {
//!             let http = http.clone();
//!             let filter = filter.clone();
//!             async move { inventory::list_records(&http, &filter).await }
//!         },
//!     )
//!     .await?;
//! println!("{} records cached", records.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod invalidation;
pub mod key;
pub mod keys;
pub mod model;
pub mod mutation;
pub mod prelude;
pub mod stats;
pub mod store;
