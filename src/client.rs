//! Query execution with caching, deduplication, and invalidation.
//!
//! This module provides the [`QueryClient`], the central state manager for
//! reads. It owns the [`QueryCache`], the invalidation broadcast channel, and
//! the in-flight request registry. It is always constructed explicitly and
//! passed by reference (`Arc<QueryClient>`); there is no global instance, so
//! test suites can run isolated caches side by side.
//!
//! # Reads
//!
//! [`QueryClient::fetch`] is the imperative read: cache hit if fresh,
//! otherwise one network call shared by every concurrent caller of the same
//! key. [`QueryClient::watch`] is the reactive read: a stream that emits the
//! cached value immediately, refetches when stale or missing, and then
//! refetches again every time the key is invalidated.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pharma_client::prelude::*;
//!
//! let client = Arc::new(QueryClient::new(ClientConfig::from_env()));
//!
//! let records = client
//!     .fetch(&keys::inventory::lists(), &QueryOptions::volatile(), || {
//!         let http = http.clone();
//!         async move { api::inventory::list_records(&http, &Default::default()).await }
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{EntryState, ErasedData, QueryCache};
use crate::config::{ClientConfig, QueryOptions, RetryPolicy};
use crate::error::ApiError;
use crate::key::QueryKey;

/// The state of a query result.
#[derive(Debug)]
pub enum QueryState<T> {
    /// A fetch is in progress and no cached data is available.
    Loading,
    /// The query is disabled; no fetch was attempted.
    Disabled,
    /// The query has data.
    Success {
        /// The cached or freshly fetched data.
        data: Arc<T>,
        /// Whether the data is past its staleness window and being refetched.
        is_stale: bool,
    },
    /// The query failed after exhausting its retry policy.
    Error(ApiError),
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Loading => Self::Loading,
            Self::Disabled => Self::Disabled,
            Self::Success { data, is_stale } => Self::Success {
                data: Arc::clone(data),
                is_stale: *is_stale,
            },
            Self::Error(e) => Self::Error(e.clone()),
        }
    }
}

/// A query result as emitted by [`QueryClient::watch`].
#[derive(Debug)]
pub struct QueryResult<T> {
    /// The current state of the query.
    pub state: QueryState<T>,
}

impl<T> Clone for QueryResult<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> QueryResult<T> {
    /// Returns the data if the query succeeded, otherwise `None`.
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        match &self.state {
            QueryState::Success { data, .. } => Some(data.as_ref()),
            _ => None,
        }
    }

    /// Returns `true` if the query is currently loading.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading)
    }

    /// Returns `true` if the query is disabled.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self.state, QueryState::Disabled)
    }

    /// Returns `true` if the query has data.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.state, QueryState::Success { .. })
    }

    /// Returns `true` if the query failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.state, QueryState::Error(_))
    }

    /// Returns `true` if the query data is stale.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self.state, QueryState::Success { is_stale: true, .. })
    }

    const fn loading() -> Self {
        Self {
            state: QueryState::Loading,
        }
    }

    const fn disabled() -> Self {
        Self {
            state: QueryState::Disabled,
        }
    }

    const fn success(data: Arc<T>, is_stale: bool) -> Self {
        Self {
            state: QueryState::Success { data, is_stale },
        }
    }

    const fn error(error: ApiError) -> Self {
        Self {
            state: QueryState::Error(error),
        }
    }
}

type FlightResult = Result<ErasedData, ApiError>;

/// Central manager for query cache, deduplication, and invalidation.
pub struct QueryClient {
    cache: QueryCache,
    config: ClientConfig,
    invalidation_tx: broadcast::Sender<QueryKey>,
    in_flight: DashMap<QueryKey, broadcast::Sender<FlightResult>>,
}

impl QueryClient {
    /// Creates a client with the given configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let (invalidation_tx, _) = broadcast::channel(100);
        Self {
            cache: QueryCache::new(),
            config,
            invalidation_tx,
            in_flight: DashMap::new(),
        }
    }

    /// The cache owned by this client.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The options used when a query does not specify its own.
    #[must_use]
    pub fn default_options(&self) -> QueryOptions {
        self.config.default_options.clone()
    }

    /// Subscribes to invalidation notifications.
    fn subscribe_invalidation(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidation_tx.subscribe()
    }

    /// Marks every cached entry under `prefix` stale and notifies watchers.
    ///
    /// Entries that are already stale or errored are not re-marked, so
    /// repeated invalidation cannot queue up duplicate revalidations; the
    /// broadcast still goes out so watchers refetch.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let marked = self.cache.invalidate_prefix(prefix);
        debug!(prefix = %prefix, marked, "invalidated query prefix");
        let _ = self.invalidation_tx.send(prefix.clone());
        marked
    }

    /// Invalidates every prefix in `prefixes`.
    pub fn invalidate_many(&self, prefixes: &[QueryKey]) {
        for prefix in prefixes {
            self.invalidate(prefix);
        }
    }

    /// Invalidation notifications as a stream, for consumers that observe
    /// cache activity directly (diagnostics, "data updated" badges).
    pub fn invalidations(&self) -> BoxStream<'static, QueryKey> {
        let rx = self.invalidation_tx.subscribe();
        tokio_stream::wrappers::BroadcastStream::new(rx)
            .filter_map(|result| async move { result.ok() })
            .boxed()
    }

    /// Fetches the data for `key`, deduplicating concurrent calls.
    ///
    /// Returns the cached value when it is fresh. Otherwise exactly one
    /// network call runs per key at a time: the first caller executes the
    /// fetcher (with the options' retry policy) and every concurrent caller
    /// receives the same resolved result.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<Arc<T>, ApiError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(entry) = self.cache.entry(key) {
            if entry.state() == EntryState::Fresh && !entry.is_past(options.stale_time) {
                if let Some(data) = entry.data::<T>() {
                    return Ok(data);
                }
            }
        }

        loop {
            let waiter = match self.in_flight.entry(key.clone()) {
                Entry::Occupied(occupied) => Some(occupied.get().subscribe()),
                Entry::Vacant(vacant) => {
                    let (tx, _) = broadcast::channel(1);
                    vacant.insert(tx);
                    None
                }
            };

            if let Some(mut rx) = waiter {
                match rx.recv().await {
                    Ok(Ok(data)) => {
                        return data.downcast::<T>().map_err(|_| {
                            ApiError::Deserialize(
                                "in-flight result has an unexpected type".to_string(),
                            )
                        });
                    }
                    Ok(Err(e)) => return Err(e),
                    // The owning fetch was dropped before resolving; claim
                    // the flight ourselves.
                    Err(_) => continue,
                }
            }

            self.cache.begin_fetch(key, options.gc_time);
            let outcome: FlightResult = match run_with_retry(&options.retry, &fetcher).await {
                Ok(value) => {
                    let shared: Arc<T> = Arc::new(value);
                    let erased: ErasedData = shared;
                    self.cache
                        .set_shared(key.clone(), Arc::clone(&erased), options.gc_time);
                    Ok(erased)
                }
                Err(e) => {
                    self.cache.set_error(key);
                    Err(e)
                }
            };

            // Unregister before broadcasting so a caller arriving now starts
            // a new fetch instead of attaching to a finished flight.
            let tx = self.in_flight.remove(key).map(|(_, tx)| tx);
            if let Some(tx) = tx {
                let _ = tx.send(outcome.clone());
            }

            return match outcome {
                Ok(data) => data.downcast::<T>().map_err(|_| {
                    ApiError::Deserialize("cached value has an unexpected type".to_string())
                }),
                Err(e) => Err(e),
            };
        }
    }

    /// Watches the query for `key` as a stream of [`QueryResult`]s.
    ///
    /// The stream:
    ///
    /// 1. Emits cached data immediately if present, marking staleness.
    /// 2. Fetches when the data is missing or stale (emitting `Loading`
    ///    first when there is nothing to show).
    /// 3. Waits for an invalidation covering this key, then refetches.
    ///
    /// A disabled query emits one `Disabled` result and ends. Dropping the
    /// stream abandons interest in the result without cancelling a shared
    /// in-flight request; the cache is still updated for other consumers.
    pub fn watch<T, F, Fut>(
        self: &Arc<Self>,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> BoxStream<'static, QueryResult<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send,
    {
        let client = Arc::clone(self);
        let fetcher = Arc::new(fetcher);

        stream::unfold(WatchState::Initial, move |state| {
            let client = Arc::clone(&client);
            let key = key.clone();
            let fetcher = Arc::clone(&fetcher);
            let options = options.clone();

            async move {
                match state {
                    WatchState::Initial => {
                        if !options.enabled {
                            return Some((QueryResult::disabled(), WatchState::Done));
                        }

                        let cached = client.cache.entry(&key).and_then(|entry| {
                            entry.data::<T>().map(|data| {
                                let is_stale = entry.state() != EntryState::Fresh
                                    || entry.is_past(options.stale_time);
                                (data, is_stale)
                            })
                        });

                        match cached {
                            Some((data, false)) => {
                                let rx = client.subscribe_invalidation();
                                Some((
                                    QueryResult::success(data, false),
                                    WatchState::Watching { rx },
                                ))
                            }
                            Some((data, true)) => {
                                // Stale data: emit it, then revalidate.
                                Some((QueryResult::success(data, true), WatchState::Fetching))
                            }
                            None => Some((QueryResult::loading(), WatchState::Fetching)),
                        }
                    }

                    WatchState::Fetching => {
                        let result = client
                            .fetch::<T, _, _>(&key, &options, || fetcher())
                            .await;
                        let rx = client.subscribe_invalidation();
                        let result = match result {
                            Ok(data) => QueryResult::success(data, false),
                            Err(e) => QueryResult::error(e),
                        };
                        Some((result, WatchState::Watching { rx }))
                    }

                    WatchState::Watching { mut rx } => loop {
                        match rx.recv().await {
                            Ok(prefix) if key.starts_with(&prefix) => {
                                return Some((QueryResult::loading(), WatchState::Fetching));
                            }
                            Ok(_) => {}
                            // Missed notifications; one of them may have been
                            // ours, so refetch.
                            Err(broadcast::error::RecvError::Lagged(_)) => {
                                return Some((QueryResult::loading(), WatchState::Fetching));
                            }
                            Err(broadcast::error::RecvError::Closed) => return None,
                        }
                    },

                    WatchState::Done => None,
                }
            }
        })
        .boxed()
    }

    /// Spawns the background sweeper that garbage-collects expired entries.
    ///
    /// Returns a token; cancelling it stops the sweeper.
    pub fn spawn_sweeper(self: &Arc<Self>) -> CancellationToken {
        let token = CancellationToken::new();
        let stop = token.clone();
        let client = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(client.config.gc_interval);
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = client.cache.sweep();
                        if removed > 0 {
                            debug!(removed, "swept expired cache entries");
                        }
                    }
                }
            }
        });

        token
    }
}

/// Internal state machine for [`QueryClient::watch`].
enum WatchState {
    Initial,
    Fetching,
    Watching {
        rx: broadcast::Receiver<QueryKey>,
    },
    Done,
}

async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, fetcher: &F) -> Result<T, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let backoff = policy.backoff_for_attempt(attempt - 1);
            debug!(attempt, ?backoff, "backing off before retry");
            sleep(backoff).await;
        }

        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                warn!(attempt = attempt + 1, error = %e, "retryable fetch failure");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| ApiError::Network("max retries exceeded".to_string())))
}
