//! The in-memory query cache.
//!
//! Entries are keyed by [`QueryKey`] and hold type-erased data so one map can
//! cache every resource. Each entry moves through a small lifecycle:
//!
//! ```text
//! absent -> fetching -> fresh -> stale -> fetching (revalidate) -> fresh | error
//! ```
//!
//! `error` goes back to `fetching` on the next retry; manual invalidation
//! forces `fresh -> stale` immediately, regardless of elapsed time. Absent
//! entries are simply missing from the map. Entries that outlive their
//! `gc_time` are removed by [`QueryCache::sweep`].

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::key::QueryKey;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// A fetch is in flight (initial fetch or revalidation).
    Fetching,
    /// Data is within its staleness window.
    Fresh,
    /// Data is present but past its staleness window; reads trigger refetch.
    Stale,
    /// The last fetch failed and no usable data is present.
    Error,
}

pub(crate) type ErasedData = Arc<dyn Any + Send + Sync>;

/// A cached value with its timestamp, lifecycle state, and retention window.
#[derive(Clone)]
pub struct CacheEntry {
    data: Option<ErasedData>,
    state: EntryState,
    updated_at: Instant,
    gc_time: Duration,
}

impl CacheEntry {
    fn new(data: ErasedData, gc_time: Duration) -> Self {
        Self {
            data: Some(data),
            state: EntryState::Fresh,
            updated_at: Instant::now(),
            gc_time,
        }
    }

    /// The entry's current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EntryState {
        self.state
    }

    /// Downcasts the cached data to its concrete type.
    #[must_use]
    pub fn data<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.data
            .as_ref()
            .and_then(|data| Arc::clone(data).downcast::<T>().ok())
    }

    /// Returns `true` if the entry has data and it is past `stale_time`.
    #[must_use]
    pub fn is_past(&self, stale_time: Duration) -> bool {
        self.updated_at.elapsed() > stale_time
    }

    /// Returns `true` if the entry is past its retention window.
    #[must_use]
    pub fn should_gc(&self) -> bool {
        self.updated_at.elapsed() > self.gc_time
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("state", &self.state)
            .field("has_data", &self.data.is_some())
            .field("age", &self.updated_at.elapsed())
            .finish()
    }
}

/// Concurrent map of query keys to cache entries.
///
/// The cache is owned by a
/// [`QueryClient`](crate::client::QueryClient) and never global; tests
/// construct their own instances.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<QueryKey, CacheEntry>,
}

impl QueryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A full clone of the entry for `key`, if present.
    #[must_use]
    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// The cached data for `key` downcast to `T`, regardless of staleness.
    #[must_use]
    pub fn data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.entries.get(key).and_then(|entry| entry.data::<T>())
    }

    /// Stores fresh data for `key`.
    pub fn set<T: Send + Sync + 'static>(&self, key: QueryKey, value: T, gc_time: Duration) {
        self.set_shared(key, Arc::new(value), gc_time);
    }

    /// Stores already-shared data for `key`, so the cache and the caller
    /// hold the same allocation.
    pub(crate) fn set_shared(&self, key: QueryKey, data: ErasedData, gc_time: Duration) {
        self.entries.insert(key, CacheEntry::new(data, gc_time));
    }

    /// Marks `key` as fetching, keeping any existing data for stale reads.
    pub fn begin_fetch(&self, key: &QueryKey, gc_time: Duration) {
        match self.entries.get_mut(key) {
            Some(mut entry) => entry.state = EntryState::Fetching,
            None => {
                self.entries.insert(
                    key.clone(),
                    CacheEntry {
                        data: None,
                        state: EntryState::Fetching,
                        updated_at: Instant::now(),
                        gc_time,
                    },
                );
            }
        }
    }

    /// Records a failed fetch for `key`.
    ///
    /// Existing data is kept so stale reads still have something to show;
    /// the state still reports the failure.
    pub fn set_error(&self, key: &QueryKey) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.state = EntryState::Error;
            entry.updated_at = Instant::now();
        }
    }

    /// Removes the entry for `key`, returning it for snapshotting.
    pub fn take(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    /// Restores a previously taken entry; `None` restores absence.
    pub fn restore(&self, key: QueryKey, entry: Option<CacheEntry>) {
        match entry {
            Some(entry) => {
                self.entries.insert(key, entry);
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    /// Marks every entry whose key starts with `prefix` as stale.
    ///
    /// Entries already stale, fetching, or errored are left as they are, so
    /// invalidating twice cannot trigger a second revalidation beyond the
    /// one already due.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let mut marked = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(prefix) && entry.state == EntryState::Fresh {
                entry.state = EntryState::Stale;
                marked += 1;
            }
        }
        marked
    }

    /// Removes entries past their retention window, returning how many.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.should_gc());
        before - self.entries.len()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
