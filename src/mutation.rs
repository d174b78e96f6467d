//! Mutations with optimistic cache updates.
//!
//! A mutation performs a write against the remote API and updates the cache
//! so the UI reflects the new state before the server has confirmed it. The
//! optimistic update is an explicit three-phase protocol:
//!
//! 1. **Snapshot**: before the request fires, [`OptimisticGuard`] records
//!    the current cache entry for every key it is about to touch.
//! 2. **Apply**: a provisional value (for creates, a placeholder with a
//!    [`temp_id`]) is spliced into the cached data.
//! 3. **Commit or rollback**: on success the snapshots are discarded; on
//!    failure they are restored verbatim, so no partial or phantom state
//!    survives a failed mutation.
//!
//! Either way, the mutation then invalidates every key in its invalidation
//! set, forcing subsequent reads to refetch and replace any optimistic
//! placeholder with server truth.
//!
//! Concurrent mutations against the same resource race with
//! last-settled-wins semantics; the invalidation-forced refetch converges
//! the cache on whatever the server decided.
//!
//! # Example
//!
//! ```rust,ignore
//! use pharma_client::mutation::{Mutation, temp_id};
//!
//! let created = Mutation::new(client.clone(), move |payload: NewUser| {
//!     let http = http.clone();
//!     async move { api::users::create_user(&http, &payload).await }
//! })
//! .optimistic(|guard, payload| {
//!     guard.edit_list(&keys::users::lists(), |users: &mut Vec<User>| {
//!         users.push(payload.placeholder(temp_id()));
//!     });
//! })
//! .invalidates(invalidation::for_resource(Resource::Users))
//! .run(new_user)
//! .await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::cache::CacheEntry;
use crate::client::QueryClient;
use crate::error::ApiError;
use crate::key::QueryKey;

/// A provisional id for an optimistic placeholder.
///
/// Derived from the current unix-millisecond clock and negated, so it can
/// never collide with a server-assigned (positive) id and is trivially
/// recognizable in logs.
#[must_use]
pub fn temp_id() -> i64 {
    -Utc::now().timestamp_millis()
}

/// The pre-mutation state of one cache entry.
///
/// `None` records that the key was absent, so rollback restores absence.
struct Snapshot {
    key: QueryKey,
    entry: Option<CacheEntry>,
}

/// Records snapshots and applies provisional edits for one mutation.
///
/// Each key is snapshotted exactly once, before its first edit; repeated
/// edits of the same key keep the original snapshot so rollback always
/// restores the true pre-mutation state.
pub struct OptimisticGuard {
    client: Arc<QueryClient>,
    snapshots: Vec<Snapshot>,
}

impl OptimisticGuard {
    fn begin(client: Arc<QueryClient>) -> Self {
        Self {
            client,
            snapshots: Vec::new(),
        }
    }

    fn snapshot(&mut self, key: &QueryKey) {
        if self.snapshots.iter().any(|s| s.key == *key) {
            return;
        }
        self.snapshots.push(Snapshot {
            key: key.clone(),
            entry: self.client.cache().entry(key),
        });
    }

    /// Replaces the cached value for `key` with a provisional one.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &QueryKey, value: T) {
        self.snapshot(key);
        let gc_time = self.client.default_options().gc_time;
        self.client.cache().set(key.clone(), value, gc_time);
    }

    /// Edits the cached list for `key` in place, if one is cached.
    ///
    /// With no cached list there is nothing to provisionally show; the
    /// snapshot is still taken so rollback is uniform.
    pub fn edit_list<T>(&mut self, key: &QueryKey, edit: impl FnOnce(&mut Vec<T>))
    where
        T: Clone + Send + Sync + 'static,
    {
        self.snapshot(key);
        if let Some(current) = self.client.cache().data::<Vec<T>>(key) {
            let mut updated = (*current).clone();
            edit(&mut updated);
            let gc_time = self.client.default_options().gc_time;
            self.client.cache().set(key.clone(), updated, gc_time);
        }
    }

    /// Removes the cached entry for `key` (optimistic delete of a detail).
    pub fn remove(&mut self, key: &QueryKey) {
        self.snapshot(key);
        let _ = self.client.cache().take(key);
    }

    /// Number of keys this guard has touched.
    #[must_use]
    pub fn touched(&self) -> usize {
        self.snapshots.len()
    }

    fn commit(self) {
        debug!(keys = self.snapshots.len(), "optimistic update committed");
    }

    fn rollback(self) {
        for snapshot in self.snapshots.into_iter().rev() {
            self.client.cache().restore(snapshot.key, snapshot.entry);
        }
    }
}

type Validator<I> = Box<dyn Fn(&I) -> Result<(), ApiError> + Send + Sync>;
type Applier<I> = Box<dyn FnOnce(&mut OptimisticGuard, &I) + Send>;
type Mutator<I, O> = Box<dyn FnOnce(I) -> BoxFuture<'static, Result<O, ApiError>> + Send>;

/// A write operation with validation, optimistic update, and invalidation.
pub struct Mutation<I, O> {
    client: Arc<QueryClient>,
    validate: Option<Validator<I>>,
    optimistic: Option<Applier<I>>,
    invalidates: Vec<QueryKey>,
    mutator: Mutator<I, O>,
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a mutation around the given async mutator.
    pub fn new<F, Fut>(client: Arc<QueryClient>, mutator: F) -> Self
    where
        F: FnOnce(I) -> Fut + Send + 'static,
        Fut: Future<Output = Result<O, ApiError>> + Send + 'static,
    {
        Self {
            client,
            validate: None,
            optimistic: None,
            invalidates: Vec::new(),
            mutator: Box::new(move |input| mutator(input).boxed()),
        }
    }

    /// Adds a client-side payload check, run before any network call or
    /// cache edit. A failure surfaces synchronously as
    /// [`ApiError::Validation`] and is never retried.
    #[must_use]
    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&I) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        self.validate = Some(Box::new(validate));
        self
    }

    /// Adds the optimistic cache edit applied before the request fires.
    #[must_use]
    pub fn optimistic<F>(mut self, apply: F) -> Self
    where
        F: FnOnce(&mut OptimisticGuard, &I) + Send + 'static,
    {
        self.optimistic = Some(Box::new(apply));
        self
    }

    /// Declares the query keys invalidated when the mutation settles.
    #[must_use]
    pub fn invalidates(mut self, keys: impl IntoIterator<Item = QueryKey>) -> Self {
        self.invalidates.extend(keys);
        self
    }

    /// Runs the mutation: validate, snapshot + apply, request, then
    /// commit-or-rollback and invalidate on settle.
    pub async fn run(mut self, input: I) -> Result<O, ApiError> {
        if let Some(validate) = &self.validate {
            validate(&input)?;
        }

        let mut guard = OptimisticGuard::begin(Arc::clone(&self.client));
        if let Some(apply) = self.optimistic.take() {
            apply(&mut guard, &input);
        }

        let result = (self.mutator)(input).await;

        match &result {
            Ok(_) => guard.commit(),
            Err(e) => {
                warn!(error = %e, "mutation failed, rolling back optimistic update");
                guard.rollback();
            }
        }

        self.client.invalidate_many(&self.invalidates);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn test_client() -> Arc<QueryClient> {
        Arc::new(QueryClient::new(ClientConfig::new("http://localhost:8000")))
    }

    fn list_key() -> QueryKey {
        QueryKey::new("users").scope("list")
    }

    #[test]
    fn test_temp_id_is_negative() {
        assert!(temp_id() < 0);
    }

    #[tokio::test]
    async fn test_successful_mutation_keeps_optimistic_value_until_refetch() {
        let client = test_client();
        let gc = client.default_options().gc_time;
        client.cache().set(list_key(), vec![1_i32], gc);

        let result = Mutation::new(Arc::clone(&client), |value: i32| async move { Ok(value) })
            .optimistic(|guard, value| {
                let value = *value;
                guard.edit_list(&list_key(), |items: &mut Vec<i32>| items.push(value));
            })
            .run(2)
            .await;

        assert_eq!(result, Ok(2));
        let cached = client
            .cache()
            .data::<Vec<i32>>(&list_key())
            .expect("list should be cached");
        assert_eq!(*cached, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_mutation_rolls_back_to_snapshot() {
        let client = test_client();
        let gc = client.default_options().gc_time;
        client.cache().set(list_key(), vec![1_i32, 2], gc);
        let before = client
            .cache()
            .data::<Vec<i32>>(&list_key())
            .expect("list should be cached");

        let result: Result<i32, _> =
            Mutation::new(Arc::clone(&client), |_value: i32| async move {
                Err(ApiError::Network("offline".to_string()))
            })
            .optimistic(|guard, value| {
                let value = *value;
                guard.edit_list(&list_key(), |items: &mut Vec<i32>| items.push(value));
            })
            .run(3)
            .await;

        assert!(result.is_err());
        let after = client
            .cache()
            .data::<Vec<i32>>(&list_key())
            .expect("list should still be cached");
        assert_eq!(*after, *before);
        // Rollback restores the snapshotted allocation itself.
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_rollback_restores_absence() {
        let client = test_client();

        let result: Result<i32, _> =
            Mutation::new(Arc::clone(&client), |_value: i32| async move {
                Err(ApiError::Timeout)
            })
            .optimistic(|guard, value| {
                guard.set(&list_key(), vec![*value]);
            })
            .run(9)
            .await;

        assert!(result.is_err());
        assert!(client.cache().entry(&list_key()).is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_precedes_everything() {
        let client = test_client();
        let gc = client.default_options().gc_time;
        client.cache().set(list_key(), vec![1_i32], gc);

        let result: Result<i32, _> =
            Mutation::new(Arc::clone(&client), |value: i32| async move { Ok(value) })
                .validate(|value| {
                    if *value < 0 {
                        Err(ApiError::Validation("value must not be negative".to_string()))
                    } else {
                        Ok(())
                    }
                })
                .optimistic(|guard, value| {
                    let value = *value;
                    guard.edit_list(&list_key(), |items: &mut Vec<i32>| items.push(value));
                })
                .run(-1)
                .await;

        assert_eq!(
            result,
            Err(ApiError::Validation("value must not be negative".to_string()))
        );
        let cached = client
            .cache()
            .data::<Vec<i32>>(&list_key())
            .expect("list should be cached");
        assert_eq!(*cached, vec![1], "cache must be untouched");
    }

    #[tokio::test]
    async fn test_mutation_invalidates_on_both_outcomes() {
        let client = test_client();
        let gc = client.default_options().gc_time;
        let other = QueryKey::new("reports").scope("list");
        client.cache().set(list_key(), vec![1_i32], gc);
        client.cache().set(other.clone(), 0_i32, gc);

        let _ = Mutation::new(Arc::clone(&client), |value: i32| async move { Ok(value) })
            .invalidates([QueryKey::new("users"), QueryKey::new("reports")])
            .run(1)
            .await;

        use crate::cache::EntryState;
        assert_eq!(
            client.cache().entry(&list_key()).map(|e| e.state()),
            Some(EntryState::Stale)
        );
        assert_eq!(
            client.cache().entry(&other).map(|e| e.state()),
            Some(EntryState::Stale)
        );
    }

    #[tokio::test]
    async fn test_same_key_snapshotted_once() {
        let client = test_client();
        let gc = client.default_options().gc_time;
        client.cache().set(list_key(), vec![1_i32], gc);

        let result: Result<i32, _> =
            Mutation::new(Arc::clone(&client), |_value: i32| async move {
                Err(ApiError::Timeout)
            })
            .optimistic(|guard, _value| {
                guard.edit_list(&list_key(), |items: &mut Vec<i32>| items.push(2));
                guard.edit_list(&list_key(), |items: &mut Vec<i32>| items.push(3));
                assert_eq!(guard.touched(), 1);
            })
            .run(0)
            .await;

        assert!(result.is_err());
        let after = client
            .cache()
            .data::<Vec<i32>>(&list_key())
            .expect("list should be cached");
        assert_eq!(*after, vec![1], "rollback must restore the first snapshot");
    }
}
