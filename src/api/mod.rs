//! Typed service modules over the remote REST API.
//!
//! One async function per remote operation: input is a typed payload or
//! filter object, output the unwrapped domain type. Side effects are
//! confined to network I/O. No caching and no retries happen at this layer;
//! both are query-layer policy.
//!
//! Resource paths follow `/{resource}/` and `/{resource}/{id}/`, with role-
//! or status-scoped convenience sub-paths (`/users/customers/`,
//! `/inventory-records/low-stock/`). List operations go through
//! [`Http::get_list`](crate::http::Http::get_list), which transparently
//! follows pagination links, so a single call can issue several sequential
//! requests.
//!
//! Alongside the plain service functions, each module exposes `watch_*`
//! bindings (service + key + volatility policy, returning a result stream)
//! and `*_mutation` builders (service + optimistic edit + invalidation set).

pub mod auth;
pub mod branches;
pub mod deliveries;
pub mod inventory;
pub mod loyalty;
pub mod orders;
pub mod prescriptions;
pub mod products;
pub mod reports;
pub mod users;

use crate::error::ApiError;

/// Result of a bulk create: the successful subset and every failure,
/// paired with the payload that caused it.
///
/// Partial failure is an expected outcome here, not an error; callers decide
/// whether to re-surface `failed` to the user or retry it.
#[derive(Debug, Default)]
pub struct BulkOutcome<P, T> {
    /// Entities the server accepted, in submission order.
    pub created: Vec<T>,
    /// Payloads the server rejected, each with its error.
    pub failed: Vec<(P, ApiError)>,
}

impl<P, T> BulkOutcome<P, T> {
    /// An empty outcome.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            created: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Returns `true` if every payload was accepted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_outcome_completeness() {
        let mut outcome: BulkOutcome<i32, i32> = BulkOutcome::new();
        assert!(outcome.is_complete());

        outcome.created.push(1);
        assert!(outcome.is_complete());

        outcome.failed.push((2, ApiError::Timeout));
        assert!(!outcome.is_complete());
    }
}
