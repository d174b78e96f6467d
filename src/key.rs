//! Hierarchical cache keys.
//!
//! A [`QueryKey`] is an ordered tuple of segments identifying one logical
//! query: the resource, a scope (`list`, `detail`, ...), and optional
//! qualifiers such as an id or a normalized filter map. Keys are plain data:
//! two keys built from structurally equal inputs compare equal no matter how
//! the inputs were assembled, which is what makes cache lookups and targeted
//! invalidation reliable.
//!
//! Keys form a hierarchy by prefix: `users` is a prefix of `users/list`,
//! which is a prefix of `users/list?role=customer`. Invalidating a prefix
//! invalidates every key under it.
//!
//! # Example
//!
//! ```rust
//! use pharma_client::key::QueryKey;
//!
//! let lists = QueryKey::new("inventory").scope("list");
//! let branch_3 = QueryKey::new("inventory").scope("list").filter("branch", "3");
//!
//! assert!(branch_3.starts_with(&lists));
//! assert!(!lists.starts_with(&branch_3));
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// One segment of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(untagged)]
pub enum KeySegment {
    /// A resource or scope name.
    Str(String),
    /// A numeric identifier.
    Id(i64),
    /// A normalized filter map. `BTreeMap` keeps the serialization
    /// independent of insertion order.
    Filters(BTreeMap<String, String>),
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Id(id) => write!(f, "{id}"),
            Self::Filters(map) => {
                let mut first = true;
                for (name, value) in map {
                    if !first {
                        write!(f, "&")?;
                    }
                    write!(f, "{name}={value}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// A deterministic, hierarchical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub struct QueryKey {
    segments: Vec<KeySegment>,
}

impl QueryKey {
    /// Starts a key for the given resource.
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            segments: vec![KeySegment::Str(resource.into())],
        }
    }

    /// Appends a scope segment (`list`, `detail`, `low-stock`, ...).
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.segments.push(KeySegment::Str(scope.into()));
        self
    }

    /// Appends a numeric id segment.
    #[must_use]
    pub fn id(mut self, id: i64) -> Self {
        self.segments.push(KeySegment::Id(id));
        self
    }

    /// Appends a single-field filter segment.
    #[must_use]
    pub fn filter(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(name.into(), value.into());
        self.filters(map)
    }

    /// Appends a filter-map segment.
    ///
    /// An empty map is not appended at all, so a default filter and no filter
    /// produce the same key.
    #[must_use]
    pub fn filters(mut self, filters: BTreeMap<String, String>) -> Self {
        if !filters.is_empty() {
            self.segments.push(KeySegment::Filters(filters));
        }
        self
    }

    /// Returns `true` if `prefix` is a leading sub-sequence of this key.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        prefix.segments.len() <= self.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Number of segments in the key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the key has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments of this key.
    #[must_use]
    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                let sep = if matches!(segment, KeySegment::Filters(_)) {
                    "?"
                } else {
                    "/"
                };
                write!(f, "{sep}")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_inputs_produce_equal_keys() {
        let a = QueryKey::new("users").scope("list").filter("role", "customer");
        let b = QueryKey::new("users").scope("list").filter("role", "customer");
        assert_eq!(a, b);
    }

    #[test]
    fn test_filter_insertion_order_is_irrelevant() {
        let mut forward = BTreeMap::new();
        forward.insert("branch".to_string(), "3".to_string());
        forward.insert("status".to_string(), "active".to_string());

        let mut reverse = BTreeMap::new();
        reverse.insert("status".to_string(), "active".to_string());
        reverse.insert("branch".to_string(), "3".to_string());

        let a = QueryKey::new("inventory").scope("list").filters(forward);
        let b = QueryKey::new("inventory").scope("list").filters(reverse);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_filters_collapse_to_bare_key() {
        let bare = QueryKey::new("orders").scope("list");
        let defaulted = QueryKey::new("orders").scope("list").filters(BTreeMap::new());
        assert_eq!(bare, defaulted);
    }

    #[test]
    fn test_prefix_matching() {
        let all = QueryKey::new("users");
        let lists = QueryKey::new("users").scope("list");
        let filtered = QueryKey::new("users").scope("list").filter("role", "customer");
        let detail = QueryKey::new("users").scope("detail").id(7);

        assert!(lists.starts_with(&all));
        assert!(filtered.starts_with(&all));
        assert!(filtered.starts_with(&lists));
        assert!(detail.starts_with(&all));
        assert!(!detail.starts_with(&lists));
        assert!(!lists.starts_with(&filtered));
    }

    #[test]
    fn test_prefix_of_self() {
        let key = QueryKey::new("branches").scope("detail").id(2);
        assert!(key.starts_with(&key));
    }

    #[test]
    fn test_display() {
        let key = QueryKey::new("inventory")
            .scope("list")
            .filter("branch", "3");
        assert_eq!(key.to_string(), "inventory/list?branch=3");

        let detail = QueryKey::new("users").scope("detail").id(42);
        assert_eq!(detail.to_string(), "users/detail/42");
    }

    #[test]
    fn test_different_ids_differ() {
        let a = QueryKey::new("orders").scope("detail").id(1);
        let b = QueryKey::new("orders").scope("detail").id(2);
        assert_ne!(a, b);
    }
}
