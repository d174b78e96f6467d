//! Typed filter objects for list queries.
//!
//! Each filter is a struct of optional fields. [`FilterPairs::pairs`] emits
//! the normalized `(name, value)` pairs for every *present* field, and that
//! single output feeds both the query-string builder and the cache-key
//! factory. Absent fields, and search strings that are empty after trimming,
//! produce no pair at all, so a default filter, an explicitly empty filter,
//! and no filter collapse to the same cache entry and the same request URL.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{DeliveryStatus, OrderStatus, PrescriptionStatus, ProductKind, Role};

/// Normalized serialization of a filter object.
pub trait FilterPairs {
    /// `(name, value)` pairs for every present field, in declaration order.
    fn pairs(&self) -> Vec<(&'static str, String)>;

    /// The pairs as a sorted map, suitable for a key segment.
    fn filter_map(&self) -> BTreeMap<String, String> {
        self.pairs()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    /// Returns `true` if no field is present.
    fn is_default(&self) -> bool {
        self.pairs().is_empty()
    }
}

fn push_value(pairs: &mut Vec<(&'static str, String)>, name: &'static str, value: impl ToString) {
    pairs.push((name, value.to_string()));
}

fn push_opt(
    pairs: &mut Vec<(&'static str, String)>,
    name: &'static str,
    value: Option<impl ToString>,
) {
    if let Some(value) = value {
        push_value(pairs, name, value);
    }
}

fn push_text(pairs: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<&str>) {
    if let Some(text) = value {
        let text = text.trim();
        if !text.is_empty() {
            pairs.push((name, text.to_string()));
        }
    }
}

/// Server-side pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl Pagination {
    fn extend(self, pairs: &mut Vec<(&'static str, String)>) {
        push_opt(pairs, "page", self.page);
        push_opt(pairs, "page_size", self.page_size);
    }
}

/// Inclusive date range, either bound optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    fn extend(self, pairs: &mut Vec<(&'static str, String)>) {
        push_opt(pairs, "date_from", self.from);
        push_opt(pairs, "date_to", self.to);
    }
}

/// Filter for user list queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub branch: Option<i64>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl FilterPairs for UserFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "role", self.role.map(Role::as_str));
        push_opt(&mut pairs, "branch", self.branch);
        push_opt(&mut pairs, "is_active", self.is_active);
        push_text(&mut pairs, "search", self.search.as_deref());
        self.pagination.extend(&mut pairs);
        pairs
    }
}

/// Filter for product list queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductFilter {
    pub kind: Option<ProductKind>,
    pub requires_prescription: Option<bool>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl FilterPairs for ProductFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "kind", self.kind.map(ProductKind::as_str));
        push_opt(
            &mut pairs,
            "requires_prescription",
            self.requires_prescription,
        );
        push_text(&mut pairs, "search", self.search.as_deref());
        self.pagination.extend(&mut pairs);
        pairs
    }
}

/// Filter for inventory record queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InventoryFilter {
    pub branch: Option<i64>,
    pub product: Option<i64>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl FilterPairs for InventoryFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "branch", self.branch);
        push_opt(&mut pairs, "product", self.product);
        push_text(&mut pairs, "search", self.search.as_deref());
        self.pagination.extend(&mut pairs);
        pairs
    }
}

/// Filter for order list queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer: Option<i64>,
    pub branch: Option<i64>,
    pub dates: DateRange,
    pub pagination: Pagination,
}

impl FilterPairs for OrderFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "status", self.status.map(OrderStatus::as_str));
        push_opt(&mut pairs, "customer", self.customer);
        push_opt(&mut pairs, "branch", self.branch);
        self.dates.extend(&mut pairs);
        self.pagination.extend(&mut pairs);
        pairs
    }
}

/// Filter for delivery list queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub order: Option<i64>,
    pub pagination: Pagination,
}

impl FilterPairs for DeliveryFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(
            &mut pairs,
            "status",
            self.status.map(DeliveryStatus::as_str),
        );
        push_opt(&mut pairs, "order", self.order);
        self.pagination.extend(&mut pairs);
        pairs
    }
}

/// Filter for prescription list queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrescriptionFilter {
    pub status: Option<PrescriptionStatus>,
    pub customer: Option<i64>,
    pub pagination: Pagination,
}

impl FilterPairs for PrescriptionFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(
            &mut pairs,
            "status",
            self.status.map(PrescriptionStatus::as_str),
        );
        push_opt(&mut pairs, "customer", self.customer);
        self.pagination.extend(&mut pairs);
        pairs
    }
}

/// Filter for report list queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportFilter {
    pub branch: Option<i64>,
    pub kind: Option<String>,
    pub dates: DateRange,
}

impl FilterPairs for ReportFilter {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "branch", self.branch);
        push_text(&mut pairs, "kind", self.kind.as_deref());
        self.dates.extend(&mut pairs);
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_has_no_pairs() {
        assert!(UserFilter::default().is_default());
        assert!(InventoryFilter::default().is_default());
        assert!(OrderFilter::default().is_default());
    }

    #[test]
    fn test_empty_search_is_absent() {
        let filter = UserFilter {
            search: Some("   ".to_string()),
            ..UserFilter::default()
        };
        assert!(filter.is_default());

        let filter = UserFilter {
            search: Some(String::new()),
            ..UserFilter::default()
        };
        assert!(filter.is_default());
    }

    #[test]
    fn test_search_is_trimmed() {
        let filter = ProductFilter {
            search: Some("  ibuprofen ".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(
            filter.pairs(),
            vec![("search", "ibuprofen".to_string())]
        );
    }

    #[test]
    fn test_pairs_cover_present_fields() {
        let filter = InventoryFilter {
            branch: Some(3),
            product: None,
            search: None,
            pagination: Pagination {
                page: Some(2),
                page_size: None,
            },
        };
        assert_eq!(
            filter.pairs(),
            vec![("branch", "3".to_string()), ("page", "2".to_string())]
        );
    }

    #[test]
    fn test_filter_map_is_sorted() {
        let filter = OrderFilter {
            status: Some(OrderStatus::Pending),
            customer: Some(12),
            branch: Some(3),
            dates: DateRange::default(),
            pagination: Pagination::default(),
        };
        let map = filter.filter_map();
        let names: Vec<_> = map.keys().cloned().collect();
        assert_eq!(names, vec!["branch", "customer", "status"]);
        assert_eq!(map["status"], "pending");
    }

    #[test]
    fn test_date_range_pairs() {
        let filter = ReportFilter {
            branch: None,
            kind: None,
            dates: DateRange {
                from: NaiveDate::from_ymd_opt(2025, 1, 1),
                to: NaiveDate::from_ymd_opt(2025, 1, 31),
            },
        };
        assert_eq!(
            filter.pairs(),
            vec![
                ("date_from", "2025-01-01".to_string()),
                ("date_to", "2025-01-31".to_string()),
            ]
        );
    }

    #[test]
    fn test_structurally_equal_filters_share_a_map() {
        let a = UserFilter {
            role: Some(Role::Customer),
            branch: Some(1),
            ..UserFilter::default()
        };
        let b = UserFilter {
            branch: Some(1),
            role: Some(Role::Customer),
            ..UserFilter::default()
        };
        assert_eq!(a.filter_map(), b.filter_map());
    }
}
