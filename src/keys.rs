//! Per-resource query-key factories.
//!
//! Each resource exposes the same family of constructors: `all()` is the root
//! prefix, `lists()` covers every list variant, `list(filter)` is one
//! filtered list, `detail(id)` one entity. Invalidation targets a prefix, so
//! invalidating `users::lists()` hits every `users::list(..)` entry and
//! invalidating `users::all()` hits details too.
//!
//! The factories are the only place key strings are spelled out; services and
//! hooks never assemble keys by hand.

use crate::filter::FilterPairs;
use crate::key::QueryKey;

macro_rules! resource_keys {
    ($name:ident, $resource:literal, $filter:ty) => {
        #[doc = concat!("Key factory for the `", $resource, "` resource.")]
        pub mod $name {
            use super::*;

            /// Root prefix covering every key of this resource.
            #[must_use]
            pub fn all() -> QueryKey {
                QueryKey::new($resource)
            }

            /// Prefix covering every list variant.
            #[must_use]
            pub fn lists() -> QueryKey {
                all().scope("list")
            }

            /// One filtered list.
            #[must_use]
            pub fn list(filter: &$filter) -> QueryKey {
                lists().filters(filter.filter_map())
            }

            /// One entity by id.
            #[must_use]
            pub fn detail(id: i64) -> QueryKey {
                all().scope("detail").id(id)
            }
        }
    };
}

resource_keys!(users, "users", crate::filter::UserFilter);
resource_keys!(products, "products", crate::filter::ProductFilter);
resource_keys!(inventory, "inventory-records", crate::filter::InventoryFilter);
resource_keys!(orders, "orders", crate::filter::OrderFilter);
resource_keys!(deliveries, "deliveries", crate::filter::DeliveryFilter);
resource_keys!(prescriptions, "prescriptions", crate::filter::PrescriptionFilter);
resource_keys!(reports, "reports", crate::filter::ReportFilter);

/// Key factory for the `branches` resource.
pub mod branches {
    use super::*;

    /// Root prefix covering every key of this resource.
    #[must_use]
    pub fn all() -> QueryKey {
        QueryKey::new("branches")
    }

    /// The full branch list (branches are few and unfiltered).
    #[must_use]
    pub fn list() -> QueryKey {
        all().scope("list")
    }

    /// One branch by id.
    #[must_use]
    pub fn detail(id: i64) -> QueryKey {
        all().scope("detail").id(id)
    }
}

/// Key factory for the `loyalty-points` resource.
pub mod loyalty {
    use super::*;

    /// Root prefix covering every key of this resource.
    #[must_use]
    pub fn all() -> QueryKey {
        QueryKey::new("loyalty-points")
    }

    /// Balance for one customer.
    #[must_use]
    pub fn for_customer(customer: i64) -> QueryKey {
        all().scope("customer").id(customer)
    }
}

/// Role- and status-scoped convenience keys.
pub mod scoped {
    use super::*;
    use crate::model::{OrderStatus, Role};

    /// Users of one role (mirrors `/users/{role}s/` convenience endpoints).
    #[must_use]
    pub fn users_by_role(role: Role) -> QueryKey {
        users::all().scope("by-role").filter("role", role.as_str())
    }

    /// Orders of one status.
    #[must_use]
    pub fn orders_by_status(status: OrderStatus) -> QueryKey {
        orders::all()
            .scope("by-status")
            .filter("status", status.as_str())
    }

    /// Inventory records currently at or below minimum stock.
    #[must_use]
    pub fn low_stock() -> QueryKey {
        inventory::all().scope("low-stock")
    }

    /// Low-stock records of one branch.
    #[must_use]
    pub fn low_stock_for_branch(branch: i64) -> QueryKey {
        low_stock().id(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{InventoryFilter, UserFilter};
    use crate::model::Role;

    #[test]
    fn test_list_is_under_lists_prefix() {
        let filter = UserFilter {
            role: Some(Role::Customer),
            ..UserFilter::default()
        };
        assert!(users::list(&filter).starts_with(&users::lists()));
        assert!(users::list(&filter).starts_with(&users::all()));
    }

    #[test]
    fn test_detail_is_not_under_lists() {
        assert!(!users::detail(5).starts_with(&users::lists()));
        assert!(users::detail(5).starts_with(&users::all()));
    }

    #[test]
    fn test_default_filter_list_equals_bare_list() {
        assert_eq!(
            inventory::list(&InventoryFilter::default()),
            inventory::lists()
        );
    }

    #[test]
    fn test_filtered_lists_differ() {
        let branch_3 = InventoryFilter {
            branch: Some(3),
            ..InventoryFilter::default()
        };
        let branch_4 = InventoryFilter {
            branch: Some(4),
            ..InventoryFilter::default()
        };
        assert_ne!(inventory::list(&branch_3), inventory::list(&branch_4));
    }

    #[test]
    fn test_scoped_keys_live_under_resource_root() {
        assert!(scoped::low_stock().starts_with(&inventory::all()));
        assert!(scoped::low_stock_for_branch(3).starts_with(&scoped::low_stock()));
        assert!(scoped::users_by_role(Role::Customer).starts_with(&users::all()));
    }
}
