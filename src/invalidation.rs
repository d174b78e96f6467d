//! The cross-resource invalidation map.
//!
//! Writing one resource can make cached reads of others wrong: completing an
//! order moves stock, stock movements feed reports. This module is the single
//! place those dependencies are declared; mutations pass the result straight
//! to [`Mutation::invalidates`](crate::mutation::Mutation::invalidates).

use crate::key::QueryKey;
use crate::keys;

/// A mutable remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Products,
    Inventory,
    Orders,
    Branches,
    Deliveries,
    Reports,
    Loyalty,
    Prescriptions,
}

/// Query-key prefixes invalidated after a mutation of `resource` settles.
#[must_use]
pub fn for_resource(resource: Resource) -> Vec<QueryKey> {
    match resource {
        Resource::Users => vec![keys::users::all()],
        Resource::Products => vec![keys::products::all(), keys::inventory::all()],
        Resource::Inventory => vec![
            keys::inventory::all(),
            keys::scoped::low_stock(),
            keys::reports::all(),
        ],
        Resource::Orders => vec![
            keys::orders::all(),
            keys::inventory::all(),
            keys::loyalty::all(),
            keys::reports::all(),
        ],
        Resource::Branches => vec![keys::branches::all(), keys::inventory::all()],
        Resource::Deliveries => vec![keys::deliveries::all(), keys::orders::all()],
        Resource::Reports => vec![keys::reports::all()],
        Resource::Loyalty => vec![keys::loyalty::all()],
        Resource::Prescriptions => vec![keys::prescriptions::all(), keys::orders::all()],
    }
}
