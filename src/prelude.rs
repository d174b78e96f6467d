//! Prelude module for convenient imports.
//!
//! ```
//! use pharma_client::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`QueryClient`], [`QueryResult`], [`QueryState`] - the query layer
//! - [`ClientConfig`], [`QueryOptions`], [`RetryPolicy`] - configuration
//! - [`Http`] - the transport
//! - [`Mutation`] - writes with optimistic updates
//! - [`ApiError`] - the error type
//! - [`keys`] - the per-resource key factories

pub use crate::client::{QueryClient, QueryResult, QueryState};
pub use crate::config::{ClientConfig, QueryOptions, RetryPolicy};
pub use crate::error::ApiError;
pub use crate::http::Http;
pub use crate::keys;
pub use crate::mutation::Mutation;
