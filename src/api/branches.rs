//! Branch operations.
//!
//! Branch configuration barely changes, so watches use the settled policy
//! (10-minute staleness).

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::client::{QueryClient, QueryResult};
use crate::config::QueryOptions;
use crate::error::ApiError;
use crate::http::Http;
use crate::keys;
use crate::model::Branch;

/// Payload for creating a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBranch {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Lists all branches.
pub async fn list_branches(http: &Http) -> Result<Vec<Branch>, ApiError> {
    http.get_list("/branches/", &[]).await
}

/// Fetches one branch.
pub async fn get_branch(http: &Http, id: i64) -> Result<Branch, ApiError> {
    http.get_json(&format!("/branches/{id}/")).await
}

/// Creates a branch.
pub async fn create_branch(http: &Http, payload: &NewBranch) -> Result<Branch, ApiError> {
    http.post_json("/branches/", payload).await
}

/// Deletes a branch.
pub async fn delete_branch(http: &Http, id: i64) -> Result<(), ApiError> {
    http.delete(&format!("/branches/{id}/")).await
}

/// Watches the branch list with the settled policy.
pub fn watch_branches(
    client: &Arc<QueryClient>,
    http: &Http,
) -> BoxStream<'static, QueryResult<Vec<Branch>>> {
    let http = http.clone();
    client.watch(keys::branches::list(), QueryOptions::settled(), move || {
        let http = http.clone();
        async move { list_branches(&http).await }
    })
}

/// Watches one branch. Disabled until `id` is a real (positive) id.
pub fn watch_branch(
    client: &Arc<QueryClient>,
    http: &Http,
    id: i64,
) -> BoxStream<'static, QueryResult<Branch>> {
    let options = QueryOptions::settled().enabled(id > 0);
    let http = http.clone();
    client.watch(keys::branches::detail(id), options, move || {
        let http = http.clone();
        async move { get_branch(&http, id).await }
    })
}
