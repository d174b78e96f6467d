//! Report operations.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::Serialize;

use crate::client::{QueryClient, QueryResult};
use crate::config::QueryOptions;
use crate::error::ApiError;
use crate::filter::{FilterPairs, ReportFilter};
use crate::http::Http;
use crate::keys;
use crate::model::Report;

/// Payload for requesting report generation.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRequest {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<i64>,
}

/// Lists reports matching `filter`.
pub async fn list_reports(http: &Http, filter: &ReportFilter) -> Result<Vec<Report>, ApiError> {
    http.get_list("/reports/", &filter.pairs()).await
}

/// Fetches one report.
pub async fn get_report(http: &Http, id: i64) -> Result<Report, ApiError> {
    http.get_json(&format!("/reports/{id}/")).await
}

/// Requests generation of a new report.
pub async fn generate_report(http: &Http, payload: &ReportRequest) -> Result<Report, ApiError> {
    http.post_json("/reports/", payload).await
}

/// Watches the filtered report list with the settled policy.
pub fn watch_reports(
    client: &Arc<QueryClient>,
    http: &Http,
    filter: ReportFilter,
) -> BoxStream<'static, QueryResult<Vec<Report>>> {
    let key = keys::reports::list(&filter);
    let http = http.clone();
    client.watch(key, QueryOptions::settled(), move || {
        let http = http.clone();
        let filter = filter.clone();
        async move { list_reports(&http, &filter).await }
    })
}
