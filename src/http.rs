//! HTTP transport for the remote REST API.
//!
//! [`Http`] is the only place network I/O happens. It attaches the bearer
//! token from the persisted session when present, enforces the fixed
//! request timeout, maps transport failures and non-2xx statuses into
//! [`ApiError`], and normalizes list responses.
//!
//! List endpoints return either a bare JSON array or a
//! `{results, next, previous, count}` page envelope. [`Http::get_list`]
//! accepts both and transparently follows `next` links until exhausted, so a
//! single call can issue multiple sequential requests.
//!
//! A `401` response clears the persisted credentials before the error
//! propagates; the caller still sees the `Http { status: 401, .. }` error.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::store::Session;

/// Query-string pairs for a list request.
pub type QueryPairs = [(&'static str, String)];

#[derive(Debug, serde::Deserialize)]
struct PageEnvelope<T> {
    results: Vec<T>,
    next: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    previous: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    count: Option<u64>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Page(PageEnvelope<T>),
    Array(Vec<T>),
}

fn extract_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["detail", "message", "error"] {
            if let Some(message) = value.get(field).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

fn map_transport(e: &reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Transport wrapper over [`reqwest::Client`].
#[derive(Clone)]
pub struct Http {
    client: reqwest::Client,
    config: ClientConfig,
    session: Session,
}

impl Http {
    /// Creates a transport from the client configuration and session.
    #[must_use]
    pub fn new(config: ClientConfig, session: Session) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            session,
        }
    }

    /// The session this transport authenticates with.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.timeout(self.config.request_timeout);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .prepare(builder)
            .send()
            .await
            .map_err(|e| map_transport(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("received 401, clearing persisted credentials");
            self.session.clear();
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: extract_message(&body, status),
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await.map_err(|e| map_transport(&e))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    /// GET a single JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Self::decode(response).await
    }

    /// GET a list, normalizing bare arrays and page envelopes and following
    /// `next` links until the full collection is materialized.
    pub async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryPairs,
    ) -> Result<Vec<T>, ApiError> {
        let request = self.client.get(self.url(path)).query(query);
        let response = self.send(request).await?;
        let mut body: ListBody<T> = Self::decode(response).await?;

        let mut items = Vec::new();
        loop {
            match body {
                ListBody::Array(mut page) => {
                    items.append(&mut page);
                    return Ok(items);
                }
                ListBody::Page(page) => {
                    items.extend(page.results);
                    let Some(next) = page.next else {
                        return Ok(items);
                    };
                    debug!(%next, "following next page link");
                    let response = self.send(self.client.get(next)).await?;
                    body = Self::decode(response).await?;
                }
            }
        }
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        Self::decode(response).await
    }

    /// PUT a JSON body and decode the JSON response.
    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(self.client.put(self.url(path)).json(body)).await?;
        Self::decode(response).await
    }

    /// PATCH a JSON body and decode the JSON response.
    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.client.patch(self.url(path)).json(body))
            .await?;
        Self::decode(response).await
    }

    /// POST a JSON body to an endpoint whose response body is irrelevant
    /// (logout, acknowledgements, 204 responses).
    pub async fn post_no_content<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(())
    }

    /// DELETE the resource at `path`. The response body, if any, is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Item {
        id: i64,
    }

    #[test]
    fn test_list_body_accepts_bare_array() {
        let body: ListBody<Item> =
            serde_json::from_str(r#"[{"id": 1}, {"id": 2}]"#).expect("should parse array");
        match body {
            ListBody::Array(items) => assert_eq!(items, vec![Item { id: 1 }, Item { id: 2 }]),
            ListBody::Page(_) => panic!("expected bare array"),
        }
    }

    #[test]
    fn test_list_body_accepts_page_envelope() {
        let json = r#"{
            "results": [{"id": 1}],
            "next": "https://api.example.com/users/?page=2",
            "previous": null,
            "count": 12
        }"#;
        let body: ListBody<Item> = serde_json::from_str(json).expect("should parse envelope");
        match body {
            ListBody::Page(page) => {
                assert_eq!(page.results, vec![Item { id: 1 }]);
                assert_eq!(
                    page.next.as_deref(),
                    Some("https://api.example.com/users/?page=2")
                );
            }
            ListBody::Array(_) => panic!("expected page envelope"),
        }
    }

    #[test]
    fn test_list_body_last_page_has_no_next() {
        let json = r#"{"results": [{"id": 3}], "next": null}"#;
        let body: ListBody<Item> = serde_json::from_str(json).expect("should parse");
        match body {
            ListBody::Page(page) => assert!(page.next.is_none()),
            ListBody::Array(_) => panic!("expected page envelope"),
        }
    }

    #[test]
    fn test_extract_message_prefers_detail() {
        let message = extract_message(
            r#"{"detail": "Not found."}"#,
            StatusCode::NOT_FOUND,
        );
        assert_eq!(message, "Not found.");
    }

    #[test]
    fn test_extract_message_falls_back_through_fields() {
        let message = extract_message(
            r#"{"message": "stock too low"}"#,
            StatusCode::BAD_REQUEST,
        );
        assert_eq!(message, "stock too low");

        let message = extract_message(r#"{"error": "conflict"}"#, StatusCode::CONFLICT);
        assert_eq!(message, "conflict");
    }

    #[test]
    fn test_extract_message_uses_raw_body_when_not_json() {
        let message = extract_message("upstream exploded", StatusCode::BAD_GATEWAY);
        assert_eq!(message, "upstream exploded");
    }

    #[test]
    fn test_extract_message_empty_body_uses_status_reason() {
        let message = extract_message("", StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(message, "Service Unavailable");
    }
}
