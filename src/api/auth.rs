//! Authentication operations.
//!
//! On login the bearer token and profile are written to the persisted
//! session; every subsequent request carries the token. A `401` anywhere
//! clears the session again (handled by the transport).

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::Http;
use crate::model::User;

/// Login request payload.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: User,
}

/// Logs in and persists the returned token and profile.
pub async fn login(http: &Http, credentials: &Credentials) -> Result<User, ApiError> {
    let response: AuthResponse = http.post_json("/auth/login/", credentials).await?;
    http.session().set_token(response.token);
    http.session().set_profile(&response.user);
    Ok(response.user)
}

/// Logs out. Local credentials are cleared even if the server call fails.
pub async fn logout(http: &Http) -> Result<(), ApiError> {
    let result = http
        .post_no_content("/auth/logout/", &serde_json::json!({}))
        .await;
    http.session().clear();
    result
}

/// Fetches the profile of the authenticated user.
pub async fn me(http: &Http) -> Result<User, ApiError> {
    http.get_json("/users/me/").await
}
