//! User operations: staff accounts and storefront customers.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{QueryClient, QueryResult};
use crate::error::ApiError;
use crate::filter::{FilterPairs, UserFilter};
use crate::http::Http;
use crate::invalidation::{self, Resource};
use crate::keys;
use crate::model::{Role, User};
use crate::mutation::{Mutation, temp_id};

use super::BulkOutcome;

/// Payload for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub branch: Option<i64>,
}

impl NewUser {
    /// Client-side shape check, run before any network call.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.first_name.trim().is_empty() {
            return Err(ApiError::Validation("first name is required".to_string()));
        }
        if self.last_name.trim().is_empty() {
            return Err(ApiError::Validation("last name is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(ApiError::Validation(format!(
                "not a valid email address: {:?}",
                self.email
            )));
        }
        Ok(())
    }

    /// The provisional entity spliced into cached lists while the create is
    /// in flight.
    #[must_use]
    pub fn placeholder(&self, id: i64) -> User {
        User {
            id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            branch: self.branch,
            is_active: true,
            date_joined: None,
        }
    }
}

/// Partial update payload; absent fields are left unchanged server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Lists users matching `filter`.
pub async fn list_users(http: &Http, filter: &UserFilter) -> Result<Vec<User>, ApiError> {
    http.get_list("/users/", &filter.pairs()).await
}

/// Lists customers via the role-scoped convenience endpoint.
pub async fn list_customers(http: &Http) -> Result<Vec<User>, ApiError> {
    http.get_list("/users/customers/", &[]).await
}

/// Fetches one user.
pub async fn get_user(http: &Http, id: i64) -> Result<User, ApiError> {
    http.get_json(&format!("/users/{id}/")).await
}

/// Creates a user.
pub async fn create_user(http: &Http, payload: &NewUser) -> Result<User, ApiError> {
    http.post_json("/users/", payload).await
}

/// Applies a partial update to a user.
pub async fn update_user(http: &Http, id: i64, payload: &UserUpdate) -> Result<User, ApiError> {
    http.patch_json(&format!("/users/{id}/"), payload).await
}

/// Deletes a user.
pub async fn delete_user(http: &Http, id: i64) -> Result<(), ApiError> {
    http.delete(&format!("/users/{id}/")).await
}

/// Creates several users, collecting per-item outcomes.
///
/// Failures do not abort the batch; the rejected payloads come back in
/// [`BulkOutcome::failed`].
pub async fn create_users(http: &Http, payloads: Vec<NewUser>) -> BulkOutcome<NewUser, User> {
    let mut outcome = BulkOutcome::new();
    for payload in payloads {
        match create_user(http, &payload).await {
            Ok(user) => outcome.created.push(user),
            Err(e) => {
                warn!(email = %payload.email, error = %e, "bulk user create: item failed");
                outcome.failed.push((payload, e));
            }
        }
    }
    outcome
}

/// Watches the filtered user list.
pub fn watch_users(
    client: &Arc<QueryClient>,
    http: &Http,
    filter: UserFilter,
) -> BoxStream<'static, QueryResult<Vec<User>>> {
    let key = keys::users::list(&filter);
    let http = http.clone();
    client.watch(key, client.default_options(), move || {
        let http = http.clone();
        let filter = filter.clone();
        async move { list_users(&http, &filter).await }
    })
}

/// Watches one user. Disabled until `id` is a real (positive) id.
pub fn watch_user(
    client: &Arc<QueryClient>,
    http: &Http,
    id: i64,
) -> BoxStream<'static, QueryResult<User>> {
    let options = client.default_options().enabled(id > 0);
    let http = http.clone();
    client.watch(keys::users::detail(id), options, move || {
        let http = http.clone();
        async move { get_user(&http, id).await }
    })
}

/// Create-user mutation: validates, splices a placeholder into cached
/// lists, and invalidates the user keys on settle.
pub fn create_user_mutation(client: &Arc<QueryClient>, http: &Http) -> Mutation<NewUser, User> {
    let http = http.clone();
    Mutation::new(Arc::clone(client), move |payload: NewUser| {
        let http = http.clone();
        async move { create_user(&http, &payload).await }
    })
    .validate(NewUser::validate)
    .optimistic(|guard, payload| {
        let placeholder = payload.placeholder(temp_id());
        guard.edit_list(&keys::users::lists(), |users: &mut Vec<User>| {
            users.push(placeholder);
        });
    })
    .invalidates(invalidation::for_resource(Resource::Users))
}

/// Delete-user mutation: drops the user from cached lists immediately.
pub fn delete_user_mutation(client: &Arc<QueryClient>, http: &Http) -> Mutation<i64, ()> {
    let http = http.clone();
    Mutation::new(Arc::clone(client), move |id: i64| {
        let http = http.clone();
        async move { delete_user(&http, id).await }
    })
    .optimistic(|guard, id| {
        let id = *id;
        guard.edit_list(&keys::users::lists(), |users: &mut Vec<User>| {
            users.retain(|user| user.id != id);
        });
        guard.remove(&keys::users::detail(id));
    })
    .invalidates(invalidation::for_resource(Resource::Users))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NewUser {
        NewUser {
            first_name: "New".to_string(),
            last_name: "Customer".to_string(),
            email: "new@x.com".to_string(),
            phone: Some("+15550100".to_string()),
            role: Role::Customer,
            branch: None,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_payload() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_names() {
        let mut p = payload();
        p.first_name = "  ".to_string();
        assert!(matches!(p.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let mut p = payload();
        p.email = "not-an-email".to_string();
        assert!(matches!(p.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_placeholder_carries_payload_fields() {
        let p = payload();
        let user = p.placeholder(-12345);
        assert_eq!(user.id, -12345);
        assert_eq!(user.email, p.email);
        assert_eq!(user.role, Role::Customer);
        assert!(user.is_active);
    }

    #[test]
    fn test_user_update_skips_absent_fields() {
        let update = UserUpdate {
            phone: Some("+15550199".to_string()),
            ..UserUpdate::default()
        };
        let json = serde_json::to_value(&update).expect("should serialize");
        assert_eq!(json, serde_json::json!({"phone": "+15550199"}));
    }
}
