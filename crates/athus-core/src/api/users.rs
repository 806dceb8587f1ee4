use serde_json::Value;
use tracing::debug;

use super::auth::body_or_null;
use super::client::AuthClient;
use super::ApiError;
use crate::models::{MaybeEnveloped, ProfileUpdate, User};

/// User profile endpoints under `/usuarios`.
#[derive(Clone)]
pub struct UserService {
    client: AuthClient,
}

impl UserService {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    /// Fetch a user by ID
    pub async fn get_user(&self, id: i64) -> Result<User, ApiError> {
        let user = self
            .client
            .get_json::<MaybeEnveloped<User>>(&format!("/usuarios/{}", id))
            .await?
            .into_inner();
        debug!(user_id = user.id, "User fetched");
        Ok(user)
    }

    /// The user cached at login, if any
    pub fn current_user(&self) -> Result<Option<User>, ApiError> {
        Ok(self.client.session().user()?)
    }

    /// Send a partial profile update, then merge it into the cached user
    pub async fn update_user(&self, update: &ProfileUpdate) -> Result<Value, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidRequest("Nothing to update".to_string()));
        }

        let response = self.client.put("/usuarios", update).await?;

        let merged = self
            .client
            .session()
            .update_user(|user| update.apply_to(user))?;
        if let Some(user) = merged {
            debug!(user_id = user.id, "Cached user updated");
        }

        body_or_null(&response.body)
    }
}
