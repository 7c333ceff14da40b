//! User administration (requires an account with user-management rights).

use tracing::{debug, instrument, warn};

use super::{decode, extract_id, extract_list, require_body};
use crate::client::TradervueClient;
use crate::error::Result;
use crate::types::{NewUser, ResourceId, User, UserUpdate};

impl TradervueClient {
    #[instrument(parent = self.span(), skip_all)]
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let url = self.url(&["users"]);
        let (resp, payload) = self
            .call(self.get(url), &[200], "Unable to query users", true)
            .await?;

        let users: Vec<User> = extract_list(payload, "users", &resp.url)?;
        debug!(found = users.len(), "Queried users");
        Ok(users)
    }

    #[instrument(parent = self.span(), skip_all)]
    pub async fn get_user(&self, user_id: impl Into<ResourceId>) -> Result<User> {
        let user_id = user_id.into();
        let url = self.url(&["users", user_id.as_str()]);
        let (resp, payload) = self
            .call(
                self.get(url),
                &[200],
                &format!("Unable to query user ID {user_id}"),
                true,
            )
            .await?;
        let payload = require_body(payload, &format!("user ID {user_id}"), &resp.url)?;
        debug!(id = %user_id, "Queried user");
        decode(payload, "user", &resp.url)
    }

    /// Create a user and return the new id.
    #[instrument(parent = self.span(), skip_all, fields(username = %user.username))]
    pub async fn create_user(&self, user: &NewUser) -> Result<ResourceId> {
        let url = self.url(&["users"]);
        let (resp, payload) = self
            .call(
                self.post(url, serde_json::to_value(user)?),
                &[201],
                &format!("New user creation for {}", user.username),
                false,
            )
            .await?;
        let id = extract_id(payload, "user", &resp.url)?;
        debug!(id = %id, username = %user.username, "Created new user");
        Ok(id)
    }

    /// Same contract as `update_trade`: `Ok(false)` when nothing is set.
    #[instrument(parent = self.span(), skip_all)]
    pub async fn update_user(&self, user_id: impl Into<ResourceId>, update: &UserUpdate) -> Result<bool> {
        let user_id = user_id.into();
        if update.plan.is_none() {
            warn!(id = %user_id, "No updates specified for user. Not taking further action");
            return Ok(false);
        }

        let url = self.url(&["users", user_id.as_str()]);
        self.call(
            self.put(url, serde_json::to_value(update)?),
            &[200],
            &format!("Unable to update fields [plan] of user ID {user_id}"),
            false,
        )
        .await?;
        debug!(id = %user_id, "Updated user");
        Ok(true)
    }
}
