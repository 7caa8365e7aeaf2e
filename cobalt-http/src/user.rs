//! User and DM endpoints.

use crate::error::HttpError;
use crate::HttpClient;
use cobalt_model::{Channel, Snowflake, User};
use serde::Serialize;

impl HttpClient {
    /// Get the current bot user.
    pub async fn get_current_user(&self) -> Result<User, HttpError> {
        self.get("/users/@me").await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: Snowflake) -> Result<User, HttpError> {
        let route = format!("/users/{user_id}");
        self.get(&route).await
    }

    /// Open (or fetch the existing) DM channel with a user.
    ///
    /// The server deduplicates DMs per recipient; the cache mirrors that
    /// with its recipient index.
    pub async fn create_dm(&self, recipient_id: Snowflake) -> Result<Channel, HttpError> {
        #[derive(Serialize)]
        struct CreateDm {
            recipient_id: Snowflake,
        }

        self.post("/users/@me/channels", &CreateDm { recipient_id })
            .await
    }
}
