use crate::snowflake::Snowflake;
use crate::user::User;
use serde::{Deserialize, Serialize};

/// A channel webhook.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Webhook {
    /// Webhook ID.
    pub id: Snowflake,
    /// Channel the webhook posts to.
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Default name.
    #[serde(default)]
    pub name: Option<String>,
    /// Default avatar hash.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Secure token; only returned to the webhook's creator.
    #[serde(default)]
    pub token: Option<String>,
    /// User that created the webhook.
    #[serde(default)]
    pub user: Option<User>,
}
