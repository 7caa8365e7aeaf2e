use crate::snowflake::Snowflake;
use serde::{Deserialize, Serialize};

/// Discord User representation.
///
/// Users are shared across guilds; the cache holds a single copy per ID.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    /// User ID.
    pub id: Snowflake,
    /// Username (not unique post-pomelo).
    pub username: String,
    /// User's 4-digit Discord tag ("0" for pomelo users).
    #[serde(default)]
    pub discriminator: String,
    /// User's display name.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Avatar hash.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the user is a bot.
    #[serde(default)]
    pub bot: bool,
    /// Whether the user is a system user.
    #[serde(default)]
    pub system: bool,
    /// Public flags on the user.
    #[serde(default)]
    pub public_flags: Option<u64>,
}

impl User {
    /// Returns the URL of the user's avatar, if one is set.
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.as_ref().map(|hash| {
            let ext = if hash.starts_with("a_") { "gif" } else { "png" };
            format!(
                "https://cdn.discordapp.com/avatars/{}/{}.{}",
                self.id, hash, ext
            )
        })
    }
}

/// Partial user carried by presence updates.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartialUser {
    pub id: Snowflake,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_round_trip() {
        let json = r#"{"id":"10","username":"bot","discriminator":"0001","bot":true}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id.get(), 10);
        assert!(user.bot);

        let back = serde_json::to_string(&user).unwrap();
        let again: User = serde_json::from_str(&back).unwrap();
        assert_eq!(again.username, "bot");
    }

    #[test]
    fn animated_avatar_url() {
        let json = r#"{"id":"10","username":"bot","avatar":"a_deadbeef"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.avatar_url().unwrap().ends_with(".gif"));
    }
}
