//! Guild, member, and role endpoints.

use crate::error::HttpError;
use crate::HttpClient;
use cobalt_model::{Channel, ChannelType, Guild, GuildMember, Role, Snowflake};
use serde::Serialize;

/// Parameters for editing a guild. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditGuild {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afk_channel_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afk_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_level: Option<u8>,
}

/// Parameters for creating or editing a role.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentionable: Option<bool>,
}

impl HttpClient {
    // =========================================================================
    // Guild operations
    // =========================================================================

    /// Get a guild.
    pub async fn get_guild(&self, guild_id: Snowflake) -> Result<Guild, HttpError> {
        let route = format!("/guilds/{guild_id}");
        self.get(&route).await
    }

    /// Edit a guild.
    pub async fn edit_guild(
        &self,
        guild_id: Snowflake,
        params: &EditGuild,
        reason: Option<&str>,
    ) -> Result<Guild, HttpError> {
        let route = format!("/guilds/{guild_id}");
        self.patch_with_reason(&route, params, reason).await
    }

    /// Leave a guild.
    pub async fn leave_guild(&self, guild_id: Snowflake) -> Result<(), HttpError> {
        let route = format!("/users/@me/guilds/{guild_id}");
        self.delete(&route, None).await
    }

    /// Get a guild's channels.
    pub async fn get_guild_channels(
        &self,
        guild_id: Snowflake,
    ) -> Result<Vec<Channel>, HttpError> {
        let route = format!("/guilds/{guild_id}/channels");
        self.get(&route).await
    }

    /// Create a channel in a guild.
    pub async fn create_guild_channel(
        &self,
        guild_id: Snowflake,
        name: impl Into<String>,
        kind: ChannelType,
        reason: Option<&str>,
    ) -> Result<Channel, HttpError> {
        #[derive(Serialize)]
        struct CreateChannel {
            name: String,
            #[serde(rename = "type")]
            kind: ChannelType,
        }

        let route = format!("/guilds/{guild_id}/channels");
        self.post_with_reason(
            &route,
            &CreateChannel {
                name: name.into(),
                kind,
            },
            reason,
        )
        .await
    }

    // =========================================================================
    // Member operations
    // =========================================================================

    /// Get a guild member.
    pub async fn get_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> Result<GuildMember, HttpError> {
        let route = format!("/guilds/{guild_id}/members/{user_id}");
        self.get(&route).await
    }

    /// List guild members. `after` pages by user ID.
    pub async fn list_members(
        &self,
        guild_id: Snowflake,
        limit: u16,
        after: Option<Snowflake>,
    ) -> Result<Vec<GuildMember>, HttpError> {
        let route = match after {
            Some(after) => format!("/guilds/{guild_id}/members?limit={limit}&after={after}"),
            None => format!("/guilds/{guild_id}/members?limit={limit}"),
        };
        self.get(&route).await
    }

    /// Remove a member from a guild.
    pub async fn kick_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), HttpError> {
        let route = format!("/guilds/{guild_id}/members/{user_id}");
        self.delete(&route, reason).await
    }

    /// Ban a member, optionally purging their recent messages.
    pub async fn ban_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        delete_message_days: u8,
        reason: Option<&str>,
    ) -> Result<(), HttpError> {
        #[derive(Serialize)]
        struct CreateBan {
            delete_message_days: u8,
        }

        let route = format!("/guilds/{guild_id}/bans/{user_id}");
        self.put_json(
            &route,
            &CreateBan {
                delete_message_days,
            },
            reason,
        )
        .await
    }

    /// Remove a ban.
    pub async fn unban_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), HttpError> {
        let route = format!("/guilds/{guild_id}/bans/{user_id}");
        self.delete(&route, reason).await
    }

    // =========================================================================
    // Role operations
    // =========================================================================

    /// Create a role.
    pub async fn create_role(
        &self,
        guild_id: Snowflake,
        params: &EditRole,
        reason: Option<&str>,
    ) -> Result<Role, HttpError> {
        let route = format!("/guilds/{guild_id}/roles");
        self.post_with_reason(&route, params, reason).await
    }

    /// Edit a role.
    pub async fn edit_role(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
        params: &EditRole,
        reason: Option<&str>,
    ) -> Result<Role, HttpError> {
        let route = format!("/guilds/{guild_id}/roles/{role_id}");
        self.patch_with_reason(&route, params, reason).await
    }

    /// Delete a role.
    pub async fn delete_role(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), HttpError> {
        let route = format!("/guilds/{guild_id}/roles/{role_id}");
        self.delete(&route, reason).await
    }

    /// Give a member a role.
    pub async fn add_member_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), HttpError> {
        let route = format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}");
        self.put(&route, reason).await
    }

    /// Take a role from a member.
    pub async fn remove_member_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), HttpError> {
        let route = format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}");
        self.delete(&route, reason).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_guild_skips_unset_fields() {
        let params = EditGuild {
            name: Some("renamed".to_string()),
            ..EditGuild::default()
        };
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"name":"renamed"}"#
        );
    }
}
