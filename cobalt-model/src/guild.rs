use crate::channel::Channel;
use crate::presence::PresenceUpdateEvent;
use crate::snowflake::Snowflake;
use crate::user::User;
use crate::voice::VoiceState;
use serde::{Deserialize, Serialize};

/// Discord Guild (server) representation.
///
/// `GUILD_CREATE` is the only payload that carries the full channel,
/// member, and voice-state lists; other guild payloads leave them empty.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Guild {
    /// Guild ID.
    pub id: Snowflake,
    /// Guild name (2-100 characters).
    #[serde(default)]
    pub name: String,
    /// Icon hash.
    #[serde(default)]
    pub icon: Option<String>,
    /// ID of the owner.
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    /// ID of the AFK voice channel.
    #[serde(default)]
    pub afk_channel_id: Option<Snowflake>,
    /// AFK timeout in seconds.
    #[serde(default)]
    pub afk_timeout: Option<u32>,
    /// Verification level required.
    #[serde(default)]
    pub verification_level: Option<u8>,
    /// Whether this is a large guild (member list not pushed eagerly).
    #[serde(default)]
    pub large: bool,
    /// Whether the guild is currently unavailable (outage).
    #[serde(default)]
    pub unavailable: bool,
    /// Total member count (only in `GUILD_CREATE`).
    #[serde(default)]
    pub member_count: Option<u64>,
    /// When the current user joined (only in `GUILD_CREATE`).
    #[serde(default)]
    pub joined_at: Option<String>,
    /// Roles in the guild.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Channels (only in `GUILD_CREATE`).
    #[serde(default)]
    pub channels: Vec<Channel>,
    /// Members (only in `GUILD_CREATE`, capped by the large threshold).
    #[serde(default)]
    pub members: Vec<GuildMember>,
    /// Voice states (only in `GUILD_CREATE`).
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
    /// Presences (only in `GUILD_CREATE`).
    #[serde(default)]
    pub presences: Vec<PresenceUpdateEvent>,
}

impl Guild {
    /// Returns the URL of the guild's icon.
    #[must_use]
    pub fn icon_url(&self) -> Option<String> {
        self.icon.as_ref().map(|hash| {
            let ext = if hash.starts_with("a_") { "gif" } else { "png" };
            format!(
                "https://cdn.discordapp.com/icons/{}/{}.{}",
                self.id, hash, ext
            )
        })
    }
}

/// A guild the gateway has announced but not yet delivered.
///
/// `READY` lists every guild this way; each is promoted to a full [`Guild`]
/// by its `GUILD_CREATE`. `GUILD_DELETE` reuses the shape: `unavailable`
/// set means an outage, absent means the bot was removed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

/// A guild role.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Role {
    /// Role ID.
    pub id: Snowflake,
    /// Role name.
    pub name: String,
    /// RGB color value.
    #[serde(default)]
    pub color: u32,
    /// Whether the role is pinned in the member list.
    #[serde(default)]
    pub hoist: bool,
    /// Sorting position.
    #[serde(default)]
    pub position: i64,
    /// Permission bits, stringified in v10.
    #[serde(default)]
    pub permissions: Option<String>,
    /// Whether an integration manages this role.
    #[serde(default)]
    pub managed: bool,
    /// Whether the role is mentionable.
    #[serde(default)]
    pub mentionable: bool,
}

/// A member of a guild.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMember {
    /// The underlying user. Absent in `MESSAGE_CREATE` partials.
    #[serde(default)]
    pub user: Option<User>,
    /// Guild-specific nickname.
    #[serde(default)]
    pub nick: Option<String>,
    /// IDs of the member's roles.
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    /// When the member joined.
    #[serde(default)]
    pub joined_at: Option<String>,
    /// Whether the member is server-deafened.
    #[serde(default)]
    pub deaf: bool,
    /// Whether the member is server-muted.
    #[serde(default)]
    pub mute: bool,
}

/// `GUILD_MEMBER_ADD`: a member object with the guild ID flattened in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMemberAddEvent {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: GuildMember,
}

/// `GUILD_MEMBER_REMOVE`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMemberRemoveEvent {
    pub guild_id: Snowflake,
    pub user: User,
}

/// `GUILD_MEMBER_UPDATE`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMemberUpdateEvent {
    pub guild_id: Snowflake,
    pub user: User,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub joined_at: Option<String>,
}

/// `GUILD_MEMBERS_CHUNK`: response to a request-members command.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildMembersChunkEvent {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<GuildMember>,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(default)]
    pub chunk_count: u32,
}

/// `GUILD_BAN_ADD` / `GUILD_BAN_REMOVE`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildBanEvent {
    pub guild_id: Snowflake,
    pub user: User,
}

/// `GUILD_ROLE_CREATE` / `GUILD_ROLE_UPDATE`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildRoleEvent {
    pub guild_id: Snowflake,
    pub role: Role,
}

/// `GUILD_ROLE_DELETE`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuildRoleDeleteEvent {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_create_payload() {
        let json = r#"{
            "id": "20",
            "name": "test guild",
            "large": true,
            "member_count": 3,
            "roles": [{"id": "21", "name": "@everyone"}],
            "channels": [{"id": "22", "type": 0, "name": "general"}]
        }"#;
        let guild: Guild = serde_json::from_str(json).unwrap();
        assert_eq!(guild.id.get(), 20);
        assert_eq!(guild.roles.len(), 1);
        assert_eq!(guild.channels.len(), 1);
        assert!(!guild.unavailable);
    }

    #[test]
    fn unavailable_guild_defaults() {
        // GUILD_DELETE for a removal carries no "unavailable" field
        let removed: UnavailableGuild = serde_json::from_str(r#"{"id":"20"}"#).unwrap();
        assert!(!removed.unavailable);

        let outage: UnavailableGuild =
            serde_json::from_str(r#"{"id":"20","unavailable":true}"#).unwrap();
        assert!(outage.unavailable);
    }

    #[test]
    fn member_add_flattens_guild_id() {
        let json = r#"{"guild_id":"20","user":{"id":"7","username":"u"},"roles":["21"]}"#;
        let event: GuildMemberAddEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.guild_id.get(), 20);
        assert_eq!(event.member.user.as_ref().unwrap().id.get(), 7);
    }
}
