use crate::snowflake::Snowflake;
use crate::user::User;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;

/// Channel type discriminant.
///
/// The cache uses this to decide ownership: guild channel types live in
/// their guild's channel map, `Dm` in the private-channel table, `GroupDm`
/// in the group table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ChannelType {
    /// Text channel within a guild.
    GuildText = 0,
    /// Direct message between two users.
    Dm = 1,
    /// Voice channel within a guild.
    GuildVoice = 2,
    /// Direct message between multiple users.
    GroupDm = 3,
    /// Organizational category.
    GuildCategory = 4,
    /// Announcement channel.
    GuildNews = 5,
    /// Unrecognized type; treated as a guild channel.
    #[serde(other)]
    Unknown = 255,
}

impl ChannelType {
    /// Whether this channel lives outside any guild.
    pub const fn is_private(self) -> bool {
        matches!(self, ChannelType::Dm | ChannelType::GroupDm)
    }
}

/// Who a permission overwrite applies to.
///
/// v10 encodes this as an integer (0 = role, 1 = member); v6 sent the
/// strings `"role"` and `"member"`. Both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteType {
    Role,
    Member,
}

impl Serialize for OverwriteType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            OverwriteType::Role => 0,
            OverwriteType::Member => 1,
        })
    }
}

impl<'de> Deserialize<'de> for OverwriteType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OverwriteTypeVisitor;

        impl serde::de::Visitor<'_> for OverwriteTypeVisitor {
            type Value = OverwriteType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("0, 1, \"role\" or \"member\"")
            }

            fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Self::Value, E> {
                match value {
                    0 => Ok(OverwriteType::Role),
                    1 => Ok(OverwriteType::Member),
                    other => Err(E::custom(format!("unknown overwrite type {other}"))),
                }
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
                match value {
                    "role" => Ok(OverwriteType::Role),
                    "member" => Ok(OverwriteType::Member),
                    other => Err(E::custom(format!("unknown overwrite type {other:?}"))),
                }
            }
        }

        deserializer.deserialize_any(OverwriteTypeVisitor)
    }
}

/// Permission overwrite on a guild channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    /// Role or user ID.
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: OverwriteType,
    /// Allowed permission bits, stringified.
    #[serde(default)]
    pub allow: Option<String>,
    /// Denied permission bits, stringified.
    #[serde(default)]
    pub deny: Option<String>,
}

/// A Discord channel of any kind.
///
/// Guild channels, DMs, and group DMs all arrive over the same wire shape;
/// `kind` decides which fields are meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Channel ID.
    pub id: Snowflake,
    /// Channel type.
    #[serde(rename = "type")]
    pub kind: ChannelType,
    /// Owning guild, absent for DMs and groups.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Channel name (absent for DMs).
    #[serde(default)]
    pub name: Option<String>,
    /// Sorting position within the guild.
    #[serde(default)]
    pub position: Option<i64>,
    /// Channel topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Whether the channel is age-restricted.
    #[serde(default)]
    pub nsfw: bool,
    /// ID of the last message sent.
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
    /// Voice bitrate.
    #[serde(default)]
    pub bitrate: Option<u32>,
    /// Voice user limit.
    #[serde(default)]
    pub user_limit: Option<u32>,
    /// Slowmode interval in seconds.
    #[serde(default)]
    pub rate_limit_per_user: Option<u32>,
    /// DM / group DM recipients.
    #[serde(default)]
    pub recipients: Vec<User>,
    /// Group DM icon hash.
    #[serde(default)]
    pub icon: Option<String>,
    /// Group DM owner.
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    /// Parent category.
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    /// Permission overwrites.
    #[serde(default)]
    pub permission_overwrites: Vec<PermissionOverwrite>,
}

impl Channel {
    /// The single DM recipient, when this is a direct-message channel.
    pub fn recipient(&self) -> Option<&User> {
        if self.kind == ChannelType::Dm {
            self.recipients.first()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_type_decides_ownership() {
        assert!(ChannelType::Dm.is_private());
        assert!(ChannelType::GroupDm.is_private());
        assert!(!ChannelType::GuildText.is_private());
        assert!(!ChannelType::Unknown.is_private());
    }

    #[test]
    fn unknown_channel_type_does_not_fail() {
        let json = r#"{"id":"1","type":42}"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.kind, ChannelType::Unknown);
    }

    #[test]
    fn dm_recipient() {
        let json = r#"{"id":"5","type":1,"recipients":[{"id":"9","username":"friend"}]}"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.recipient().unwrap().id.get(), 9);
    }

    #[test]
    fn overwrite_type_accepts_both_encodings() {
        let v10: PermissionOverwrite =
            serde_json::from_str(r#"{"id":"1","type":0,"allow":"1024"}"#).unwrap();
        assert_eq!(v10.kind, OverwriteType::Role);

        let v6: PermissionOverwrite =
            serde_json::from_str(r#"{"id":"1","type":"member"}"#).unwrap();
        assert_eq!(v6.kind, OverwriteType::Member);
    }
}
