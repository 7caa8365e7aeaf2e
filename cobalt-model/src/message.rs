use crate::snowflake::Snowflake;
use crate::user::User;
use serde::{Deserialize, Serialize};

/// A message in a channel.
///
/// The cache does not retain messages (`MESSAGE_CREATE` is emit-only);
/// this type exists for dispatch and for REST responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    /// Message ID.
    pub id: Snowflake,
    /// Channel the message was sent in.
    pub channel_id: Snowflake,
    /// Guild, absent for DMs.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Author. Absent for some webhook messages.
    #[serde(default)]
    pub author: Option<User>,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// ISO8601 send timestamp.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// ISO8601 edit timestamp.
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    /// Whether this was a TTS message.
    #[serde(default)]
    pub tts: bool,
    /// Whether @everyone was mentioned.
    #[serde(default)]
    pub mention_everyone: bool,
    /// Mentioned users.
    #[serde(default)]
    pub mentions: Vec<User>,
    /// Attached files.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Embedded content.
    #[serde(default)]
    pub embeds: Vec<Embed>,
    /// Whether the message is pinned.
    #[serde(default)]
    pub pinned: bool,
    /// Webhook that produced the message, if any.
    #[serde(default)]
    pub webhook_id: Option<Snowflake>,
}

/// A file attached to a message.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// Rich embed content.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbedMedia {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// `MESSAGE_UPDATE`: partial message, only changed fields present.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageUpdateEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

/// `MESSAGE_DELETE`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// `MESSAGE_DELETE_BULK`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageDeleteBulkEvent {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// `TYPING_START`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypingStartEvent {
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_round_trip() {
        let json = r#"{
            "id": "100",
            "channel_id": "50",
            "author": {"id": "7", "username": "u"},
            "content": "hello",
            "embeds": [{"title": "t", "fields": [{"name": "n", "value": "v"}]}]
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.embeds[0].fields[0].name, "n");

        let back = serde_json::to_string(&msg).unwrap();
        let again: Message = serde_json::from_str(&back).unwrap();
        assert_eq!(again.id, msg.id);
        assert_eq!(again.embeds.len(), 1);
    }

    #[test]
    fn empty_embed_serializes_compact() {
        let embed = Embed::default();
        assert_eq!(serde_json::to_string(&embed).unwrap(), "{}");
    }
}
