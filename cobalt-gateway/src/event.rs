//! Dispatch event parsing.
//!
//! Op-0 frames carry an event name (`t`) and payload (`d`); this module
//! turns them into typed [`Event`]s. Names the library does not model map
//! to [`Event::Unknown`] with the raw JSON preserved, so new server events
//! never break the read loop.

use crate::error::GatewayError;
use crate::payload::Ready;
use cobalt_model::{
    Channel, Guild, GuildBanEvent, GuildMemberAddEvent, GuildMemberRemoveEvent,
    GuildMemberUpdateEvent, GuildMembersChunkEvent, GuildRoleDeleteEvent, GuildRoleEvent, Message,
    MessageDeleteBulkEvent, MessageDeleteEvent, MessageUpdateEvent, PresenceUpdateEvent,
    TypingStartEvent, UnavailableGuild, User, VoiceServerUpdateEvent, VoiceState,
};
use serde_json::value::RawValue;

/// A parsed Gateway dispatch event.
///
/// Large payloads are boxed to keep the enum small on the channel.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Event {
    // =========================================================================
    // Connection events
    // =========================================================================
    /// Received after successful Identify.
    Ready(Box<Ready>),

    /// Received after successful Resume; missed dispatches precede it.
    Resumed,

    // =========================================================================
    // Guild events
    // =========================================================================
    /// Lazy-load for an unavailable guild, or guild joined.
    GuildCreate(Box<Guild>),

    /// Guild settings changed; fields merge into the cached guild.
    GuildUpdate(Box<Guild>),

    /// Guild became unavailable, or the bot was removed.
    GuildDelete(UnavailableGuild),

    /// User was banned from a guild.
    GuildBanAdd(GuildBanEvent),

    /// User was unbanned from a guild.
    GuildBanRemove(GuildBanEvent),

    // =========================================================================
    // Member events
    // =========================================================================
    /// New member joined a guild.
    GuildMemberAdd(Box<GuildMemberAddEvent>),

    /// Member left or was removed from a guild.
    GuildMemberRemove(GuildMemberRemoveEvent),

    /// Member was updated.
    GuildMemberUpdate(Box<GuildMemberUpdateEvent>),

    /// Response to a Request Guild Members command.
    GuildMembersChunk(Box<GuildMembersChunkEvent>),

    // =========================================================================
    // Role events
    // =========================================================================
    /// Role was created.
    GuildRoleCreate(GuildRoleEvent),

    /// Role was updated.
    GuildRoleUpdate(GuildRoleEvent),

    /// Role was deleted.
    GuildRoleDelete(GuildRoleDeleteEvent),

    // =========================================================================
    // Channel events
    // =========================================================================
    /// Channel was created (guild channel, DM, or group DM).
    ChannelCreate(Box<Channel>),

    /// Channel was updated.
    ChannelUpdate(Box<Channel>),

    /// Channel was deleted.
    ChannelDelete(Box<Channel>),

    // =========================================================================
    // Message events
    // =========================================================================
    /// Message was sent. Emit-only; not cached.
    MessageCreate(Box<Message>),

    /// Message was edited.
    MessageUpdate(Box<MessageUpdateEvent>),

    /// Message was deleted.
    MessageDelete(MessageDeleteEvent),

    /// Multiple messages were deleted at once.
    MessageDeleteBulk(MessageDeleteBulkEvent),

    /// A user started typing.
    TypingStart(TypingStartEvent),

    // =========================================================================
    // User & presence events
    // =========================================================================
    /// A user's presence changed. Emit-only.
    PresenceUpdate(Box<PresenceUpdateEvent>),

    /// The current user was updated.
    UserUpdate(Box<User>),

    // =========================================================================
    // Voice events
    // =========================================================================
    /// A user's voice state changed.
    VoiceStateUpdate(Box<VoiceState>),

    /// Voice server credentials; forwarded to the voice subsystem.
    VoiceServerUpdate(VoiceServerUpdateEvent),

    // =========================================================================
    // Forward compatibility
    // =========================================================================
    /// An event this library does not model.
    Unknown {
        /// The `t` value as received.
        name: String,
        /// The raw `d` payload.
        data: Box<RawValue>,
    },
}

impl Event {
    /// The upstream event name.
    pub fn name(&self) -> &str {
        match self {
            Event::Ready(_) => "READY",
            Event::Resumed => "RESUMED",
            Event::GuildCreate(_) => "GUILD_CREATE",
            Event::GuildUpdate(_) => "GUILD_UPDATE",
            Event::GuildDelete(_) => "GUILD_DELETE",
            Event::GuildBanAdd(_) => "GUILD_BAN_ADD",
            Event::GuildBanRemove(_) => "GUILD_BAN_REMOVE",
            Event::GuildMemberAdd(_) => "GUILD_MEMBER_ADD",
            Event::GuildMemberRemove(_) => "GUILD_MEMBER_REMOVE",
            Event::GuildMemberUpdate(_) => "GUILD_MEMBER_UPDATE",
            Event::GuildMembersChunk(_) => "GUILD_MEMBERS_CHUNK",
            Event::GuildRoleCreate(_) => "GUILD_ROLE_CREATE",
            Event::GuildRoleUpdate(_) => "GUILD_ROLE_UPDATE",
            Event::GuildRoleDelete(_) => "GUILD_ROLE_DELETE",
            Event::ChannelCreate(_) => "CHANNEL_CREATE",
            Event::ChannelUpdate(_) => "CHANNEL_UPDATE",
            Event::ChannelDelete(_) => "CHANNEL_DELETE",
            Event::MessageCreate(_) => "MESSAGE_CREATE",
            Event::MessageUpdate(_) => "MESSAGE_UPDATE",
            Event::MessageDelete(_) => "MESSAGE_DELETE",
            Event::MessageDeleteBulk(_) => "MESSAGE_DELETE_BULK",
            Event::TypingStart(_) => "TYPING_START",
            Event::PresenceUpdate(_) => "PRESENCE_UPDATE",
            Event::UserUpdate(_) => "USER_UPDATE",
            Event::VoiceStateUpdate(_) => "VOICE_STATE_UPDATE",
            Event::VoiceServerUpdate(_) => "VOICE_SERVER_UPDATE",
            Event::Unknown { name, .. } => name,
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(data: &RawValue) -> Result<T, GatewayError> {
    serde_json::from_str(data.get()).map_err(|e| GatewayError::Protocol(e.to_string()))
}

/// Parse a dispatch payload into a typed [`Event`].
///
/// # Errors
/// Returns [`GatewayError::Protocol`] when a known event's payload does not
/// match its schema. Unknown event names are not an error.
pub fn parse_event(name: &str, data: &RawValue) -> Result<Event, GatewayError> {
    let event = match name {
        "READY" => Event::Ready(Box::new(parse(data)?)),
        "RESUMED" => Event::Resumed,
        "GUILD_CREATE" => Event::GuildCreate(Box::new(parse(data)?)),
        "GUILD_UPDATE" => Event::GuildUpdate(Box::new(parse(data)?)),
        "GUILD_DELETE" => Event::GuildDelete(parse(data)?),
        "GUILD_BAN_ADD" => Event::GuildBanAdd(parse(data)?),
        "GUILD_BAN_REMOVE" => Event::GuildBanRemove(parse(data)?),
        "GUILD_MEMBER_ADD" => Event::GuildMemberAdd(Box::new(parse(data)?)),
        "GUILD_MEMBER_REMOVE" => Event::GuildMemberRemove(parse(data)?),
        "GUILD_MEMBER_UPDATE" => Event::GuildMemberUpdate(Box::new(parse(data)?)),
        "GUILD_MEMBERS_CHUNK" => Event::GuildMembersChunk(Box::new(parse(data)?)),
        "GUILD_ROLE_CREATE" => Event::GuildRoleCreate(parse(data)?),
        "GUILD_ROLE_UPDATE" => Event::GuildRoleUpdate(parse(data)?),
        "GUILD_ROLE_DELETE" => Event::GuildRoleDelete(parse(data)?),
        "CHANNEL_CREATE" => Event::ChannelCreate(Box::new(parse(data)?)),
        "CHANNEL_UPDATE" => Event::ChannelUpdate(Box::new(parse(data)?)),
        "CHANNEL_DELETE" => Event::ChannelDelete(Box::new(parse(data)?)),
        "MESSAGE_CREATE" => Event::MessageCreate(Box::new(parse(data)?)),
        "MESSAGE_UPDATE" => Event::MessageUpdate(Box::new(parse(data)?)),
        "MESSAGE_DELETE" => Event::MessageDelete(parse(data)?),
        "MESSAGE_DELETE_BULK" => Event::MessageDeleteBulk(parse(data)?),
        "TYPING_START" => Event::TypingStart(parse(data)?),
        "PRESENCE_UPDATE" => Event::PresenceUpdate(Box::new(parse(data)?)),
        "USER_UPDATE" => Event::UserUpdate(Box::new(parse(data)?)),
        "VOICE_STATE_UPDATE" => Event::VoiceStateUpdate(Box::new(parse(data)?)),
        "VOICE_SERVER_UPDATE" => Event::VoiceServerUpdate(parse(data)?),
        _ => Event::Unknown {
            name: name.to_string(),
            data: RawValue::from_string(data.get().to_string())
                .map_err(|e| GatewayError::Protocol(e.to_string()))?,
        },
    };

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    #[test]
    fn parses_ready() {
        let data = raw(
            r#"{"v":10,"user":{"id":"10","username":"bot"},"guilds":[{"id":"20","unavailable":true}],"session_id":"s1","resume_gateway_url":"wss://resume.example"}"#,
        );
        let event = parse_event("READY", &data).unwrap();
        match event {
            Event::Ready(ready) => {
                assert_eq!(ready.session_id, "s1");
                assert_eq!(ready.guilds.len(), 1);
            }
            other => panic!("expected Ready, got {}", other.name()),
        }
    }

    #[test]
    fn parses_message_create() {
        let data = raw(
            r#"{"id":"100","channel_id":"50","author":{"id":"7","username":"u"},"content":"hi"}"#,
        );
        let event = parse_event("MESSAGE_CREATE", &data).unwrap();
        assert_eq!(event.name(), "MESSAGE_CREATE");
    }

    #[test]
    fn unknown_event_is_preserved_not_rejected() {
        let data = raw(r#"{"whatever":[1,2,3]}"#);
        let event = parse_event("SOME_FUTURE_EVENT", &data).unwrap();
        match event {
            Event::Unknown { name, data } => {
                assert_eq!(name, "SOME_FUTURE_EVENT");
                assert_eq!(data.get(), r#"{"whatever":[1,2,3]}"#);
            }
            other => panic!("expected Unknown, got {}", other.name()),
        }
    }

    #[test]
    fn malformed_known_event_is_a_protocol_error() {
        let data = raw(r#"{"not_a_ready": true}"#);
        let err = parse_event("READY", &data).unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
    }
}
