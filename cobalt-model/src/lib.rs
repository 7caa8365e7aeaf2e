//! Cobalt Model - Core types for the Discord API
#![deny(unsafe_code)]
//!
//! This crate provides the entity and wire types shared by the gateway,
//! HTTP, and cache crates. All types follow the Discord API v10
//! specification; the v6 legacy surface only differs at the transport
//! layer ([`ApiVersion`]) and is handled by the defaulted optional fields.

pub mod channel;
pub mod guild;
pub mod intents;
pub mod invite;
pub mod message;
pub mod presence;
pub mod snowflake;
pub mod user;
pub mod version;
pub mod voice;
pub mod webhook;

pub use channel::{Channel, ChannelType, OverwriteType, PermissionOverwrite};
pub use guild::{
    Guild, GuildBanEvent, GuildMember, GuildMemberAddEvent, GuildMemberRemoveEvent,
    GuildMemberUpdateEvent, GuildMembersChunkEvent, GuildRoleDeleteEvent, GuildRoleEvent, Role,
    UnavailableGuild,
};
pub use intents::Intents;
pub use invite::Invite;
pub use message::{
    Attachment, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia, Message,
    MessageDeleteBulkEvent, MessageDeleteEvent, MessageUpdateEvent, TypingStartEvent,
};
pub use presence::{Activity, ActivityType, ClientStatus, PresenceUpdateEvent, StatusType};
pub use snowflake::Snowflake;
pub use user::{PartialUser, User};
pub use version::ApiVersion;
pub use voice::{VoiceServerUpdateEvent, VoiceState};
pub use webhook::Webhook;
