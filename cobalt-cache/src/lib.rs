//! Cobalt Cache - In-memory cache for Discord entities.
#![deny(unsafe_code)]
//!
//! The cache applies the mutation half of event dispatch: each shard's
//! loop feeds its events through [`InMemoryCache::update`] before
//! listeners run, so listeners always observe post-mutation state.
//!
//! Ownership invariant: every channel ID known to the cache lives in
//! exactly one place, decided by its type: its guild's channel map, the
//! DM table, or the group table. DMs are additionally indexed by
//! recipient so re-opened conversations deduplicate.
//!
//! Writers are the per-shard dispatch tasks; readers get cloned
//! snapshots. DashMap's per-entry locking means a reader sees an entity
//! either before or after a mutation, never torn.

use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use cobalt_gateway::Event;
use cobalt_model::{
    Channel, ChannelType, Guild, GuildMember, Role, Snowflake, User, VoiceState,
};

/// A guild with its owned entity maps.
#[derive(Debug, Clone)]
pub struct CachedGuild {
    /// Base guild fields. The bulk lists are drained into the maps below.
    pub guild: Guild,
    /// Channels owned by this guild.
    pub channels: HashMap<Snowflake, Channel>,
    /// Members, keyed by user ID.
    pub members: HashMap<Snowflake, GuildMember>,
    /// Roles, keyed by role ID.
    pub roles: HashMap<Snowflake, Role>,
    /// Voice states, keyed by user ID.
    pub voice_states: HashMap<Snowflake, VoiceState>,
    /// The shard that delivered this guild.
    pub shard_id: u16,
}

impl CachedGuild {
    fn from_payload(mut guild: Guild, shard_id: u16) -> Self {
        let mut channels = HashMap::with_capacity(guild.channels.len());
        for mut channel in guild.channels.drain(..) {
            channel.guild_id.get_or_insert(guild.id);
            channels.insert(channel.id, channel);
        }

        let mut members = HashMap::with_capacity(guild.members.len());
        for member in guild.members.drain(..) {
            if let Some(user) = &member.user {
                members.insert(user.id, member);
            }
        }

        let roles = guild.roles.drain(..).map(|r| (r.id, r)).collect();

        let mut voice_states = HashMap::with_capacity(guild.voice_states.len());
        for state in guild.voice_states.drain(..) {
            voice_states.insert(state.user_id, state);
        }

        guild.presences.clear();

        Self {
            guild,
            channels,
            members,
            roles,
            voice_states,
            shard_id,
        }
    }

    /// Guild ID.
    pub fn id(&self) -> Snowflake {
        self.guild.id
    }
}

/// In-memory cache for guilds, channels, members, and users.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    /// The bot's own user, from READY / USER_UPDATE.
    current_user: RwLock<Option<User>>,

    /// Full guilds, keyed by guild ID.
    guilds: DashMap<Snowflake, CachedGuild>,

    /// Guilds announced but not yet (or no longer) delivered.
    unavailable_guilds: DashSet<Snowflake>,

    /// Guild-channel ownership index: channel ID to guild ID.
    channel_guild: DashMap<Snowflake, Snowflake>,

    /// Direct messages, keyed by channel ID.
    dms: DashMap<Snowflake, Channel>,

    /// DM dedup index: recipient user ID to channel ID.
    dm_by_recipient: DashMap<Snowflake, Snowflake>,

    /// Group DMs, keyed by channel ID.
    groups: DashMap<Snowflake, Channel>,

    /// Shared users; weakly held, lookup only.
    users: DashMap<Snowflake, Arc<User>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// The bot's own user.
    pub fn current_user(&self) -> Option<User> {
        self.current_user.read().clone()
    }

    /// A guild snapshot.
    pub fn guild(&self, guild_id: Snowflake) -> Option<CachedGuild> {
        self.guilds.get(&guild_id).map(|g| g.clone())
    }

    /// Whether a guild is known but unavailable.
    pub fn is_unavailable(&self, guild_id: Snowflake) -> bool {
        self.unavailable_guilds.contains(&guild_id)
    }

    /// IDs of all unavailable guilds.
    pub fn unavailable_guilds(&self) -> Vec<Snowflake> {
        self.unavailable_guilds.iter().map(|id| *id).collect()
    }

    /// Number of fully cached guilds.
    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    /// Look up any channel: guild channel, DM, or group DM.
    pub fn channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if let Some(guild_id) = self.channel_guild.get(&channel_id).map(|g| *g) {
            return self
                .guilds
                .get(&guild_id)
                .and_then(|g| g.channels.get(&channel_id).cloned());
        }
        if let Some(dm) = self.dms.get(&channel_id) {
            return Some(dm.clone());
        }
        self.groups.get(&channel_id).map(|g| g.clone())
    }

    /// The guild owning a channel, if it is a guild channel.
    pub fn channel_guild_id(&self, channel_id: Snowflake) -> Option<Snowflake> {
        self.channel_guild.get(&channel_id).map(|g| *g)
    }

    /// The DM channel with a user, if one is open.
    pub fn dm_channel(&self, recipient_id: Snowflake) -> Option<Channel> {
        let channel_id = *self.dm_by_recipient.get(&recipient_id)?;
        self.dms.get(&channel_id).map(|c| c.clone())
    }

    /// A shared user handle.
    pub fn user(&self, user_id: Snowflake) -> Option<Arc<User>> {
        self.users.get(&user_id).map(|u| u.clone())
    }

    /// A guild member snapshot.
    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<GuildMember> {
        self.guilds
            .get(&guild_id)
            .and_then(|g| g.members.get(&user_id).cloned())
    }

    /// A role snapshot.
    pub fn role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role> {
        self.guilds
            .get(&guild_id)
            .and_then(|g| g.roles.get(&role_id).cloned())
    }

    // =========================================================================
    // Writers
    // =========================================================================

    /// Mark every guild owned by a shard unavailable, keeping its data.
    ///
    /// Used when a shard is killed; the replacement shard's READY and
    /// GUILD_CREATEs restore availability.
    pub fn mark_shard_unavailable(&self, shard_id: u16) {
        for mut entry in self.guilds.iter_mut() {
            if entry.shard_id == shard_id {
                entry.guild.unavailable = true;
                self.unavailable_guilds.insert(entry.id());
            }
        }
    }

    /// Apply the cache mutation for one dispatch event.
    ///
    /// Must be called from the delivering shard's dispatch task, before
    /// listeners are notified.
    pub fn update(&self, shard_id: u16, event: &Event) {
        match event {
            Event::Ready(ready) => {
                *self.current_user.write() = Some(ready.user.clone());
                self.users
                    .insert(ready.user.id, Arc::new(ready.user.clone()));
                for guild in &ready.guilds {
                    self.unavailable_guilds.insert(guild.id);
                }
            }

            Event::GuildCreate(guild) => self.insert_guild((**guild).clone(), shard_id),

            Event::GuildUpdate(guild) => self.merge_guild(guild, shard_id),

            Event::GuildDelete(unavailable) => {
                if unavailable.unavailable {
                    // Outage: demote, keep the data for when it returns.
                    self.unavailable_guilds.insert(unavailable.id);
                    if let Some(mut entry) = self.guilds.get_mut(&unavailable.id) {
                        entry.guild.unavailable = true;
                    }
                } else {
                    self.remove_guild(unavailable.id);
                }
            }

            Event::ChannelCreate(channel) | Event::ChannelUpdate(channel) => {
                self.insert_channel((**channel).clone());
            }

            Event::ChannelDelete(channel) => self.remove_channel(channel),

            Event::GuildMemberAdd(event) => {
                if let Some(user) = &event.member.user {
                    self.users.insert(user.id, Arc::new(user.clone()));
                    if let Some(mut guild) = self.guilds.get_mut(&event.guild_id) {
                        guild.members.insert(user.id, event.member.clone());
                        if let Some(count) = guild.guild.member_count.as_mut() {
                            *count += 1;
                        }
                    }
                }
            }

            Event::GuildMemberRemove(event) => {
                if let Some(mut guild) = self.guilds.get_mut(&event.guild_id) {
                    guild.members.remove(&event.user.id);
                    if let Some(count) = guild.guild.member_count.as_mut() {
                        *count = count.saturating_sub(1);
                    }
                }
            }

            Event::GuildMemberUpdate(event) => {
                self.users
                    .insert(event.user.id, Arc::new(event.user.clone()));
                if let Some(mut guild) = self.guilds.get_mut(&event.guild_id) {
                    if let Some(member) = guild.members.get_mut(&event.user.id) {
                        member.user = Some(event.user.clone());
                        member.roles = event.roles.clone();
                        member.nick = event.nick.clone();
                        if event.joined_at.is_some() {
                            member.joined_at = event.joined_at.clone();
                        }
                    }
                }
            }

            Event::GuildMembersChunk(chunk) => {
                if let Some(mut guild) = self.guilds.get_mut(&chunk.guild_id) {
                    for member in &chunk.members {
                        if let Some(user) = &member.user {
                            self.users.insert(user.id, Arc::new(user.clone()));
                            guild.members.insert(user.id, member.clone());
                        }
                    }
                }
            }

            Event::GuildRoleCreate(event) | Event::GuildRoleUpdate(event) => {
                if let Some(mut guild) = self.guilds.get_mut(&event.guild_id) {
                    guild.roles.insert(event.role.id, event.role.clone());
                }
            }

            Event::GuildRoleDelete(event) => {
                if let Some(mut guild) = self.guilds.get_mut(&event.guild_id) {
                    guild.roles.remove(&event.role_id);
                    for member in guild.members.values_mut() {
                        member.roles.retain(|r| *r != event.role_id);
                    }
                }
            }

            Event::MessageCreate(message) => {
                // Messages are not retained; only the channel's last-message
                // pointer moves.
                if let Some(guild_id) = self
                    .channel_guild
                    .get(&message.channel_id)
                    .map(|g| *g)
                {
                    if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
                        if let Some(channel) = guild.channels.get_mut(&message.channel_id) {
                            channel.last_message_id = Some(message.id);
                        }
                    }
                } else if let Some(mut dm) = self.dms.get_mut(&message.channel_id) {
                    dm.last_message_id = Some(message.id);
                } else if let Some(mut group) = self.groups.get_mut(&message.channel_id) {
                    group.last_message_id = Some(message.id);
                } else {
                    trace!(
                        channel_id = %message.channel_id,
                        "message in a channel the cache has not seen"
                    );
                }
            }

            Event::UserUpdate(user) => {
                *self.current_user.write() = Some((**user).clone());
                self.users.insert(user.id, Arc::new((**user).clone()));
            }

            Event::VoiceStateUpdate(state) => {
                if let Some(guild_id) = state.guild_id {
                    if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
                        match state.channel_id {
                            Some(_) => {
                                guild.voice_states.insert(state.user_id, (**state).clone());
                            }
                            None => {
                                guild.voice_states.remove(&state.user_id);
                            }
                        }
                    }
                }
            }

            // Emit-only events: no cache mutation.
            Event::Resumed
            | Event::GuildBanAdd(_)
            | Event::GuildBanRemove(_)
            | Event::MessageUpdate(_)
            | Event::MessageDelete(_)
            | Event::MessageDeleteBulk(_)
            | Event::TypingStart(_)
            | Event::PresenceUpdate(_)
            | Event::VoiceServerUpdate(_) => {}

            Event::Unknown { name, .. } => {
                trace!(event = %name, "no cache mutation for unknown event");
            }

            _ => {}
        }
    }

    /// Promote (or wholesale replace) a guild from GUILD_CREATE.
    ///
    /// Replacing the entry outright makes re-delivery idempotent.
    fn insert_guild(&self, guild: Guild, shard_id: u16) {
        let guild_id = guild.id;
        self.unavailable_guilds.remove(&guild_id);

        // Drop index entries for channels that no longer exist.
        if let Some(old) = self.guilds.get(&guild_id) {
            let stale: Vec<Snowflake> = old.channels.keys().copied().collect();
            drop(old);
            for channel_id in stale {
                self.channel_guild.remove(&channel_id);
            }
        }

        let cached = CachedGuild::from_payload(guild, shard_id);

        for (channel_id, _) in cached.channels.iter() {
            self.channel_guild.insert(*channel_id, guild_id);
        }
        for member in cached.members.values() {
            if let Some(user) = &member.user {
                self.users.insert(user.id, Arc::new(user.clone()));
            }
        }

        self.guilds.insert(guild_id, cached);
    }

    /// Merge a GUILD_UPDATE into the cached entry.
    fn merge_guild(&self, guild: &Guild, shard_id: u16) {
        let Some(mut entry) = self.guilds.get_mut(&guild.id) else {
            // Update for a guild we never fully received; store what we have.
            self.insert_guild(guild.clone(), shard_id);
            return;
        };

        if !guild.name.is_empty() {
            entry.guild.name = guild.name.clone();
        }
        entry.guild.icon = guild.icon.clone();
        if guild.owner_id.is_some() {
            entry.guild.owner_id = guild.owner_id;
        }
        entry.guild.afk_channel_id = guild.afk_channel_id;
        if guild.afk_timeout.is_some() {
            entry.guild.afk_timeout = guild.afk_timeout;
        }
        if guild.verification_level.is_some() {
            entry.guild.verification_level = guild.verification_level;
        }
        if !guild.roles.is_empty() {
            entry.roles = guild.roles.iter().cloned().map(|r| (r.id, r)).collect();
        }
    }

    fn remove_guild(&self, guild_id: Snowflake) {
        self.unavailable_guilds.remove(&guild_id);
        if let Some((_, cached)) = self.guilds.remove(&guild_id) {
            for channel_id in cached.channels.keys() {
                self.channel_guild.remove(channel_id);
            }
        }
    }

    /// Insert or update a channel in its owning table.
    fn insert_channel(&self, channel: Channel) {
        match channel.kind {
            ChannelType::Dm => {
                if let Some(recipient) = channel.recipient() {
                    self.users
                        .insert(recipient.id, Arc::new(recipient.clone()));
                    self.dm_by_recipient.insert(recipient.id, channel.id);
                }
                self.dms.insert(channel.id, channel);
            }
            ChannelType::GroupDm => {
                self.groups.insert(channel.id, channel);
            }
            _ => {
                let Some(guild_id) = channel
                    .guild_id
                    .or_else(|| self.channel_guild_id(channel.id))
                else {
                    trace!(channel_id = %channel.id, "guild channel without a known guild");
                    return;
                };

                if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
                    self.channel_guild.insert(channel.id, guild_id);
                    guild.channels.insert(channel.id, channel);
                }
            }
        }
    }

    fn remove_channel(&self, channel: &Channel) {
        match channel.kind {
            ChannelType::Dm => {
                self.dms.remove(&channel.id);
                if let Some(recipient) = channel.recipient() {
                    self.dm_by_recipient.remove(&recipient.id);
                }
            }
            ChannelType::GroupDm => {
                self.groups.remove(&channel.id);
            }
            _ => {
                if let Some((_, guild_id)) = self.channel_guild.remove(&channel.id) {
                    if let Some(mut guild) = self.guilds.get_mut(&guild_id) {
                        guild.channels.remove(&channel.id);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobalt_gateway::Ready;
    use cobalt_model::UnavailableGuild;
    use serde_json::json;

    fn guild_payload() -> Guild {
        serde_json::from_value(json!({
            "id": "20",
            "name": "test guild",
            "member_count": 2,
            "roles": [{"id": "30", "name": "@everyone"}],
            "channels": [
                {"id": "40", "type": 0, "name": "general"},
                {"id": "41", "type": 2, "name": "voice"}
            ],
            "members": [
                {"user": {"id": "7", "username": "a"}, "roles": ["30"]},
                {"user": {"id": "8", "username": "b"}}
            ]
        }))
        .unwrap()
    }

    fn ready_event() -> Event {
        let ready: Ready = serde_json::from_value(json!({
            "v": 10,
            "user": {"id": "10", "username": "bot"},
            "guilds": [{"id": "20", "unavailable": true}],
            "session_id": "s1"
        }))
        .unwrap();
        Event::Ready(Box::new(ready))
    }

    #[test]
    fn ready_sets_user_and_marks_guilds_unavailable() {
        let cache = InMemoryCache::new();
        cache.update(0, &ready_event());

        assert_eq!(cache.current_user().unwrap().id.get(), 10);
        assert!(cache.is_unavailable(Snowflake::new(20)));
        assert_eq!(cache.guild_count(), 0);
    }

    #[test]
    fn guild_create_promotes_unavailable_guild() {
        let cache = InMemoryCache::new();
        cache.update(3, &ready_event());
        cache.update(3, &Event::GuildCreate(Box::new(guild_payload())));

        let guild_id = Snowflake::new(20);
        assert!(!cache.is_unavailable(guild_id));

        let guild = cache.guild(guild_id).unwrap();
        assert_eq!(guild.shard_id, 3);
        assert_eq!(guild.channels.len(), 2);
        assert_eq!(guild.members.len(), 2);
        assert_eq!(guild.roles.len(), 1);

        // Channel lookup resolves through the ownership index.
        let channel = cache.channel(Snowflake::new(40)).unwrap();
        assert_eq!(channel.guild_id, Some(guild_id));
        assert!(cache.user(Snowflake::new(7)).is_some());
    }

    #[test]
    fn guild_create_is_idempotent() {
        let cache = InMemoryCache::new();
        let event = Event::GuildCreate(Box::new(guild_payload()));

        cache.update(0, &event);
        let first = cache.guild(Snowflake::new(20)).unwrap();

        cache.update(0, &event);
        let second = cache.guild(Snowflake::new(20)).unwrap();

        assert_eq!(cache.guild_count(), 1);
        assert_eq!(first.channels.len(), second.channels.len());
        assert_eq!(first.members.len(), second.members.len());
        assert_eq!(first.roles.len(), second.roles.len());
    }

    #[test]
    fn guild_delete_demotes_on_outage_and_removes_otherwise() {
        let cache = InMemoryCache::new();
        cache.update(0, &Event::GuildCreate(Box::new(guild_payload())));
        let guild_id = Snowflake::new(20);

        // Outage: data retained, flagged unavailable.
        cache.update(
            0,
            &Event::GuildDelete(UnavailableGuild {
                id: guild_id,
                unavailable: true,
            }),
        );
        assert!(cache.is_unavailable(guild_id));
        assert!(cache.guild(guild_id).is_some());

        // Removal: everything including the channel index goes.
        cache.update(
            0,
            &Event::GuildDelete(UnavailableGuild {
                id: guild_id,
                unavailable: false,
            }),
        );
        assert!(!cache.is_unavailable(guild_id));
        assert!(cache.guild(guild_id).is_none());
        assert!(cache.channel(Snowflake::new(40)).is_none());
    }

    #[test]
    fn dm_channels_are_owned_by_the_dm_table_and_deduped() {
        let cache = InMemoryCache::new();
        let dm: Channel = serde_json::from_value(json!({
            "id": "50",
            "type": 1,
            "recipients": [{"id": "9", "username": "friend"}]
        }))
        .unwrap();

        cache.update(0, &Event::ChannelCreate(Box::new(dm.clone())));

        assert!(cache.channel(Snowflake::new(50)).is_some());
        assert!(cache.channel_guild_id(Snowflake::new(50)).is_none());
        assert_eq!(
            cache.dm_channel(Snowflake::new(9)).unwrap().id.get(),
            50
        );

        // Re-delivery keeps a single entry.
        cache.update(0, &Event::ChannelCreate(Box::new(dm.clone())));
        assert_eq!(cache.dm_channel(Snowflake::new(9)).unwrap().id.get(), 50);

        cache.update(0, &Event::ChannelDelete(Box::new(dm)));
        assert!(cache.channel(Snowflake::new(50)).is_none());
        assert!(cache.dm_channel(Snowflake::new(9)).is_none());
    }

    #[test]
    fn member_lifecycle() {
        let cache = InMemoryCache::new();
        cache.update(0, &Event::GuildCreate(Box::new(guild_payload())));
        let guild_id = Snowflake::new(20);

        let add = serde_json::from_value(json!({
            "guild_id": "20",
            "user": {"id": "99", "username": "newcomer"},
            "roles": []
        }))
        .unwrap();
        cache.update(0, &Event::GuildMemberAdd(Box::new(add)));

        assert!(cache.member(guild_id, Snowflake::new(99)).is_some());
        assert_eq!(cache.guild(guild_id).unwrap().guild.member_count, Some(3));

        let update = serde_json::from_value(json!({
            "guild_id": "20",
            "user": {"id": "99", "username": "renamed"},
            "roles": ["30"],
            "nick": "nickname"
        }))
        .unwrap();
        cache.update(0, &Event::GuildMemberUpdate(Box::new(update)));

        let member = cache.member(guild_id, Snowflake::new(99)).unwrap();
        assert_eq!(member.nick.as_deref(), Some("nickname"));
        assert_eq!(member.roles.len(), 1);

        let remove = serde_json::from_value(json!({
            "guild_id": "20",
            "user": {"id": "99", "username": "renamed"}
        }))
        .unwrap();
        cache.update(0, &Event::GuildMemberRemove(remove));

        assert!(cache.member(guild_id, Snowflake::new(99)).is_none());
        assert_eq!(cache.guild(guild_id).unwrap().guild.member_count, Some(2));
    }

    #[test]
    fn role_delete_strips_member_roles() {
        let cache = InMemoryCache::new();
        cache.update(0, &Event::GuildCreate(Box::new(guild_payload())));
        let guild_id = Snowflake::new(20);

        let delete = serde_json::from_value(json!({
            "guild_id": "20",
            "role_id": "30"
        }))
        .unwrap();
        cache.update(0, &Event::GuildRoleDelete(delete));

        assert!(cache.role(guild_id, Snowflake::new(30)).is_none());
        let member = cache.member(guild_id, Snowflake::new(7)).unwrap();
        assert!(member.roles.is_empty());
    }

    #[test]
    fn killed_shard_guilds_demote_until_replacement() {
        let cache = InMemoryCache::new();
        cache.update(2, &Event::GuildCreate(Box::new(guild_payload())));
        let guild_id = Snowflake::new(20);

        cache.mark_shard_unavailable(2);
        assert!(cache.is_unavailable(guild_id));
        assert!(cache.guild(guild_id).is_some());

        // Replacement shard re-reports the guild.
        cache.update(2, &Event::GuildCreate(Box::new(guild_payload())));
        assert!(!cache.is_unavailable(guild_id));
    }

    #[test]
    fn message_create_moves_last_message_pointer() {
        let cache = InMemoryCache::new();
        cache.update(0, &Event::GuildCreate(Box::new(guild_payload())));

        let message = serde_json::from_value(json!({
            "id": "777",
            "channel_id": "40",
            "content": "hello"
        }))
        .unwrap();
        cache.update(0, &Event::MessageCreate(Box::new(message)));

        let channel = cache.channel(Snowflake::new(40)).unwrap();
        assert_eq!(channel.last_message_id.map(|m| m.get()), Some(777));
    }

    #[test]
    fn message_create_moves_group_dm_pointer() {
        let cache = InMemoryCache::new();
        let group: Channel = serde_json::from_value(json!({
            "id": "60",
            "type": 3,
            "name": "group chat"
        }))
        .unwrap();
        cache.update(0, &Event::ChannelCreate(Box::new(group)));

        let message = serde_json::from_value(json!({
            "id": "800",
            "channel_id": "60",
            "content": "hi"
        }))
        .unwrap();
        cache.update(0, &Event::MessageCreate(Box::new(message)));

        let channel = cache.channel(Snowflake::new(60)).unwrap();
        assert_eq!(channel.last_message_id.map(|m| m.get()), Some(800));
    }
}
