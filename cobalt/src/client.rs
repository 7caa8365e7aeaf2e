//! The Discord bot client.
//!
//! The client owns the REST client, the cache, and the shard fleet, and
//! runs the dispatch loop: for every event it applies the cache mutation,
//! then invokes registered handlers in registration order on the dispatch
//! task. A panicking handler is isolated so the rest still run; per-shard
//! receive order is preserved end-to-end.
//!
//! # Example
//!
//! ```no_run
//! use cobalt::prelude::*;
//!
//! struct Pinger;
//!
//! #[async_trait]
//! impl EventHandler for Pinger {
//!     async fn message_create(&self, ctx: Context, msg: Message) {
//!         if msg.content == "!ping" {
//!             let _ = ctx.send(msg.channel_id, "Pong!").await;
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CobaltError> {
//!     let token = std::env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN not set");
//!
//!     Client::builder(token)
//!         .intents(Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT)
//!         .event_handler(Pinger)
//!         .build()
//!         .await?
//!         .start()
//!         .await
//! }
//! ```

use crate::context::Context;
use crate::error::CobaltError;

use async_trait::async_trait;
use cobalt_cache::InMemoryCache;
use cobalt_gateway::{
    Event, GatewayPayload, ManagerConfig, OpCode, Ready, RequestGuildMembers, ShardManager,
    UpdatePresence, UpdateVoiceState,
};
use cobalt_http::HttpClient;
use cobalt_model::{
    ApiVersion, Channel, Guild, GuildBanEvent, GuildMemberAddEvent, GuildMemberRemoveEvent,
    GuildMemberUpdateEvent, GuildMembersChunkEvent, GuildRoleDeleteEvent, GuildRoleEvent, Intents,
    Message, MessageDeleteBulkEvent, MessageDeleteEvent, MessageUpdateEvent, PresenceUpdateEvent,
    Snowflake, TypingStartEvent, UnavailableGuild, User, VoiceServerUpdateEvent, VoiceState,
};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, warn};

/// How many shards to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShardCount {
    /// Use the count recommended by /gateway/bot.
    #[default]
    Auto,
    /// Run exactly this many shards.
    Exact(u16),
}

/// Typed listener interface for gateway events.
///
/// Every method has a no-op default; implement the ones you care about.
/// Handlers run sequentially on the dispatch task in registration order
/// and see the cache in its post-mutation state. Long-running work should
/// be spawned onto its own task.
#[allow(unused_variables)]
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn ready(&self, ctx: Context, ready: Ready) {}
    async fn resumed(&self, ctx: Context) {}

    async fn guild_create(&self, ctx: Context, guild: Guild) {}
    async fn guild_update(&self, ctx: Context, guild: Guild) {}
    async fn guild_delete(&self, ctx: Context, guild: UnavailableGuild) {}
    async fn guild_ban_add(&self, ctx: Context, ban: GuildBanEvent) {}
    async fn guild_ban_remove(&self, ctx: Context, ban: GuildBanEvent) {}

    async fn guild_member_add(&self, ctx: Context, event: GuildMemberAddEvent) {}
    async fn guild_member_remove(&self, ctx: Context, event: GuildMemberRemoveEvent) {}
    async fn guild_member_update(&self, ctx: Context, event: GuildMemberUpdateEvent) {}
    async fn guild_members_chunk(&self, ctx: Context, chunk: GuildMembersChunkEvent) {}

    async fn guild_role_create(&self, ctx: Context, event: GuildRoleEvent) {}
    async fn guild_role_update(&self, ctx: Context, event: GuildRoleEvent) {}
    async fn guild_role_delete(&self, ctx: Context, event: GuildRoleDeleteEvent) {}

    async fn channel_create(&self, ctx: Context, channel: Channel) {}
    async fn channel_update(&self, ctx: Context, channel: Channel) {}
    async fn channel_delete(&self, ctx: Context, channel: Channel) {}

    async fn message_create(&self, ctx: Context, message: Message) {}
    async fn message_update(&self, ctx: Context, event: MessageUpdateEvent) {}
    async fn message_delete(&self, ctx: Context, event: MessageDeleteEvent) {}
    async fn message_delete_bulk(&self, ctx: Context, event: MessageDeleteBulkEvent) {}
    async fn typing_start(&self, ctx: Context, event: TypingStartEvent) {}

    async fn presence_update(&self, ctx: Context, event: PresenceUpdateEvent) {}
    async fn user_update(&self, ctx: Context, user: User) {}

    async fn voice_state_update(&self, ctx: Context, state: VoiceState) {}
    /// Voice server credentials; forward to your voice subsystem.
    async fn voice_server_update(&self, ctx: Context, event: VoiceServerUpdateEvent) {}

    /// An event this library does not model.
    async fn unknown(&self, ctx: Context, name: String, data: Box<serde_json::value::RawValue>) {}
}

/// The Cobalt Discord client.
///
/// All internal state is behind `Arc`, so the client is cheap to clone
/// and share across tasks.
#[derive(Clone)]
pub struct Client {
    /// REST client.
    pub http: Arc<HttpClient>,
    /// Entity cache.
    pub cache: Arc<InMemoryCache>,
    /// The shard fleet.
    pub manager: Arc<ShardManager>,
    /// Registered handlers, invoked in registration order.
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
    /// Aggregated event stream from all shards.
    event_rx: flume::Receiver<(u16, Event)>,
}

impl Client {
    /// Create a new client builder.
    #[inline]
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// Start the shard fleet and run the dispatch loop.
    ///
    /// Resolves when every shard has stopped (after [`Client::shutdown`]
    /// or an unrecoverable error).
    pub async fn start(&self) -> Result<(), CobaltError> {
        self.manager.start()?;

        while let Ok((shard_id, event)) = self.event_rx.recv_async().await {
            // Cache first: listeners must observe post-mutation state.
            self.cache.update(shard_id, &event);

            if self.handlers.is_empty() {
                continue;
            }

            let Some(shard) = self.manager.shard(shard_id) else {
                warn!(shard_id, "event from unknown shard, skipping dispatch");
                continue;
            };

            let ctx = Context::new(self.http.clone(), self.cache.clone(), shard);

            for handler in self.handlers.iter() {
                let invocation = dispatch(handler.as_ref(), ctx.clone(), &event);
                if AssertUnwindSafe(invocation).catch_unwind().await.is_err() {
                    error!(
                        shard_id,
                        event = event.name(),
                        "event handler panicked; continuing with remaining handlers"
                    );
                }
            }
        }

        Ok(())
    }

    /// Update the bot's presence on every shard.
    pub fn update_presence(&self, presence: &UpdatePresence) -> Result<(), CobaltError> {
        let payload = GatewayPayload::new(OpCode::StatusUpdate, presence);
        for shard_id in self.manager.shard_ids() {
            self.manager.send_to_shard(shard_id, &payload)?;
        }
        Ok(())
    }

    /// Join, move within, or leave (`channel_id: None`) voice in a guild.
    /// Routed over the shard that owns the guild.
    pub fn update_voice_state(
        &self,
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
    ) -> Result<(), CobaltError> {
        let payload = GatewayPayload::new(
            OpCode::VoiceStateUpdate,
            UpdateVoiceState {
                guild_id,
                channel_id,
                self_mute: false,
                self_deaf: false,
            },
        );
        Ok(self.manager.send_to_guild(guild_id, &payload)?)
    }

    /// Request member chunks for a guild, over its owning shard.
    pub fn request_guild_members(
        &self,
        guild_id: Snowflake,
        query: impl Into<String>,
        limit: u32,
    ) -> Result<(), CobaltError> {
        let payload = GatewayPayload::new(
            OpCode::RequestGuildMembers,
            RequestGuildMembers {
                guild_id,
                query: query.into(),
                limit,
            },
        );
        Ok(self.manager.send_to_guild(guild_id, &payload)?)
    }

    /// Gracefully stop one shard. Its guilds stay cached, marked
    /// unavailable until a replacement reports them.
    pub async fn kill_shard(&self, shard_id: u16) -> Result<(), CobaltError> {
        self.manager.kill(shard_id).await?;
        self.cache.mark_shard_unavailable(shard_id);
        Ok(())
    }

    /// Spawn a fresh shard into a slot (after [`Client::kill_shard`]).
    pub fn spawn_shard(&self, shard_id: u16) -> Result<(), CobaltError> {
        Ok(self.manager.spawn(shard_id)?)
    }

    /// Shut down every shard gracefully. The dispatch loop drains and
    /// [`Client::start`] returns once the event channel closes.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

/// Invoke one handler for one event.
async fn dispatch(handler: &dyn EventHandler, ctx: Context, event: &Event) {
    match event {
        Event::Ready(ready) => handler.ready(ctx, (**ready).clone()).await,
        Event::Resumed => handler.resumed(ctx).await,

        Event::GuildCreate(guild) => handler.guild_create(ctx, (**guild).clone()).await,
        Event::GuildUpdate(guild) => handler.guild_update(ctx, (**guild).clone()).await,
        Event::GuildDelete(guild) => handler.guild_delete(ctx, guild.clone()).await,
        Event::GuildBanAdd(ban) => handler.guild_ban_add(ctx, ban.clone()).await,
        Event::GuildBanRemove(ban) => handler.guild_ban_remove(ctx, ban.clone()).await,

        Event::GuildMemberAdd(event) => handler.guild_member_add(ctx, (**event).clone()).await,
        Event::GuildMemberRemove(event) => handler.guild_member_remove(ctx, event.clone()).await,
        Event::GuildMemberUpdate(event) => {
            handler.guild_member_update(ctx, (**event).clone()).await
        }
        Event::GuildMembersChunk(chunk) => {
            handler.guild_members_chunk(ctx, (**chunk).clone()).await
        }

        Event::GuildRoleCreate(event) => handler.guild_role_create(ctx, event.clone()).await,
        Event::GuildRoleUpdate(event) => handler.guild_role_update(ctx, event.clone()).await,
        Event::GuildRoleDelete(event) => handler.guild_role_delete(ctx, event.clone()).await,

        Event::ChannelCreate(channel) => handler.channel_create(ctx, (**channel).clone()).await,
        Event::ChannelUpdate(channel) => handler.channel_update(ctx, (**channel).clone()).await,
        Event::ChannelDelete(channel) => handler.channel_delete(ctx, (**channel).clone()).await,

        Event::MessageCreate(message) => handler.message_create(ctx, (**message).clone()).await,
        Event::MessageUpdate(event) => handler.message_update(ctx, (**event).clone()).await,
        Event::MessageDelete(event) => handler.message_delete(ctx, event.clone()).await,
        Event::MessageDeleteBulk(event) => {
            handler.message_delete_bulk(ctx, event.clone()).await
        }
        Event::TypingStart(event) => handler.typing_start(ctx, event.clone()).await,

        Event::PresenceUpdate(event) => handler.presence_update(ctx, (**event).clone()).await,
        Event::UserUpdate(user) => handler.user_update(ctx, (**user).clone()).await,

        Event::VoiceStateUpdate(state) => {
            handler.voice_state_update(ctx, (**state).clone()).await
        }
        Event::VoiceServerUpdate(event) => {
            handler.voice_server_update(ctx, event.clone()).await
        }

        Event::Unknown { name, data } => {
            handler.unknown(ctx, name.clone(), data.clone()).await
        }

        _ => {}
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    token: String,
    intents: Intents,
    shard_count: ShardCount,
    large_threshold: u8,
    api_version: ApiVersion,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl ClientBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            intents: Intents::default(),
            shard_count: ShardCount::Auto,
            large_threshold: 250,
            api_version: ApiVersion::default(),
            handlers: Vec::new(),
        }
    }

    /// Set the gateway intents.
    #[must_use]
    pub const fn intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    /// Set the shard count explicitly instead of using /gateway/bot.
    #[must_use]
    pub const fn shard_count(mut self, count: u16) -> Self {
        self.shard_count = ShardCount::Exact(count);
        self
    }

    /// Set the large guild threshold (50-250).
    #[must_use]
    pub const fn large_threshold(mut self, threshold: u8) -> Self {
        self.large_threshold = threshold;
        self
    }

    /// Select the API version. `V6` is the legacy compatibility mode.
    #[must_use]
    pub const fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Register an event handler. Handlers run in registration order.
    pub fn event_handler<H: EventHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Build the client: fetch gateway info and size the fleet.
    pub async fn build(self) -> Result<Client, CobaltError> {
        let http = Arc::new(HttpClient::with_api_version(
            self.token.clone(),
            self.api_version,
        )?);

        let gateway = http.get_gateway_bot().await?;
        let total_shards = match self.shard_count {
            ShardCount::Auto => gateway.shards,
            ShardCount::Exact(count) => count,
        };

        let config = ManagerConfig::new(self.token, self.intents, total_shards)
            .with_max_concurrency(gateway.max_concurrency())
            .with_gateway_url(gateway.url)
            .with_api_version(self.api_version)
            .with_large_threshold(self.large_threshold);

        let (manager, event_rx) = ShardManager::new(config);

        Ok(Client {
            http,
            cache: Arc::new(InMemoryCache::new()),
            manager: Arc::new(manager),
            handlers: Arc::new(self.handlers),
            event_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builder_defaults() {
        let builder = ClientBuilder::new("token");
        assert_eq!(builder.shard_count, ShardCount::Auto);
        assert_eq!(builder.api_version, ApiVersion::V10);
        assert!(builder.handlers.is_empty());
    }

    struct Panicker;

    #[async_trait]
    impl EventHandler for Panicker {
        async fn resumed(&self, _ctx: Context) {
            panic!("listener bug");
        }
    }

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for Counter {
        async fn resumed(&self, _ctx: Context) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn a_panicking_handler_does_not_stop_later_handlers() {
        use cobalt_gateway::{Shard, ShardConfig};

        let count = Arc::new(AtomicUsize::new(0));
        let handlers: Vec<Arc<dyn EventHandler>> =
            vec![Arc::new(Panicker), Arc::new(Counter(count.clone()))];

        let http = Arc::new(HttpClient::new("t").unwrap());
        let cache = Arc::new(InMemoryCache::new());
        let shard = Arc::new(Shard::new(
            0,
            1,
            ShardConfig::new("t", Intents::default()),
        ));

        let event = Event::Resumed;
        for handler in &handlers {
            let ctx = Context::new(http.clone(), cache.clone(), shard.clone());
            let invocation = dispatch(handler.as_ref(), ctx, &event);
            let _ = AssertUnwindSafe(invocation).catch_unwind().await;
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
