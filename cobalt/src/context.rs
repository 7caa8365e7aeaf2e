//! Capability handle passed into event handlers.
//!
//! Handlers get the REST submitter, the cache view, and the delivering
//! shard as one small value. No handler holds a reference back to the
//! [`Client`](crate::Client); the handle carries everything it may act
//! through.

use crate::error::CobaltError;
use cobalt_cache::InMemoryCache;
use cobalt_gateway::{GatewayPayload, OpCode, RequestGuildMembers, Shard, UpdateVoiceState};
use cobalt_http::HttpClient;
use cobalt_model::{Channel, Message, Snowflake, User};
use std::sync::Arc;
use std::time::Duration;

/// Everything an event handler may act through.
#[derive(Clone)]
pub struct Context {
    /// REST client.
    pub http: Arc<HttpClient>,
    /// Entity cache, already mutated for the event being handled.
    pub cache: Arc<InMemoryCache>,
    /// The shard that delivered the event.
    pub shard: Arc<Shard>,
}

impl Context {
    pub(crate) fn new(
        http: Arc<HttpClient>,
        cache: Arc<InMemoryCache>,
        shard: Arc<Shard>,
    ) -> Self {
        Self { http, cache, shard }
    }

    /// Send a plain text message.
    pub async fn send(
        &self,
        channel_id: Snowflake,
        content: impl Into<String>,
    ) -> Result<Message, CobaltError> {
        Ok(self.http.send_message(channel_id, content).await?)
    }

    /// This shard's last heartbeat latency.
    pub fn latency(&self) -> Option<Duration> {
        self.shard.latency()
    }

    /// Look up a channel, falling back to REST on a cache miss.
    pub async fn channel(&self, channel_id: Snowflake) -> Result<Channel, CobaltError> {
        if let Some(channel) = self.cache.channel(channel_id) {
            return Ok(channel);
        }
        Ok(self.http.get_channel(channel_id).await?)
    }

    /// Look up a user, falling back to REST on a cache miss.
    pub async fn user(&self, user_id: Snowflake) -> Result<User, CobaltError> {
        if let Some(user) = self.cache.user(user_id) {
            return Ok((*user).clone());
        }
        Ok(self.http.get_user(user_id).await?)
    }

    /// Join or move to a voice channel in a guild this shard owns.
    ///
    /// The resulting `VOICE_SERVER_UPDATE` arrives as an event for the
    /// downstream voice consumer.
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
        Ok(self.shard.send(&payload)?)
    }

    /// Request member chunks for a guild this shard owns.
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
        Ok(self.shard.send(&payload)?)
    }
}
