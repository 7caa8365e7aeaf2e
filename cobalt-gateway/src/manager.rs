//! Shard fleet management.
//!
//! The manager spawns, routes to, and reaps shards. Guild-scoped commands
//! (voice state, presence, request-members) must travel over the shard that
//! owns the guild; [`ShardManager::send_to_guild`] applies the
//! `(guild_id >> 22) % N` routing.

use crate::error::GatewayError;
use crate::event::Event;
use crate::ratelimit::IdentifyRateLimiter;
use crate::shard::{Shard, ShardConfig, ShardState};
use crate::{shard_for, DEFAULT_GATEWAY_URL};

use cobalt_model::{ApiVersion, Intents, Snowflake};
use dashmap::DashMap;
use flume::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Configuration for a shard fleet.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Bot token.
    pub token: String,

    /// Gateway intents.
    pub intents: Intents,

    /// Total number of shards.
    pub total_shards: u16,

    /// Gateway URL (usually from /gateway/bot).
    pub gateway_url: String,

    /// API version spoken on every socket.
    pub api_version: ApiVersion,

    /// Maximum concurrent identify operations (from /gateway/bot).
    pub max_concurrency: usize,

    /// Large guild threshold.
    pub large_threshold: u8,
}

impl ManagerConfig {
    /// Create a new manager configuration.
    pub fn new(token: impl Into<String>, intents: Intents, total_shards: u16) -> Self {
        Self {
            token: token.into(),
            intents,
            total_shards: total_shards.max(1),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            api_version: ApiVersion::default(),
            max_concurrency: 1,
            large_threshold: 250,
        }
    }

    /// Set the gateway URL.
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Set the maximum identify concurrency (from /gateway/bot).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Select the API version.
    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Set the large guild threshold.
    pub fn with_large_threshold(mut self, threshold: u8) -> Self {
        self.large_threshold = threshold;
        self
    }
}

/// A running shard with its task handle.
struct ShardRunner {
    shard: Arc<Shard>,
    handle: JoinHandle<Result<(), GatewayError>>,
}

/// Manages a fleet of gateway shards.
///
/// Responsibilities:
/// - spawning and reaping shard tasks
/// - serializing identifies through the shared gate
/// - aggregating events from all shards, tagged with their shard ID
/// - routing guild-scoped commands to the owning shard
pub struct ShardManager {
    config: ManagerConfig,

    /// Running shards, keyed by shard ID.
    shards: DashMap<u16, ShardRunner>,

    /// Shared identify gate.
    identify_gate: Arc<IdentifyRateLimiter>,

    /// Channel where shard events are aggregated. Dropped on shutdown so
    /// the consuming loop drains and ends.
    event_tx: Mutex<Option<Sender<(u16, Event)>>>,
}

impl ShardManager {
    /// Create a new manager.
    ///
    /// Returns the manager and a receiver for events from all shards.
    pub fn new(config: ManagerConfig) -> (Self, Receiver<(u16, Event)>) {
        let (event_tx, event_rx) = flume::unbounded();
        let identify_gate = Arc::new(IdentifyRateLimiter::new(config.max_concurrency));

        let manager = Self {
            config,
            shards: DashMap::new(),
            identify_gate,
            event_tx: Mutex::new(Some(event_tx)),
        };

        (manager, event_rx)
    }

    /// Total number of shards this fleet is configured for.
    pub fn total_shards(&self) -> u16 {
        self.config.total_shards
    }

    /// Spawn every shard in `0..total_shards`.
    ///
    /// Sockets open in parallel; the identify step serializes through the
    /// shared gate, which enforces the 5-second spacing.
    pub fn start(&self) -> Result<(), GatewayError> {
        info!(
            total = self.config.total_shards,
            max_concurrency = self.config.max_concurrency,
            "starting shard fleet"
        );

        for shard_id in 0..self.config.total_shards {
            self.spawn(shard_id)?;
        }

        Ok(())
    }

    /// Spawn (or respawn) a single shard in its slot.
    pub fn spawn(&self, shard_id: u16) -> Result<(), GatewayError> {
        if shard_id >= self.config.total_shards {
            return Err(GatewayError::ShardUnavailable(shard_id));
        }

        // Reap any previous occupant of the slot.
        if let Some((_, old)) = self.shards.remove(&shard_id) {
            warn!(shard_id, "replacing existing shard");
            old.shard.kill();
            old.handle.abort();
        }

        let shard_config = ShardConfig {
            token: self.config.token.clone(),
            intents: self.config.intents,
            gateway_url: self.config.gateway_url.clone(),
            api_version: self.config.api_version,
            large_threshold: self.config.large_threshold,
            max_reconnect_attempts: 10,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
        };

        let shard = Arc::new(Shard::with_identify_gate(
            shard_id,
            self.config.total_shards,
            shard_config,
            self.identify_gate.clone(),
        ));

        // Per-shard channel, forwarded into the aggregate channel with the
        // shard ID attached. Per-shard ordering is preserved end-to-end.
        let Some(aggregate_tx) = self.event_tx.lock().clone() else {
            return Err(GatewayError::ChannelSend(
                "shard manager has shut down".to_string(),
            ));
        };
        let (shard_tx, shard_rx) = flume::unbounded::<Event>();
        tokio::spawn(async move {
            while let Ok(event) = shard_rx.recv_async().await {
                if aggregate_tx.send_async((shard_id, event)).await.is_err() {
                    break;
                }
            }
        });

        let shard_task = shard.clone();
        let handle = tokio::spawn(async move { shard_task.run(shard_tx).await });

        self.shards.insert(shard_id, ShardRunner { shard, handle });

        info!(shard_id, "shard spawned");
        Ok(())
    }

    /// Gracefully stop one shard: close frame 1000, slot emptied.
    ///
    /// Guilds owned by the killed shard stay cached; the caller is expected
    /// to mark them unavailable until a replacement reports them ready.
    pub async fn kill(&self, shard_id: u16) -> Result<(), GatewayError> {
        let Some((_, runner)) = self.shards.remove(&shard_id) else {
            return Err(GatewayError::ShardUnavailable(shard_id));
        };

        runner.shard.disconnect();
        if let Err(e) = runner.handle.await {
            if !e.is_cancelled() {
                error!(shard_id, error = %e, "shard task panicked during kill");
            }
        }

        info!(shard_id, "shard killed");
        Ok(())
    }

    /// Get a handle to a running shard.
    pub fn shard(&self, shard_id: u16) -> Option<Arc<Shard>> {
        self.shards.get(&shard_id).map(|r| r.shard.clone())
    }

    /// IDs of all running shards.
    pub fn shard_ids(&self) -> Vec<u16> {
        self.shards.iter().map(|r| *r.key()).collect()
    }

    /// The shard that owns a guild.
    pub fn shard_for(&self, guild_id: Snowflake) -> u16 {
        shard_for(guild_id, self.config.total_shards)
    }

    /// State of a specific shard.
    pub fn state(&self, shard_id: u16) -> Option<ShardState> {
        self.shards.get(&shard_id).map(|r| r.shard.state())
    }

    /// Last heartbeat latency of a specific shard.
    pub fn latency(&self, shard_id: u16) -> Option<std::time::Duration> {
        self.shards.get(&shard_id).and_then(|r| r.shard.latency())
    }

    /// Send a payload over a specific shard's socket.
    pub fn send_to_shard<T: serde::Serialize>(
        &self,
        shard_id: u16,
        payload: &T,
    ) -> Result<(), GatewayError> {
        match self.shards.get(&shard_id) {
            Some(runner) => runner.shard.send(payload),
            None => Err(GatewayError::ShardUnavailable(shard_id)),
        }
    }

    /// Send a guild-scoped payload over the owning shard's socket.
    pub fn send_to_guild<T: serde::Serialize>(
        &self,
        guild_id: Snowflake,
        payload: &T,
    ) -> Result<(), GatewayError> {
        self.send_to_shard(self.shard_for(guild_id), payload)
    }

    /// Shut down every shard gracefully and wait for their tasks.
    pub async fn shutdown(&self) {
        info!("shutting down shard fleet");

        let ids: Vec<u16> = self.shard_ids();
        for shard_id in ids {
            if let Some((_, runner)) = self.shards.remove(&shard_id) {
                runner.shard.disconnect();
                if let Err(e) = runner.handle.await {
                    if !e.is_cancelled() {
                        error!(shard_id, error = %e, "shard task panicked");
                    }
                }
            }
        }

        // Release the aggregate sender; once the forwarding tasks finish,
        // the consuming loop sees the channel close and drains out.
        *self.event_tx.lock() = None;

        info!("shard fleet shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_config_builder() {
        let config = ManagerConfig::new("t", Intents::GUILDS, 4)
            .with_max_concurrency(16)
            .with_api_version(ApiVersion::V6);

        assert_eq!(config.total_shards, 4);
        assert_eq!(config.max_concurrency, 16);
        assert_eq!(config.api_version, ApiVersion::V6);
    }

    #[test]
    fn zero_shards_is_clamped() {
        let config = ManagerConfig::new("t", Intents::GUILDS, 0);
        assert_eq!(config.total_shards, 1);
    }

    #[tokio::test]
    async fn routing_targets_owning_shard() {
        let (manager, _rx) = ShardManager::new(ManagerConfig::new("t", Intents::GUILDS, 4));
        let guild = Snowflake::new(123456789012582400);

        let expected = ((guild.get() >> 22) % 4) as u16;
        assert_eq!(manager.shard_for(guild), expected);

        // No shard spawned: the routed send must fail with the slot ID.
        let err = manager
            .send_to_guild(guild, &serde_json::json!({"op": 4}))
            .unwrap_err();
        match err {
            GatewayError::ShardUnavailable(id) => assert_eq!(id, expected),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn spawn_rejects_out_of_range_slot() {
        let (manager, _rx) = ShardManager::new(ManagerConfig::new("t", Intents::GUILDS, 2));
        assert!(manager.spawn(2).is_err());
    }
}
